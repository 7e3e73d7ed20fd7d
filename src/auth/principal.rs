//! # Principals
//!
//! A [`PrincipalSet`] holds every identifying value (username, user id,
//! email, …) known for one subject, each attributed to the realm that
//! supplied it.
//!
//! The set is an immutable value:
//!
//! - insertion order is preserved and the first inserted value is the
//!   *primary* principal, which never changes across merges
//! - duplicates are dropped on construction
//! - [`PrincipalSet::merge`] returns a new set
//!
//! "No identity" is expressed as `Option<PrincipalSet>::None` by owners
//! such as [`Subject`](crate::subject::Subject), not by an emptied set.
//!
//! # Example
//! ```rust
//! use wzs_auth::auth::principal::PrincipalSet;
//!
//! let ldap = PrincipalSet::of("ldap", ["alice", "alice@example.com"]);
//! let db = PrincipalSet::single("db", "42");
//!
//! let merged = ldap.merge(&db);
//! assert_eq!(merged.primary(), Some("alice"));
//! assert_eq!(merged.len(), 3);
//! assert_eq!(merged.from_realm("db"), vec!["42"]);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// One principal value together with the realm that supplied it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RealmPrincipal {
    pub realm: String,
    pub value: String,
}

/// Ordered, deduplicated, realm-attributed principals of one subject.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<RealmPrincipal>", into = "Vec<RealmPrincipal>")]
pub struct PrincipalSet {
    entries: Vec<RealmPrincipal>,
}

impl PrincipalSet {
    /// A set with no principals. Used as the starting point of an aggregate.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A set holding a single principal from `realm`.
    pub fn single(realm: impl Into<String>, principal: impl Into<String>) -> Self {
        Self {
            entries: vec![RealmPrincipal {
                realm: realm.into(),
                value: principal.into(),
            }],
        }
    }

    /// A set holding `principals` (in order) supplied by `realm`.
    pub fn of<I, S>(realm: impl Into<String>, principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let realm = realm.into();
        principals
            .into_iter()
            .map(|value| RealmPrincipal {
                realm: realm.clone(),
                value: value.into(),
            })
            .collect()
    }

    /// Returns a new set with `principal` from `realm` appended.
    pub fn with(&self, realm: impl Into<String>, principal: impl Into<String>) -> Self {
        self.merge(&Self::single(realm, principal))
    }

    /// Returns the additive union of `self` and `other`.
    ///
    /// Entries of `self` keep their positions, so the primary principal of
    /// a non-empty `self` is preserved.
    pub fn merge(&self, other: &PrincipalSet) -> Self {
        self.entries
            .iter()
            .chain(other.entries.iter())
            .cloned()
            .collect()
    }

    /// The first principal ever inserted.
    pub fn primary(&self) -> Option<&str> {
        self.entries.first().map(|e| e.value.as_str())
    }

    /// Distinct principal values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.entries.len());
        self.entries.iter().filter_map(move |e| {
            if seen.contains(&e.value.as_str()) {
                None
            } else {
                seen.push(e.value.as_str());
                Some(e.value.as_str())
            }
        })
    }

    /// Principals supplied by the realm called `realm`, in insertion order.
    pub fn from_realm(&self, realm: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.realm == realm)
            .map(|e| e.value.as_str())
            .collect()
    }

    /// Names of every realm that contributed, in first-contribution order.
    pub fn realm_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for e in &self.entries {
            if !names.contains(&e.realm.as_str()) {
                names.push(e.realm.as_str());
            }
        }
        names
    }

    pub fn contains(&self, principal: &str) -> bool {
        self.entries.iter().any(|e| e.value == principal)
    }

    /// Number of distinct principal values.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw realm-attributed entries.
    pub fn entries(&self) -> &[RealmPrincipal] {
        &self.entries
    }
}

impl FromIterator<RealmPrincipal> for PrincipalSet {
    fn from_iter<T: IntoIterator<Item = RealmPrincipal>>(iter: T) -> Self {
        let mut entries: Vec<RealmPrincipal> = Vec::new();
        for entry in iter {
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
        Self { entries }
    }
}

impl From<Vec<RealmPrincipal>> for PrincipalSet {
    fn from(entries: Vec<RealmPrincipal>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<PrincipalSet> for Vec<RealmPrincipal> {
    fn from(set: PrincipalSet) -> Self {
        set.entries
    }
}

impl fmt::Display for PrincipalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<&str> = self.iter().collect();
        write!(f, "[{}]", values.join(", "))
    }
}
