//! # Identity records
//!
//! An [`IdentityRecord`] is what a realm produces for a verified token and
//! what the coordinator hands back after combining every realm's answer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::principal::PrincipalSet;

/// How an [`IdentityRecord`] came to be.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Agreement {
    /// Produced by one realm on its own.
    #[default]
    SingleRealm,
    /// Every consulted realm succeeded.
    AllRealms,
    /// At least one realm succeeded.
    AnyRealm,
}

/// Result of authentication: principals plus opaque per-realm data.
///
/// Records are merge-only. [`merge`](Self::merge) returns a new record.
///
/// # Example
/// ```rust
/// use serde_json::json;
/// use wzs_auth::auth::identity::IdentityRecord;
/// use wzs_auth::auth::principal::PrincipalSet;
///
/// let ldap = IdentityRecord::new(PrincipalSet::single("ldap", "alice"))
///     .with_realm_data("ldap", json!({ "roles": ["staff"] }));
/// let db = IdentityRecord::new(PrincipalSet::single("db", "42"));
///
/// let merged = ldap.merge(&db);
/// assert_eq!(merged.principals().len(), 2);
/// assert!(merged.realm_data("ldap").is_some());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    principals: PrincipalSet,
    #[serde(default)]
    realm_data: BTreeMap<String, Value>,
    #[serde(default)]
    agreement: Agreement,
}

impl IdentityRecord {
    pub fn new(principals: PrincipalSet) -> Self {
        Self {
            principals,
            ..Self::default()
        }
    }

    /// A record with no principals, used to seed a merge-capable aggregate.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Attaches opaque supporting data (roles, attributes, …) for `realm`.
    pub fn with_realm_data(mut self, realm: impl Into<String>, data: Value) -> Self {
        self.realm_data.insert(realm.into(), data);
        self
    }

    pub fn with_agreement(mut self, agreement: Agreement) -> Self {
        self.agreement = agreement;
        self
    }

    pub fn principals(&self) -> &PrincipalSet {
        &self.principals
    }

    pub fn into_principals(self) -> PrincipalSet {
        self.principals
    }

    pub fn realm_data(&self, realm: &str) -> Option<&Value> {
        self.realm_data.get(realm)
    }

    pub fn agreement(&self) -> Agreement {
        self.agreement
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    /// Additive union of principals and realm data.
    ///
    /// Realm data already present in `self` is kept when `other` carries
    /// data for the same realm. The agreement flag of `self` is kept.
    pub fn merge(&self, other: &IdentityRecord) -> Self {
        let mut realm_data = self.realm_data.clone();
        for (realm, data) in &other.realm_data {
            realm_data
                .entry(realm.clone())
                .or_insert_with(|| data.clone());
        }

        Self {
            principals: self.principals.merge(&other.principals),
            realm_data,
            agreement: self.agreement,
        }
    }
}
