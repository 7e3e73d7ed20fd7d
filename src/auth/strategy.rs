//! # Multi-realm authentication strategies
//!
//! When more than one realm is configured, the
//! [`AuthenticationCoordinator`](super::coordinator::AuthenticationCoordinator)
//! calls back into an [`AuthenticationStrategy`] around every realm it
//! consults:
//!
//! ```text
//! before_all ─┬─ before_each ─ [realm.identity] ─ after_each ─┬─ after_all
//!             └──────────────── for each realm ───────────────┘
//! ```
//!
//! The aggregate passed between hooks is an immutable value. Every hook
//! returns the aggregate that the next hook will see. `None` means the
//! aggregate is absent and cannot be merged into.
//!
//! Policies shipped here:
//! - [`RequireAll`]: every realm must support the token and succeed
//! - [`RequireAtLeastOne`]: failures are tolerated as long as one realm succeeds
//! - [`FirstSuccessWins`]: only the first successful realm's identity is kept

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, trace};

use super::identity::{Agreement, IdentityRecord};
use super::realm::Realm;
use super::token::AuthenticationToken;
use crate::error::AuthenticationError;

/// The value threaded through the strategy hooks.
pub type Aggregate = Option<IdentityRecord>;

/// Policy governing how the results of several realms combine.
///
/// Every hook has a default; policies override only what they change.
/// Returning `Err` from any hook aborts the attempt immediately.
pub trait AuthenticationStrategy: Send + Sync {
    /// Produces the initial aggregate. Defaults to an empty, merge-capable record.
    fn before_all(
        &self,
        _realms: &[Arc<dyn Realm>],
        _token: &dyn AuthenticationToken,
    ) -> Result<Aggregate, AuthenticationError> {
        Ok(Some(IdentityRecord::empty()))
    }

    /// Called for every realm, before the realm's support for the token is checked.
    fn before_each(
        &self,
        _realm: &dyn Realm,
        _token: &dyn AuthenticationToken,
        aggregate: Aggregate,
    ) -> Result<Aggregate, AuthenticationError> {
        Ok(aggregate)
    }

    /// Called after a supporting realm was consulted, with either its record
    /// or the error it raised. Defaults to merging the record.
    fn after_each(
        &self,
        _realm: &dyn Realm,
        _token: &dyn AuthenticationToken,
        single: Option<IdentityRecord>,
        aggregate: Aggregate,
        _failure: Option<anyhow::Error>,
    ) -> Result<Aggregate, AuthenticationError> {
        Ok(merge(aggregate, single))
    }

    /// Final validation of the aggregate. Defaults to failing when it is absent.
    fn after_all(
        &self,
        _token: &dyn AuthenticationToken,
        aggregate: Aggregate,
    ) -> Result<IdentityRecord, AuthenticationError> {
        aggregate.ok_or(AuthenticationError::NoRealmAuthenticated)
    }
}

fn merge(aggregate: Aggregate, single: Option<IdentityRecord>) -> Aggregate {
    match (aggregate, single) {
        (Some(aggregate), Some(single)) => Some(aggregate.merge(&single)),
        (None, single) => single,
        (aggregate, None) => aggregate,
    }
}

fn non_empty(aggregate: Aggregate) -> Option<IdentityRecord> {
    aggregate.filter(|record| !record.is_empty())
}

/// Every realm must support the token and produce an identity.
///
/// The first realm that does not aborts the attempt with an error naming it.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequireAll;

impl AuthenticationStrategy for RequireAll {
    fn before_each(
        &self,
        realm: &dyn Realm,
        token: &dyn AuthenticationToken,
        aggregate: Aggregate,
    ) -> Result<Aggregate, AuthenticationError> {
        if !realm.supports(token) {
            return Err(AuthenticationError::UnsupportedToken {
                realm: realm.name().to_string(),
                kind: token.kind(),
            });
        }
        Ok(aggregate)
    }

    fn after_each(
        &self,
        realm: &dyn Realm,
        token: &dyn AuthenticationToken,
        single: Option<IdentityRecord>,
        aggregate: Aggregate,
        failure: Option<anyhow::Error>,
    ) -> Result<Aggregate, AuthenticationError> {
        if let Some(source) = failure {
            return Err(AuthenticationError::RealmFailed {
                realm: realm.name().to_string(),
                source,
            });
        }

        match single.filter(|record| !record.is_empty()) {
            Some(single) => Ok(merge(aggregate, Some(single))),
            None => Err(AuthenticationError::UnknownIdentity {
                realm: realm.name().to_string(),
                principal: token.principal().to_string(),
            }),
        }
    }

    fn after_all(
        &self,
        _token: &dyn AuthenticationToken,
        aggregate: Aggregate,
    ) -> Result<IdentityRecord, AuthenticationError> {
        non_empty(aggregate)
            .map(|record| record.with_agreement(Agreement::AllRealms))
            .ok_or(AuthenticationError::NoRealmAuthenticated)
    }
}

/// At least one realm must produce an identity; all successes are merged.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequireAtLeastOne;

impl AuthenticationStrategy for RequireAtLeastOne {
    fn after_each(
        &self,
        realm: &dyn Realm,
        _token: &dyn AuthenticationToken,
        single: Option<IdentityRecord>,
        aggregate: Aggregate,
        failure: Option<anyhow::Error>,
    ) -> Result<Aggregate, AuthenticationError> {
        if let Some(err) = failure {
            debug!(
                realm = realm.name(),
                error = %err,
                "realm failed; continuing with remaining realms"
            );
        }
        Ok(merge(aggregate, single))
    }

    fn after_all(
        &self,
        _token: &dyn AuthenticationToken,
        aggregate: Aggregate,
    ) -> Result<IdentityRecord, AuthenticationError> {
        non_empty(aggregate)
            .map(|record| record.with_agreement(Agreement::AnyRealm))
            .ok_or(AuthenticationError::NoRealmAuthenticated)
    }
}

/// Keeps the identity of the first realm that succeeds.
///
/// Later realms are still consulted, but their results are discarded.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstSuccessWins;

impl AuthenticationStrategy for FirstSuccessWins {
    fn before_all(
        &self,
        _realms: &[Arc<dyn Realm>],
        _token: &dyn AuthenticationToken,
    ) -> Result<Aggregate, AuthenticationError> {
        Ok(None)
    }

    fn after_each(
        &self,
        realm: &dyn Realm,
        _token: &dyn AuthenticationToken,
        single: Option<IdentityRecord>,
        aggregate: Aggregate,
        failure: Option<anyhow::Error>,
    ) -> Result<Aggregate, AuthenticationError> {
        if let Some(winner) = non_empty(aggregate.clone()) {
            trace!(realm = realm.name(), "identity already established; ignoring realm result");
            return Ok(Some(winner));
        }
        if let Some(err) = failure {
            debug!(realm = realm.name(), error = %err, "realm failed; trying next realm");
        }
        Ok(single.filter(|record| !record.is_empty()).or(aggregate))
    }

    fn after_all(
        &self,
        _token: &dyn AuthenticationToken,
        aggregate: Aggregate,
    ) -> Result<IdentityRecord, AuthenticationError> {
        non_empty(aggregate)
            .map(|record| record.with_agreement(Agreement::AnyRealm))
            .ok_or(AuthenticationError::NoRealmAuthenticated)
    }
}

/// Strategy selection by name, for configuration.
///
/// Accepted names (case-insensitive): `all`, `at_least_one`, `first`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrategyKind {
    RequireAll,
    #[default]
    RequireAtLeastOne,
    FirstSuccessWins,
}

impl StrategyKind {
    pub fn build(self) -> Arc<dyn AuthenticationStrategy> {
        match self {
            Self::RequireAll => Arc::new(RequireAll),
            Self::RequireAtLeastOne => Arc::new(RequireAtLeastOne),
            Self::FirstSuccessWins => Arc::new(FirstSuccessWins),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "require_all" => Ok(Self::RequireAll),
            "at_least_one" | "any" => Ok(Self::RequireAtLeastOne),
            "first" | "first_success" => Ok(Self::FirstSuccessWins),
            other => anyhow::bail!("unknown authentication strategy `{other}`"),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RequireAll => "all",
            Self::RequireAtLeastOne => "at_least_one",
            Self::FirstSuccessWins => "first",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::principal::PrincipalSet;
    use crate::auth::token::{BearerToken, UsernamePasswordToken};

    struct NamedRealm(&'static str);

    impl Realm for NamedRealm {
        fn name(&self) -> &str {
            self.0
        }

        fn supports(&self, token: &dyn AuthenticationToken) -> bool {
            token.kind() == "username_password"
        }

        fn identity(
            &self,
            _token: &dyn AuthenticationToken,
        ) -> anyhow::Result<Option<IdentityRecord>> {
            Ok(None)
        }
    }

    fn record(realm: &str, principal: &str) -> IdentityRecord {
        IdentityRecord::new(PrincipalSet::single(realm, principal))
    }

    #[test]
    fn require_all_rejects_unsupported_realm_before_it_is_called() {
        let token = BearerToken::new("x");
        let err = RequireAll
            .before_each(&NamedRealm("r1"), &token, Some(IdentityRecord::empty()))
            .unwrap_err();

        assert!(matches!(
            err,
            AuthenticationError::UnsupportedToken { ref realm, kind: "bearer" } if realm == "r1"
        ));
    }

    #[test]
    fn require_all_fails_on_empty_result_naming_the_realm() {
        let token = UsernamePasswordToken::new("alice", "pw");
        let err = RequireAll
            .after_each(&NamedRealm("r2"), &token, None, Some(IdentityRecord::empty()), None)
            .unwrap_err();

        assert_eq!(err.realm(), Some("r2"));
        assert!(matches!(err, AuthenticationError::UnknownIdentity { .. }));
    }

    #[test]
    fn require_all_fails_on_realm_error() {
        let token = UsernamePasswordToken::new("alice", "pw");
        let err = RequireAll
            .after_each(
                &NamedRealm("r3"),
                &token,
                None,
                Some(IdentityRecord::empty()),
                Some(anyhow::anyhow!("locked")),
            )
            .unwrap_err();

        assert!(matches!(err, AuthenticationError::RealmFailed { .. }));
    }

    #[test]
    fn require_all_merges_and_marks_agreement() {
        let token = UsernamePasswordToken::new("alice", "pw");
        let agg = RequireAll
            .after_each(
                &NamedRealm("a"),
                &token,
                Some(record("a", "alice")),
                Some(IdentityRecord::empty()),
                None,
            )
            .unwrap();
        let agg = RequireAll
            .after_each(&NamedRealm("b"), &token, Some(record("b", "7")), agg, None)
            .unwrap();

        let result = RequireAll.after_all(&token, agg).unwrap();
        assert_eq!(result.principals().len(), 2);
        assert_eq!(result.agreement(), Agreement::AllRealms);
    }

    #[test]
    fn at_least_one_tolerates_failures() {
        let token = UsernamePasswordToken::new("alice", "pw");
        let agg = RequireAtLeastOne
            .after_each(
                &NamedRealm("a"),
                &token,
                None,
                Some(IdentityRecord::empty()),
                Some(anyhow::anyhow!("down")),
            )
            .unwrap();

        assert!(agg.as_ref().is_some_and(IdentityRecord::is_empty));
        assert!(matches!(
            RequireAtLeastOne.after_all(&token, agg),
            Err(AuthenticationError::NoRealmAuthenticated)
        ));
    }

    #[test]
    fn first_success_starts_absent_and_keeps_the_winner() {
        let token = UsernamePasswordToken::new("alice", "pw");
        let agg = FirstSuccessWins.before_all(&[], &token).unwrap();
        assert!(agg.is_none());

        let agg = FirstSuccessWins
            .after_each(&NamedRealm("a"), &token, None, agg, Some(anyhow::anyhow!("no")))
            .unwrap();
        assert!(agg.is_none());

        let agg = FirstSuccessWins
            .after_each(&NamedRealm("b"), &token, Some(record("b", "bob")), agg, None)
            .unwrap();
        let agg = FirstSuccessWins
            .after_each(&NamedRealm("c"), &token, Some(record("c", "carol")), agg, None)
            .unwrap();

        let result = FirstSuccessWins.after_all(&token, agg).unwrap();
        assert_eq!(result.principals().iter().collect::<Vec<_>>(), vec!["bob"]);
        assert_eq!(result.agreement(), Agreement::AnyRealm);
    }

    #[test]
    fn default_after_all_fails_on_absent_aggregate() {
        struct Defaults;
        impl AuthenticationStrategy for Defaults {}

        let token = BearerToken::new("t");
        assert!(Defaults.after_all(&token, None).is_err());
        assert!(Defaults.after_all(&token, Some(IdentityRecord::empty())).is_ok());
    }

    #[test]
    fn strategy_kind_parses_names() {
        assert_eq!("all".parse::<StrategyKind>().unwrap(), StrategyKind::RequireAll);
        assert_eq!(
            " AT_LEAST_ONE ".parse::<StrategyKind>().unwrap(),
            StrategyKind::RequireAtLeastOne,
        );
        assert_eq!("first".parse::<StrategyKind>().unwrap(), StrategyKind::FirstSuccessWins);
        assert!("majority".parse::<StrategyKind>().is_err());
        assert_eq!(StrategyKind::default().to_string(), "at_least_one");
    }
}
