//! # Authentication coordinator
//!
//! [`AuthenticationCoordinator`] consults the configured realms for one
//! submitted token and turns their answers into a single
//! [`IdentityRecord`].
//!
//! - One realm: the realm is called directly and no strategy hook runs.
//! - Several realms: each realm is visited in configured order and the
//!   [`AuthenticationStrategy`] decides how results combine. Realm errors
//!   are handed to the strategy as values; only the strategy decides whether
//!   they end the attempt.
//!
//! # Example
//! ```rust
//! use std::sync::Arc;
//! use wzs_auth::auth::coordinator::{AuthenticationCoordinator, Authenticator};
//! use wzs_auth::auth::identity::IdentityRecord;
//! use wzs_auth::auth::principal::PrincipalSet;
//! use wzs_auth::auth::realm::Realm;
//! use wzs_auth::auth::strategy::FirstSuccessWins;
//! use wzs_auth::auth::token::{AuthenticationToken, UsernamePasswordToken};
//!
//! struct Echo(&'static str);
//!
//! impl Realm for Echo {
//!     fn name(&self) -> &str { self.0 }
//!     fn supports(&self, _t: &dyn AuthenticationToken) -> bool { true }
//!     fn identity(&self, t: &dyn AuthenticationToken) -> anyhow::Result<Option<IdentityRecord>> {
//!         Ok(Some(IdentityRecord::new(PrincipalSet::single(self.0, t.principal()))))
//!     }
//! }
//!
//! let coordinator = AuthenticationCoordinator::new(vec![
//!     Arc::new(Echo("a")) as Arc<dyn Realm>,
//!     Arc::new(Echo("b")),
//! ])
//! .with_strategy(Arc::new(FirstSuccessWins));
//!
//! let record = coordinator
//!     .authenticate(&UsernamePasswordToken::new("alice", "pw"))
//!     .unwrap();
//! assert_eq!(record.principals().realm_names(), vec!["a"]);
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

use super::identity::IdentityRecord;
use super::listener::{AuthenticationListener, ListenerRegistry};
use super::principal::PrincipalSet;
use super::realm::Realm;
use super::strategy::{AuthenticationStrategy, RequireAtLeastOne};
use super::token::AuthenticationToken;
use crate::error::AuthenticationError;

/// Turns a submitted token into an [`IdentityRecord`].
pub trait Authenticator: Send + Sync {
    fn authenticate(
        &self,
        token: &dyn AuthenticationToken,
    ) -> Result<IdentityRecord, AuthenticationError>;

    /// Called when a subject holding `principals` logs out.
    fn on_logout(&self, _principals: &PrincipalSet) {}

    /// Listener registration capability, if this authenticator has it.
    fn listener_registry(&self) -> Option<&dyn ListenerRegistry> {
        None
    }
}

/// Realm-driven [`Authenticator`] governed by an [`AuthenticationStrategy`].
///
/// Defaults to [`RequireAtLeastOne`] when several realms are configured.
pub struct AuthenticationCoordinator {
    realms: Vec<Arc<dyn Realm>>,
    strategy: Arc<dyn AuthenticationStrategy>,
    listeners: RwLock<Vec<Arc<dyn AuthenticationListener>>>,
}

impl AuthenticationCoordinator {
    pub fn new(realms: Vec<Arc<dyn Realm>>) -> Self {
        Self {
            realms,
            strategy: Arc::new(RequireAtLeastOne),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Replaces the strategy used for multi-realm attempts.
    pub fn with_strategy(mut self, strategy: Arc<dyn AuthenticationStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn realms(&self) -> &[Arc<dyn Realm>] {
        &self.realms
    }

    fn do_authenticate(
        &self,
        token: &dyn AuthenticationToken,
    ) -> Result<IdentityRecord, AuthenticationError> {
        match self.realms.as_slice() {
            [] => Err(AuthenticationError::NoRealmsConfigured),
            [realm] => Self::single_realm(realm.as_ref(), token),
            realms => self.multi_realm(realms, token),
        }
    }

    fn single_realm(
        realm: &dyn Realm,
        token: &dyn AuthenticationToken,
    ) -> Result<IdentityRecord, AuthenticationError> {
        if !realm.supports(token) {
            return Err(AuthenticationError::UnsupportedToken {
                realm: realm.name().to_string(),
                kind: token.kind(),
            });
        }

        let record = realm
            .identity(token)
            .map_err(|source| AuthenticationError::RealmFailed {
                realm: realm.name().to_string(),
                source,
            })?;

        record
            .filter(|record| !record.is_empty())
            .ok_or_else(|| AuthenticationError::UnknownIdentity {
                realm: realm.name().to_string(),
                principal: token.principal().to_string(),
            })
    }

    fn multi_realm(
        &self,
        realms: &[Arc<dyn Realm>],
        token: &dyn AuthenticationToken,
    ) -> Result<IdentityRecord, AuthenticationError> {
        let strategy = self.strategy.as_ref();
        let mut aggregate = strategy.before_all(realms, token)?;

        trace!(realms = realms.len(), "iterating realms for multi-realm authentication");

        for realm in realms {
            let realm = realm.as_ref();
            aggregate = strategy.before_each(realm, token, aggregate)?;

            if !realm.supports(token) {
                debug!(
                    realm = realm.name(),
                    kind = token.kind(),
                    "realm does not support token; skipping"
                );
                continue;
            }

            trace!(realm = realm.name(), principal = token.principal(), "attempting realm");

            let (single, failure) = match realm.identity(token) {
                Ok(single) => (single, None),
                Err(err) => {
                    debug!(
                        realm = realm.name(),
                        error = %err,
                        "realm failed during multi-realm attempt"
                    );
                    (None, Some(err))
                }
            };

            aggregate = strategy.after_each(realm, token, single, aggregate, failure)?;
        }

        strategy.after_all(token, aggregate)
    }

    fn snapshot_listeners(&self) -> Vec<Arc<dyn AuthenticationListener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Authenticator for AuthenticationCoordinator {
    fn authenticate(
        &self,
        token: &dyn AuthenticationToken,
    ) -> Result<IdentityRecord, AuthenticationError> {
        let result = self.do_authenticate(token);

        match &result {
            Ok(record) => {
                debug!(
                    principal = token.principal(),
                    identity = %record.principals(),
                    "authentication succeeded"
                );
                for listener in self.snapshot_listeners() {
                    listener.on_success(token, record);
                }
            }
            Err(err) => {
                debug!(principal = token.principal(), error = %err, "authentication failed");
                for listener in self.snapshot_listeners() {
                    listener.on_failure(token, err);
                }
            }
        }

        result
    }

    fn on_logout(&self, principals: &PrincipalSet) {
        for listener in self.snapshot_listeners() {
            listener.on_logout(principals);
        }
        for realm in &self.realms {
            if let Some(aware) = realm.logout_aware() {
                aware.on_logout(principals);
            }
        }
    }

    fn listener_registry(&self) -> Option<&dyn ListenerRegistry> {
        Some(self)
    }
}

impl ListenerRegistry for AuthenticationCoordinator {
    fn add_listener(&self, listener: Arc<dyn AuthenticationListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn listeners(&self) -> Vec<Arc<dyn AuthenticationListener>> {
        self.snapshot_listeners()
    }
}
