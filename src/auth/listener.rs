use std::sync::Arc;

use super::identity::IdentityRecord;
use super::principal::PrincipalSet;
use super::token::AuthenticationToken;
use crate::error::AuthenticationError;

/// Receives notifications about authentication outcomes.
///
/// All methods default to doing nothing, so listeners implement only the
/// events they care about (audit logging, lockout counters, cache eviction).
pub trait AuthenticationListener: Send + Sync {
    fn on_success(&self, _token: &dyn AuthenticationToken, _record: &IdentityRecord) {}

    fn on_failure(&self, _token: &dyn AuthenticationToken, _error: &AuthenticationError) {}

    fn on_logout(&self, _principals: &PrincipalSet) {}
}

/// Capability of an authenticator that accepts listener registration.
///
/// Reached through
/// [`Authenticator::listener_registry`](super::coordinator::Authenticator::listener_registry);
/// authenticators without it return `None`.
pub trait ListenerRegistry: Send + Sync {
    fn add_listener(&self, listener: Arc<dyn AuthenticationListener>);

    fn listeners(&self) -> Vec<Arc<dyn AuthenticationListener>>;
}
