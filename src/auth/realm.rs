use anyhow::Result;

use super::identity::IdentityRecord;
use super::principal::PrincipalSet;
use super::token::AuthenticationToken;

/// A pluggable credential-verification backend.
///
/// Realms are consulted by the
/// [`AuthenticationCoordinator`](crate::auth::coordinator::AuthenticationCoordinator)
/// in their configured order. How a realm matches credentials (password
/// hashing, directory bind, …) is entirely its own business.
///
/// Implementations must be `Send + Sync` so they can be shared via `Arc`.
pub trait Realm: Send + Sync {
    /// Name used to attribute principals and errors to this realm.
    fn name(&self) -> &str;

    /// Whether this realm can verify tokens of this kind at all.
    fn supports(&self, token: &dyn AuthenticationToken) -> bool;

    /// Verifies `token`.
    ///
    /// ## Returns
    /// - `Ok(Some(record))` when the token identifies an account
    /// - `Ok(None)` when no matching account exists
    ///
    /// ## Errors
    /// Any failure (bad credentials, locked account, backend outage).
    /// During multi-realm authentication the error is handed to the
    /// strategy as data rather than propagated.
    fn identity(&self, token: &dyn AuthenticationToken) -> Result<Option<IdentityRecord>>;

    /// Logout capability. Realms that keep per-subject state return `Some`.
    fn logout_aware(&self) -> Option<&dyn LogoutAware> {
        None
    }
}

/// Capability of a realm that wants to clean up when a subject logs out.
pub trait LogoutAware: Send + Sync {
    fn on_logout(&self, principals: &PrincipalSet);
}
