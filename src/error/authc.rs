use thiserror::Error;

/// Failure of a single authentication attempt.
///
/// A failed [`authenticate`](crate::auth::coordinator::Authenticator::authenticate)
/// call surfaces exactly one of these, describing the first decisive cause.
///
/// # Example
/// ```
/// use wzs_auth::error::AuthenticationError;
///
/// let err = AuthenticationError::UnsupportedToken {
///     realm: "ldap".into(),
///     kind: "bearer",
/// };
/// assert_eq!(
///     err.to_string(),
///     "realm `ldap` does not support authentication tokens of kind `bearer`"
/// );
/// ```
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// The coordinator has no realms to consult.
    #[error("no realms have been configured; at least one realm is required to authenticate")]
    NoRealmsConfigured,

    /// The named realm does not accept this kind of token.
    #[error("realm `{realm}` does not support authentication tokens of kind `{kind}`")]
    UnsupportedToken { realm: String, kind: &'static str },

    /// The named realm accepted the token kind but found no matching identity.
    #[error("realm `{realm}` found no identity for `{principal}`")]
    UnknownIdentity { realm: String, principal: String },

    /// The named realm raised an error while verifying the token.
    #[error("realm `{realm}` failed to authenticate the submitted token")]
    RealmFailed {
        realm: String,
        #[source]
        source: anyhow::Error,
    },

    /// A tolerant strategy visited every realm and none of them succeeded.
    #[error("no realm was able to authenticate the submitted token")]
    NoRealmAuthenticated,

    /// The authenticator does not offer an optional capability a caller asked for.
    #[error("{0} is not supported by the configured authenticator")]
    CapabilityNotSupported(&'static str),

    /// A custom strategy rejected the attempt.
    #[error("authentication rejected: {0}")]
    Strategy(String),
}

impl AuthenticationError {
    /// Name of the realm the error is attributed to, if any.
    pub fn realm(&self) -> Option<&str> {
        match self {
            Self::UnsupportedToken { realm, .. }
            | Self::UnknownIdentity { realm, .. }
            | Self::RealmFailed { realm, .. } => Some(realm),
            _ => None,
        }
    }
}
