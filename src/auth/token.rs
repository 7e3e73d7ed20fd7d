//! # Authentication tokens
//!
//! A token is what a caller submits for one login attempt. Realms decide
//! whether they [`support`](crate::auth::realm::Realm::supports) a token and
//! downcast it through [`AuthenticationToken::as_any`] to read credentials.

use std::any::Any;
use std::fmt;
use std::net::IpAddr;

use secrecy::{ExposeSecret, SecretString};

/// A submitted credential.
pub trait AuthenticationToken: fmt::Debug + Send + Sync + 'static {
    /// The identifying part of the token (username, key id, …).
    fn principal(&self) -> &str;

    /// Short, stable name of the token kind, used in error messages.
    fn kind(&self) -> &'static str;

    /// Whether the caller asked for the identity to be remembered.
    fn is_remember_me(&self) -> bool {
        false
    }

    /// Address the attempt originated from, if known.
    fn host(&self) -> Option<IpAddr> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Username and password login.
///
/// The password is held as a [`SecretString`], so `Debug` output never
/// contains it.
///
/// # Example
/// ```rust
/// use wzs_auth::auth::token::{AuthenticationToken, UsernamePasswordToken};
///
/// let token = UsernamePasswordToken::new("alice", "s3cret").remember_me(true);
/// assert_eq!(token.principal(), "alice");
/// assert!(token.is_remember_me());
/// assert!(!format!("{token:?}").contains("s3cret"));
/// ```
#[derive(Clone, Debug)]
pub struct UsernamePasswordToken {
    username: String,
    password: SecretString,
    remember_me: bool,
    host: Option<IpAddr>,
}

impl UsernamePasswordToken {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            remember_me: false,
            host: None,
        }
    }

    pub fn remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = Some(host);
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl AuthenticationToken for UsernamePasswordToken {
    fn principal(&self) -> &str {
        &self.username
    }

    fn kind(&self) -> &'static str {
        "username_password"
    }

    fn is_remember_me(&self) -> bool {
        self.remember_me
    }

    fn host(&self) -> Option<IpAddr> {
        self.host
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An opaque bearer credential (API key, externally issued token, …).
#[derive(Clone, Debug)]
pub struct BearerToken {
    token: SecretString,
    host: Option<IpAddr>,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            host: None,
        }
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = Some(host);
        self
    }

    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }
}

impl AuthenticationToken for BearerToken {
    // Bearer tokens carry no separate identifier.
    fn principal(&self) -> &str {
        "<bearer>"
    }

    fn kind(&self) -> &'static str {
        "bearer"
    }

    fn host(&self) -> Option<IpAddr> {
        self.host
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn username_password_token_exposes_fields() {
        let host = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let token = UsernamePasswordToken::new("alice", "pw").with_host(host);

        assert_eq!(token.username(), "alice");
        assert_eq!(token.password(), "pw");
        assert_eq!(AuthenticationToken::host(&token), Some(host));
        assert!(!token.is_remember_me());
        assert_eq!(token.kind(), "username_password");
    }

    #[test]
    fn debug_redacts_secrets() {
        let token = UsernamePasswordToken::new("alice", "hunter2");
        let bearer = BearerToken::new("tok-123");

        assert!(!format!("{token:?}").contains("hunter2"));
        assert!(!format!("{bearer:?}").contains("tok-123"));
    }

    #[test]
    fn downcast_through_trait_object() {
        let token: Box<dyn AuthenticationToken> = Box::new(BearerToken::new("abc"));

        let bearer = token.as_any().downcast_ref::<BearerToken>();
        assert_eq!(bearer.map(BearerToken::token), Some("abc"));
        assert!(token.as_any().downcast_ref::<UsernamePasswordToken>().is_none());
    }
}
