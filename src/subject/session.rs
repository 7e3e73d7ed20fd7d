//! # Sessions
//!
//! The session store is an external collaborator. This module defines the
//! [`Session`] port the core consumes plus an in-memory implementation.
//!
//! Attribute values are plain [`serde_json::Value`]s. The store keeps a copy
//! of what it was given, so changing a value after `set_attribute` has no
//! effect until it is written again.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Result, bail};
use serde_json::Value;
use uuid::Uuid;

/// A server-side session bound to one subject.
pub trait Session: Send + Sync {
    fn id(&self) -> &str;

    /// Address of the client that created the session, if known.
    fn host(&self) -> Option<IpAddr>;

    fn attribute(&self, key: &str) -> Result<Option<Value>>;

    fn set_attribute(&self, key: &str, value: Value) -> Result<()>;

    /// Removes `key`, returning the previous value.
    fn remove_attribute(&self, key: &str) -> Result<Option<Value>>;

    /// Ends the session. Further attribute access fails.
    fn stop(&self) -> Result<()>;
}

/// Creates sessions on demand.
pub trait SessionFactory: Send + Sync {
    fn create(&self, host: Option<IpAddr>) -> Result<Arc<dyn Session>>;
}

/// In-memory [`Session`] keyed by a random UUID.
///
/// # Example
/// ```rust
/// use serde_json::json;
/// use wzs_auth::subject::session::{MemorySession, Session};
///
/// let session = MemorySession::new(None);
/// session.set_attribute("theme", json!("dark")).unwrap();
/// assert_eq!(session.attribute("theme").unwrap(), Some(json!("dark")));
/// ```
#[derive(Debug)]
pub struct MemorySession {
    id: String,
    host: Option<IpAddr>,
    state: RwLock<SessionState>,
}

#[derive(Debug, Default)]
struct SessionState {
    attributes: HashMap<String, Value>,
    stopped: bool,
}

impl MemorySession {
    pub fn new(host: Option<IpAddr>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            host,
            state: RwLock::new(SessionState::default()),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .stopped
    }
}

impl Session for MemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn host(&self) -> Option<IpAddr> {
        self.host
    }

    fn attribute(&self, key: &str) -> Result<Option<Value>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if state.stopped {
            bail!("session `{}` has been stopped", self.id);
        }
        Ok(state.attributes.get(key).cloned())
    }

    fn set_attribute(&self, key: &str, value: Value) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.stopped {
            bail!("session `{}` has been stopped", self.id);
        }
        state.attributes.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_attribute(&self, key: &str) -> Result<Option<Value>> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.stopped {
            bail!("session `{}` has been stopped", self.id);
        }
        Ok(state.attributes.remove(key))
    }

    fn stop(&self) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.stopped = true;
        state.attributes.clear();
        Ok(())
    }
}

/// [`SessionFactory`] producing [`MemorySession`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemorySessionFactory;

impl SessionFactory for MemorySessionFactory {
    fn create(&self, host: Option<IpAddr>) -> Result<Arc<dyn Session>> {
        Ok(Arc::new(MemorySession::new(host)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::Ipv4Addr;

    #[test]
    fn attributes_round_trip_and_remove() {
        let session = MemorySession::new(None);

        session.set_attribute("k", json!([1, 2])).unwrap();
        assert_eq!(session.attribute("k").unwrap(), Some(json!([1, 2])));

        assert_eq!(session.remove_attribute("k").unwrap(), Some(json!([1, 2])));
        assert_eq!(session.attribute("k").unwrap(), None);
        assert_eq!(session.remove_attribute("k").unwrap(), None);
    }

    #[test]
    fn stored_values_are_copies() {
        let session = MemorySession::new(None);
        let mut value = json!(["a"]);
        session.set_attribute("k", value.clone()).unwrap();

        value.as_array_mut().unwrap().push(json!("b"));

        assert_eq!(session.attribute("k").unwrap(), Some(json!(["a"])));
    }

    #[test]
    fn stopped_session_rejects_access() {
        let session = MemorySession::new(None);
        session.set_attribute("k", json!(1)).unwrap();

        session.stop().unwrap();

        assert!(session.is_stopped());
        assert!(session.attribute("k").is_err());
        assert!(session.set_attribute("k", json!(2)).is_err());
    }

    #[test]
    fn factory_creates_distinct_sessions_with_host() {
        let host = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let a = MemorySessionFactory.create(Some(host)).unwrap();
        let b = MemorySessionFactory.create(None).unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(a.host(), Some(host));
        assert_eq!(b.host(), None);
    }
}
