//! # Remember-me storage
//!
//! Where remembered identities physically live (a cookie, a database row)
//! is outside this crate's concern. [`RememberMeStore`] is the port; the
//! bytes it receives are already serialized and, when configured, encrypted.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use anyhow::Result;

/// Opaque byte storage keyed by a caller-supplied name (e.g. a cookie name).
pub trait RememberMeStore: Send + Sync {
    /// Returns the stored bytes, or `None` for a visitor with nothing stored.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Removes the stored bytes. Deleting a missing entry is not an error.
    fn delete(&self, name: &str) -> Result<()>;
}

/// [`RememberMeStore`] backed by a map, for tests and single-process tools.
#[derive(Debug, Default)]
pub struct MemoryRememberMeStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryRememberMeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites an entry directly, bypassing the pipeline.
    pub fn put_raw(&self, name: &str, bytes: Vec<u8>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), bytes);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl RememberMeStore for MemoryRememberMeStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned())
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.put_raw(name, bytes.to_vec());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_delete() {
        let store = MemoryRememberMeStore::new();
        assert_eq!(store.read("rememberMe").unwrap(), None);

        store.write("rememberMe", b"abc").unwrap();
        assert_eq!(store.read("rememberMe").unwrap(), Some(b"abc".to_vec()));
        assert!(store.contains("rememberMe"));

        store.delete("rememberMe").unwrap();
        assert!(!store.contains("rememberMe"));
        store.delete("rememberMe").unwrap();
    }

    fn assert_send_sync<T: ?Sized + Send + Sync>() {}
    #[test]
    fn dyn_store_is_send_sync() {
        assert_send_sync::<dyn RememberMeStore>();
    }
}
