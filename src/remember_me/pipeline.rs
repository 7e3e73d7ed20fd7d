//! # Remember-me pipeline
//!
//! `PrincipalSet → serializer → cipher → store` on the way out, and the
//! reverse on the way back in.
//!
//! Nothing here ever fails a login or a request. Writing problems are
//! logged and skipped. Reading problems (store errors, wrong key, tampered
//! bytes, malformed data) are logged, the stored record is deleted, and the
//! caller is treated as a new visitor.

use std::fmt;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use secrecy::{ExposeSecret, SecretSlice};
use tracing::{debug, trace, warn};

use super::cipher::{AesGcmCipherService, CipherService};
use super::serializer::{JsonPrincipalSerializer, PrincipalSerializer};
use super::store::RememberMeStore;
use crate::auth::identity::IdentityRecord;
use crate::auth::principal::PrincipalSet;
use crate::auth::token::AuthenticationToken;
use crate::error::{CipherError, KeyError};

/// Default storage name, also used as the cookie name.
pub const DEFAULT_REMEMBER_ME_NAME: &str = "rememberMe";

/// Serializes, protects and stores remembered identities.
///
/// # Example
/// ```rust
/// use wzs_auth::auth::principal::PrincipalSet;
/// use wzs_auth::remember_me::pipeline::RememberMePipeline;
/// use wzs_auth::remember_me::store::MemoryRememberMeStore;
///
/// let pipeline = RememberMePipeline::new();
/// let store = MemoryRememberMeStore::new();
/// let alice = PrincipalSet::single("db", "alice");
///
/// pipeline.remember(&store, &alice).unwrap();
/// assert_eq!(pipeline.recall(&store), Some(alice));
///
/// pipeline.forget(&store);
/// assert_eq!(pipeline.recall(&store), None);
/// ```
pub struct RememberMePipeline {
    name: String,
    serializer: Arc<dyn PrincipalSerializer>,
    cipher: Option<Arc<dyn CipherService>>,
    encryption_key: Option<SecretSlice<u8>>,
    decryption_key: Option<SecretSlice<u8>>,
}

impl RememberMePipeline {
    /// AES-256-GCM with a freshly generated key.
    ///
    /// Identities remembered with a generated key are unreadable after a
    /// restart; configure a fixed key for anything long-lived.
    pub fn new() -> Self {
        let mut pipeline = Self::without_cipher();
        pipeline.cipher = Some(Arc::new(AesGcmCipherService));
        pipeline.set_cipher_key(AesGcmCipherService::generate_key());
        pipeline
    }

    /// Stores serialized principals as-is.
    pub fn without_cipher() -> Self {
        Self {
            name: DEFAULT_REMEMBER_ME_NAME.to_string(),
            serializer: Arc::new(JsonPrincipalSerializer),
            cipher: None,
            encryption_key: None,
            decryption_key: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn PrincipalSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Replaces the cipher. Keys are kept.
    pub fn with_cipher(mut self, cipher: Option<Arc<dyn CipherService>>) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_cipher(&self) -> bool {
        self.cipher.is_some()
    }

    /// Uses `key` for both directions.
    pub fn set_cipher_key(&mut self, key: impl Into<Vec<u8>>) {
        let key = key.into();
        self.encryption_key = Some(SecretSlice::from(key.clone()));
        self.decryption_key = Some(SecretSlice::from(key));
    }

    pub fn set_encryption_key(&mut self, key: impl Into<Vec<u8>>) {
        self.encryption_key = Some(SecretSlice::from(key.into()));
    }

    pub fn set_decryption_key(&mut self, key: impl Into<Vec<u8>>) {
        self.decryption_key = Some(SecretSlice::from(key.into()));
    }

    pub fn set_cipher_key_hex(&mut self, key: &str) -> Result<(), KeyError> {
        self.set_cipher_key(hex::decode(key.trim())?);
        Ok(())
    }

    pub fn set_cipher_key_base64(&mut self, key: &str) -> Result<(), KeyError> {
        self.set_cipher_key(STANDARD.decode(key.trim())?);
        Ok(())
    }

    pub fn set_encryption_key_hex(&mut self, key: &str) -> Result<(), KeyError> {
        self.set_encryption_key(hex::decode(key.trim())?);
        Ok(())
    }

    pub fn set_encryption_key_base64(&mut self, key: &str) -> Result<(), KeyError> {
        self.set_encryption_key(STANDARD.decode(key.trim())?);
        Ok(())
    }

    pub fn set_decryption_key_hex(&mut self, key: &str) -> Result<(), KeyError> {
        self.set_decryption_key(hex::decode(key.trim())?);
        Ok(())
    }

    pub fn set_decryption_key_base64(&mut self, key: &str) -> Result<(), KeyError> {
        self.set_decryption_key(STANDARD.decode(key.trim())?);
        Ok(())
    }

    /// Stores `principals`, returning the bytes written.
    ///
    /// Returns `None` (after logging) if any stage fails.
    pub fn remember(
        &self,
        store: &dyn RememberMeStore,
        principals: &PrincipalSet,
    ) -> Option<Vec<u8>> {
        match self.try_remember(store, principals) {
            Ok(bytes) => {
                debug!(name = %self.name, identity = %principals, "remembered identity");
                Some(bytes)
            }
            Err(err) => {
                warn!(
                    name = %self.name,
                    error = %format!("{err:#}"),
                    "unable to remember identity"
                );
                None
            }
        }
    }

    fn try_remember(
        &self,
        store: &dyn RememberMeStore,
        principals: &PrincipalSet,
    ) -> anyhow::Result<Vec<u8>> {
        let serialized = self.serializer.serialize(principals)?;
        let bytes = self.encrypt(&serialized)?;
        store.write(&self.name, &bytes)?;
        Ok(bytes)
    }

    /// Reads back a remembered identity.
    ///
    /// `None` for a new visitor and for anything that cannot be read; in the
    /// latter case the stored record is also deleted.
    pub fn recall(&self, store: &dyn RememberMeStore) -> Option<PrincipalSet> {
        match self.try_recall(store) {
            Ok(principals) => principals,
            Err(err) => {
                self.on_recall_failure(store, &err);
                None
            }
        }
    }

    fn try_recall(&self, store: &dyn RememberMeStore) -> anyhow::Result<Option<PrincipalSet>> {
        let Some(bytes) = store.read(&self.name)? else {
            return Ok(None);
        };
        if bytes.is_empty() {
            return Ok(None);
        }

        let plain = self.decrypt(&bytes)?;
        let principals = self.serializer.deserialize(&plain)?;
        trace!(name = %self.name, identity = %principals, "recalled identity");
        Ok(Some(principals))
    }

    fn on_recall_failure(&self, store: &dyn RememberMeStore, err: &anyhow::Error) {
        warn!(
            name = %self.name,
            error = %format!("{err:#}"),
            "discarding unreadable remembered identity; if the cipher key was changed, \
             identities remembered with the old key can no longer be read"
        );
        self.forget(store);
    }

    /// Deletes the stored identity. Failures are logged.
    pub fn forget(&self, store: &dyn RememberMeStore) {
        if let Err(err) = store.delete(&self.name) {
            warn!(
                name = %self.name,
                error = %format!("{err:#}"),
                "unable to forget remembered identity"
            );
        }
    }

    pub fn on_successful_login(
        &self,
        store: &dyn RememberMeStore,
        token: &dyn AuthenticationToken,
        record: &IdentityRecord,
    ) {
        self.forget(store);

        if token.is_remember_me() {
            self.remember(store, record.principals());
        } else {
            trace!(principal = token.principal(), "remember-me not requested");
        }
    }

    pub fn on_failed_login(&self, store: &dyn RememberMeStore) {
        self.forget(store);
    }

    pub fn on_logout(&self, store: &dyn RememberMeStore) {
        self.forget(store);
    }

    fn encrypt(&self, bytes: &[u8]) -> Result<Vec<u8>, CipherError> {
        let Some(cipher) = &self.cipher else {
            return Ok(bytes.to_vec());
        };
        let key = self
            .encryption_key
            .as_ref()
            .ok_or(CipherError::MissingKey("encryption"))?;
        cipher.encrypt(bytes, key.expose_secret())
    }

    fn decrypt(&self, bytes: &[u8]) -> Result<Vec<u8>, CipherError> {
        let Some(cipher) = &self.cipher else {
            return Ok(bytes.to_vec());
        };
        let key = self
            .decryption_key
            .as_ref()
            .ok_or(CipherError::MissingKey("decryption"))?;
        cipher.decrypt(bytes, key.expose_secret())
    }
}

impl Default for RememberMePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RememberMePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RememberMePipeline")
            .field("name", &self.name)
            .field("cipher", &self.cipher.is_some())
            .field("encryption_key", &self.encryption_key.is_some())
            .field("decryption_key", &self.decryption_key.is_some())
            .finish()
    }
}
