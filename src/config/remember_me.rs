//! # Remember-me configuration
//!
//! Cookie settings and cipher keys for the remember-me pipeline.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `REMEMBER_ME_COOKIE` | Cookie name | `rememberMe` |
//! | `REMEMBER_ME_MAX_AGE_DAYS` | Cookie lifetime in days | `365` |
//! | `REMEMBER_ME_COOKIE_SECURE` | `Secure` flag | `true` |
//! | `REMEMBER_ME_COOKIE_HTTPONLY` | `HttpOnly` flag | `true` |
//! | `REMEMBER_ME_CIPHER_KEY` | AES-256 key, base64, both directions | random |
//! | `REMEMBER_ME_CIPHER_KEY_HEX` | Same, hex encoded | *none* |
//! | `REMEMBER_ME_ENCRYPTION_KEY` | Base64 key used for writing only | *none* |
//! | `REMEMBER_ME_DECRYPTION_KEY` | Base64 key used for reading only | *none* |
//!
//! Without any key a random one is generated and a warning is logged;
//! remembered identities then stop working at the next restart.
//!
//! # Example
//! ```rust
//! use wzs_auth::config::remember_me::RememberMeConfig;
//!
//! let cfg = RememberMeConfig::from_env_with(|k| match k {
//!     "REMEMBER_ME_COOKIE" => Some("rm".into()),
//!     "REMEMBER_ME_CIPHER_KEY_HEX" => Some("11".repeat(32)),
//!     _ => None,
//! });
//! assert_eq!(cfg.cookie_name, "rm");
//! assert!(cfg.has_configured_key());
//!
//! let pipeline = cfg.build_pipeline().unwrap();
//! assert_eq!(pipeline.name(), "rm");
//! ```

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use crate::config::env::{read_flag_from, read_string_from, read_u32_from};
use crate::error::KeyError;
use crate::remember_me::pipeline::{DEFAULT_REMEMBER_ME_NAME, RememberMePipeline};

pub const DEFAULT_MAX_AGE_DAYS: u32 = 365;

#[derive(Clone, Debug)]
enum CipherKey {
    Base64(SecretString),
    Hex(SecretString),
}

/// Remember-me cookie flags and key material.
#[derive(Clone, Debug)]
pub struct RememberMeConfig {
    pub cookie_name: String,
    pub max_age_days: u32,
    pub cookie_secure: bool,
    pub cookie_http_only: bool,
    cipher_key: Option<CipherKey>,
    encryption_key: Option<SecretString>,
    decryption_key: Option<SecretString>,
}

impl RememberMeConfig {
    pub fn from_env() -> Self {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Loads configuration through a custom key provider.
    pub fn from_env_with<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let cipher_key = read_string_from(&get, "REMEMBER_ME_CIPHER_KEY")
            .map(|k| CipherKey::Base64(SecretString::from(k)))
            .or_else(|| {
                read_string_from(&get, "REMEMBER_ME_CIPHER_KEY_HEX")
                    .map(|k| CipherKey::Hex(SecretString::from(k)))
            });

        Self {
            cookie_name: read_string_from(&get, "REMEMBER_ME_COOKIE")
                .unwrap_or_else(|| DEFAULT_REMEMBER_ME_NAME.to_string()),
            max_age_days: read_u32_from(&get, "REMEMBER_ME_MAX_AGE_DAYS", DEFAULT_MAX_AGE_DAYS),
            cookie_secure: read_flag_from(&get, "REMEMBER_ME_COOKIE_SECURE", true),
            cookie_http_only: read_flag_from(&get, "REMEMBER_ME_COOKIE_HTTPONLY", true),
            cipher_key,
            encryption_key: read_string_from(&get, "REMEMBER_ME_ENCRYPTION_KEY")
                .map(SecretString::from),
            decryption_key: read_string_from(&get, "REMEMBER_ME_DECRYPTION_KEY")
                .map(SecretString::from),
        }
    }

    /// Whether any key was configured explicitly.
    pub fn has_configured_key(&self) -> bool {
        self.cipher_key.is_some() || self.encryption_key.is_some() || self.decryption_key.is_some()
    }

    /// Cookie lifetime.
    pub fn max_age(&self) -> time::Duration {
        time::Duration::days(i64::from(self.max_age_days))
    }

    /// Builds an AES-GCM pipeline with the configured keys.
    ///
    /// Directional keys override the shared one for their direction.
    pub fn build_pipeline(&self) -> Result<RememberMePipeline, KeyError> {
        let mut pipeline = RememberMePipeline::new().with_name(self.cookie_name.clone());

        if !self.has_configured_key() {
            warn!(
                cookie = %self.cookie_name,
                "no remember-me cipher key configured; using a random key, remembered \
                 identities will not survive a restart"
            );
            return Ok(pipeline);
        }

        match &self.cipher_key {
            Some(CipherKey::Base64(key)) => pipeline.set_cipher_key_base64(key.expose_secret())?,
            Some(CipherKey::Hex(key)) => pipeline.set_cipher_key_hex(key.expose_secret())?,
            None => {}
        }
        if let Some(key) = &self.encryption_key {
            pipeline.set_encryption_key_base64(key.expose_secret())?;
        }
        if let Some(key) = &self.decryption_key {
            pipeline.set_decryption_key_base64(key.expose_secret())?;
        }

        Ok(pipeline)
    }
}

impl Default for RememberMeConfig {
    fn default() -> Self {
        Self::from_env_with(|_| None)
    }
}
