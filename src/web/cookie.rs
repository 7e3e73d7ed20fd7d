//! # Remember-me cookie store
//!
//! [`RememberMeStore`] over an [`axum_extra`] [`CookieJar`].
//!
//! Bytes are stored Base64 encoded (URL-safe, no padding). The jar starts as
//! the request's cookies; every write and delete is recorded in it, and
//! [`CookieRememberMeStore::jar`] hands the result back for the response.
//!
//! # Example
//! ```rust
//! use axum_extra::extract::cookie::CookieJar;
//! use wzs_auth::remember_me::store::RememberMeStore;
//! use wzs_auth::web::cookie::CookieRememberMeStore;
//!
//! let max_age = time::Duration::days(30);
//! let store = CookieRememberMeStore::with_flags(CookieJar::new(), true, true, max_age);
//! store.write("rememberMe", b"abc").unwrap();
//!
//! let jar = store.jar();
//! let cookie = jar.get("rememberMe").unwrap();
//! assert_eq!(cookie.value(), "YWJj");
//! assert_eq!(cookie.secure(), Some(true));
//! ```

use std::sync::{Mutex, PoisonError};

use anyhow::{Context as _, Result};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::config::remember_me::RememberMeConfig;
use crate::remember_me::store::RememberMeStore;

#[derive(Debug)]
pub struct CookieRememberMeStore {
    jar: Mutex<CookieJar>,
    secure: bool,
    http_only: bool,
    max_age: time::Duration,
}

impl CookieRememberMeStore {
    /// Store over `jar` using the configured cookie flags and lifetime.
    pub fn new(jar: CookieJar, cfg: &RememberMeConfig) -> Self {
        Self::with_flags(jar, cfg.cookie_secure, cfg.cookie_http_only, cfg.max_age())
    }

    pub fn with_flags(
        jar: CookieJar,
        secure: bool,
        http_only: bool,
        max_age: time::Duration,
    ) -> Self {
        Self {
            jar: Mutex::new(jar),
            secure,
            http_only,
            max_age,
        }
    }

    /// Current jar, including every change made through this store.
    pub fn jar(&self) -> CookieJar {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CookieJar> {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RememberMeStore for CookieRememberMeStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let jar = self.lock();
        let Some(cookie) = jar.get(name) else {
            return Ok(None);
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(cookie.value())
            .with_context(|| format!("cookie `{name}` is not valid base64"))?;
        Ok(Some(bytes))
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let cookie = Cookie::build((name.to_string(), URL_SAFE_NO_PAD.encode(bytes)))
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .http_only(self.http_only)
            .max_age(self.max_age)
            .build();

        let mut jar = self.lock();
        *jar = jar.clone().add(cookie);
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let mut jar = self.lock();
        *jar = jar.clone().remove(Cookie::build(name.to_string()).path("/"));
        Ok(())
    }
}
