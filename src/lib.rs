//! # wzs_auth
//!
//! Authentication and subject-context core for web services.
//!
//! This crate provides:
//! - Multi-realm authentication with pluggable combination strategies (`auth`)
//! - Subjects with sessions, role checks and run-as identities (`subject`)
//! - Ambient execution context carried across threads and tasks (`context`)
//! - Encrypted remember-me persistence (`remember_me`)
//! - Environment driven configuration (`config`) and axum glue (`web`)
//!
//! ## Example usage (in another crate)
//!
//! ```rust
//! use std::sync::Arc;
//! use wzs_auth::anyhow::Result;
//! use wzs_auth::auth::{AuthenticationCoordinator, IdentityRecord, PrincipalSet, Realm};
//! use wzs_auth::auth::token::{AuthenticationToken, UsernamePasswordToken};
//! use wzs_auth::context::{self, ExecutionContextBinder};
//! use wzs_auth::subject::{SecurityManager, Subject};
//!
//! struct Demo;
//!
//! impl Realm for Demo {
//!     fn name(&self) -> &str { "demo" }
//!     fn supports(&self, _t: &dyn AuthenticationToken) -> bool { true }
//!     fn identity(&self, t: &dyn AuthenticationToken) -> Result<Option<IdentityRecord>> {
//!         Ok(Some(IdentityRecord::new(PrincipalSet::single("demo", t.principal()))))
//!     }
//! }
//!
//! let manager = SecurityManager::new(Arc::new(AuthenticationCoordinator::new(vec![
//!     Arc::new(Demo) as Arc<dyn Realm>,
//! ])));
//! let alice = manager
//!     .login(&Subject::anonymous(), &UsernamePasswordToken::new("alice", "pw"))
//!     .unwrap();
//!
//! let who = ExecutionContextBinder::capture(&alice)
//!     .run(|| context::current_subject().and_then(|s| s.primary_principal()));
//! assert_eq!(who.as_deref(), Some("alice"));
//! ```

// ===============================
// Re-exports of external crates
// ===============================

pub use anyhow;
pub use axum;
pub use axum_extra;
pub use secrecy;
pub use serde_json;
pub use tokio;
pub use tracing;

// ===============================
// Public modules
// ===============================
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod remember_me;
pub mod subject;
pub mod web;
