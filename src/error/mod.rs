//! # Error types
//!
//! Typed errors for every failure the crate can surface to a caller.
//!
//! Collaborator ports (realms, sessions, stores) report failures as
//! [`anyhow::Error`]; the types here are what the coordination layer turns
//! them into.

pub mod authc;
pub mod crypto;
pub mod subject;

pub use authc::AuthenticationError;
pub use crypto::{CipherError, KeyError, SerializationError};
pub use subject::SubjectError;
