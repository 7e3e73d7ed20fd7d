//! # Web integration
//!
//! Axum glue: a cookie-backed remember-me store, peer address resolution,
//! and middleware binding each request's subject.

pub mod cookie;
pub mod middleware;
pub mod peer;

pub use cookie::CookieRememberMeStore;
pub use middleware::{CurrentSubject, SubjectState, bind_subject};
