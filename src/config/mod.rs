//! # Configuration
//!
//! Environment-driven settings for the authentication stack.

pub mod app;
pub mod env;
pub mod remember_me;

pub use app::SecurityConfig;
pub use remember_me::RememberMeConfig;
