//! # Ambient execution context
//!
//! Implicit "who is calling" state, available without passing a subject
//! through every function, and the binder that moves it between threads and
//! tasks.

pub mod ambient;
pub mod binder;

pub use ambient::{
    AmbientContext, current_subject, peer_address, security_manager, session_id, snapshot,
};
pub use binder::{BindGuard, ExecutionContextBinder};
