//! # Subjects
//!
//! The per-caller view of identity: who the caller really is, who they are
//! currently acting as, their session, and what they may do.

pub mod authz;
pub mod manager;
pub mod model;
pub mod run_as;
pub mod session;

pub use authz::{Authorizer, StaticRoleAuthorizer};
pub use manager::{SecurityManager, SubjectContext};
pub use model::{Subject, SubjectBuilder};
pub use run_as::RunAsStack;
pub use session::{MemorySession, MemorySessionFactory, Session, SessionFactory};
