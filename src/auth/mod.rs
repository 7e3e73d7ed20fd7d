//! # Authentication
//!
//! Tokens, realms and the strategy-driven coordinator that combines realm
//! results into one [`IdentityRecord`].

pub mod coordinator;
pub mod identity;
pub mod listener;
pub mod principal;
pub mod realm;
pub mod strategy;
pub mod token;

pub use coordinator::{AuthenticationCoordinator, Authenticator};
pub use identity::{Agreement, IdentityRecord};
pub use principal::PrincipalSet;
pub use realm::Realm;
pub use token::{AuthenticationToken, BearerToken, UsernamePasswordToken};
