//! # Remember-me
//!
//! Persisting an identity across sessions: serialization, encryption and
//! storage of principal sets, plus the login/logout lifecycle hooks.

pub mod cipher;
pub mod pipeline;
pub mod serializer;
pub mod store;

pub use cipher::{AesGcmCipherService, CipherService, HmacSealCipher};
pub use pipeline::RememberMePipeline;
pub use serializer::{JsonPrincipalSerializer, PrincipalSerializer};
pub use store::{MemoryRememberMeStore, RememberMeStore};
