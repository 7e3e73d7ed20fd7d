//! # Principal serialization
//!
//! Turns a [`PrincipalSet`] into the bytes handed to the cipher and back.
//! Empty sets are refused in both directions: there is nothing to remember.

use crate::auth::principal::PrincipalSet;
use crate::error::SerializationError;

/// Converts principal sets to bytes and back.
pub trait PrincipalSerializer: Send + Sync {
    fn serialize(&self, principals: &PrincipalSet) -> Result<Vec<u8>, SerializationError>;

    fn deserialize(&self, bytes: &[u8]) -> Result<PrincipalSet, SerializationError>;
}

/// JSON encoding of the realm-attributed principal list.
///
/// Empty sets are refused in both directions; an empty set is not an
/// identity worth remembering.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonPrincipalSerializer;

impl PrincipalSerializer for JsonPrincipalSerializer {
    fn serialize(&self, principals: &PrincipalSet) -> Result<Vec<u8>, SerializationError> {
        if principals.is_empty() {
            return Err(SerializationError::Empty);
        }
        Ok(serde_json::to_vec(principals)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<PrincipalSet, SerializationError> {
        let principals: PrincipalSet = serde_json::from_slice(bytes)?;
        if principals.is_empty() {
            return Err(SerializationError::Empty);
        }
        Ok(principals)
    }
}
