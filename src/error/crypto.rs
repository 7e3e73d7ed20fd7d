use thiserror::Error;

/// Failure converting a principal set to or from bytes.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("malformed principal data")]
    Malformed(#[from] serde_json::Error),

    /// Bytes decoded fine but describe no identity.
    #[error("serialized principal set is empty")]
    Empty,
}

/// Failure of a [`CipherService`](crate::remember_me::cipher::CipherService).
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("no {0} key is configured")]
    MissingKey(&'static str),

    #[error("cipher key must be {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("ciphertext is too short to be valid")]
    Truncated,

    #[error("encryption failed")]
    Encrypt,

    /// Wrong key, tampered bytes, or data from another cipher.
    #[error("decryption failed; the data was tampered with or the key has changed")]
    Decrypt,
}

/// Invalid textual key material handed to a key setter.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid hex key")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid base64 key")]
    Base64(#[from] base64::DecodeError),
}
