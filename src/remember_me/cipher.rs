//! # Cipher services
//!
//! Byte-level protection for remembered identities.
//!
//! - [`AesGcmCipherService`]: AES-256-GCM. Output is `nonce (12 bytes) || ciphertext+tag`.
//! - [`HmacSealCipher`]: HMAC-SHA256 integrity seal. Output is
//!   `payload || tag (32 bytes)`. The payload stays readable; only tampering
//!   is detected.
//!
//! Both take the key on every call so the pipeline can hold separate
//! encryption and decryption keys.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::CipherError;

/// Symmetric protection of serialized principals.
pub trait CipherService: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, CipherError>;

    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, CipherError>;
}

pub const AES_KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// AES-256-GCM with a fresh random nonce per message.
///
/// # Example
/// ```rust
/// use wzs_auth::remember_me::cipher::{AesGcmCipherService, CipherService};
///
/// let key = AesGcmCipherService::generate_key();
/// let sealed = AesGcmCipherService.encrypt(b"alice", &key).unwrap();
/// assert_eq!(AesGcmCipherService.decrypt(&sealed, &key).unwrap(), b"alice");
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct AesGcmCipherService;

impl AesGcmCipherService {
    pub fn generate_key() -> Vec<u8> {
        rand::random::<[u8; AES_KEY_LEN]>().to_vec()
    }

    fn cipher(key: &[u8]) -> Result<Aes256Gcm, CipherError> {
        if key.is_empty() {
            return Err(CipherError::MissingKey("cipher"));
        }
        Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength {
            expected: AES_KEY_LEN,
            actual: key.len(),
        })
    }
}

impl CipherService for AesGcmCipherService {
    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, CipherError> {
        let cipher = Self::cipher(key)?;

        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| CipherError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, CipherError> {
        let cipher = Self::cipher(key)?;
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::Truncated);
        }

        let (nonce, body) = ciphertext.split_at(NONCE_LEN);
        cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| CipherError::Decrypt)
    }
}

type HmacSha256 = Hmac<Sha256>;
const MAC_LEN: usize = 32;

/// Appends an HMAC-SHA256 tag and checks it in constant time.
#[derive(Clone, Copy, Debug, Default)]
pub struct HmacSealCipher;

impl HmacSealCipher {
    fn mac(key: &[u8], payload: &[u8]) -> Result<HmacSha256, CipherError> {
        if key.is_empty() {
            return Err(CipherError::MissingKey("seal"));
        }
        let mut mac = <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| {
            CipherError::InvalidKeyLength {
                expected: MAC_LEN,
                actual: key.len(),
            }
        })?;
        mac.update(payload);
        Ok(mac)
    }
}

impl CipherService for HmacSealCipher {
    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, CipherError> {
        let tag = Self::mac(key, plaintext)?.finalize().into_bytes();

        let mut out = Vec::with_capacity(plaintext.len() + MAC_LEN);
        out.extend_from_slice(plaintext);
        out.extend_from_slice(&tag);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, CipherError> {
        if ciphertext.len() < MAC_LEN {
            return Err(CipherError::Truncated);
        }

        let (payload, tag) = ciphertext.split_at(ciphertext.len() - MAC_LEN);
        let expected = Self::mac(key, payload)?.finalize().into_bytes();

        if (&expected[..]).ct_eq(tag).unwrap_u8() == 1 {
            Ok(payload.to_vec())
        } else {
            Err(CipherError::Decrypt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes_round_trip_uses_fresh_nonces() {
        let key = AesGcmCipherService::generate_key();
        let a = AesGcmCipherService.encrypt(b"payload", &key).unwrap();
        let b = AesGcmCipherService.encrypt(b"payload", &key).unwrap();

        assert_ne!(a, b);
        assert_eq!(a.len(), NONCE_LEN + b"payload".len() + TAG_LEN);
        assert_eq!(AesGcmCipherService.decrypt(&a, &key).unwrap(), b"payload");
    }

    #[test]
    fn aes_rejects_wrong_key_and_tampering() {
        let key = AesGcmCipherService::generate_key();
        let mut sealed = AesGcmCipherService.encrypt(b"payload", &key).unwrap();

        let other = AesGcmCipherService::generate_key();
        assert!(matches!(
            AesGcmCipherService.decrypt(&sealed, &other),
            Err(CipherError::Decrypt)
        ));

        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(
            AesGcmCipherService.decrypt(&sealed, &key),
            Err(CipherError::Decrypt)
        ));
    }

    #[test]
    fn aes_validates_key_and_length() {
        assert!(matches!(
            AesGcmCipherService.encrypt(b"x", &[1u8; 7]),
            Err(CipherError::InvalidKeyLength { expected: 32, actual: 7 })
        ));
        assert!(matches!(
            AesGcmCipherService.encrypt(b"x", &[]),
            Err(CipherError::MissingKey(_))
        ));
        assert!(matches!(
            AesGcmCipherService.decrypt(&[0u8; 5], &AesGcmCipherService::generate_key()),
            Err(CipherError::Truncated)
        ));
    }

    #[test]
    fn seal_detects_tampering() {
        let key = b"seal-key";
        let mut sealed = HmacSealCipher.encrypt(b"alice", key).unwrap();
        assert_eq!(&sealed[..5], b"alice");
        assert_eq!(HmacSealCipher.decrypt(&sealed, key).unwrap(), b"alice");

        sealed[0] = b'b';
        assert!(matches!(
            HmacSealCipher.decrypt(&sealed, key),
            Err(CipherError::Decrypt)
        ));
        assert!(matches!(
            HmacSealCipher.decrypt(b"short", key),
            Err(CipherError::Truncated)
        ));
    }
}
