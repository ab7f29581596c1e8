//! Encryption-at-rest wrapper using AES-256-GCM.

use crate::error::{DeserializationError, SerializationError};
use crate::Serializer;
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Errors building an [`EncryptionKey`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Raw key material had the wrong length.
    #[error("invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize {
        /// Required length.
        expected: usize,
        /// Length supplied.
        actual: usize,
    },

    /// HKDF could not produce key material.
    #[error("key derivation failed: {0}")]
    DerivationFailed(String),
}

/// AES-256-GCM key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Generates a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidKeySize`] unless `bytes` is exactly
    /// [`KEY_SIZE`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != KEY_SIZE {
            return Err(KeyError::InvalidKeySize {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { bytes: key })
    }

    /// Derives a key from a passphrase and salt with HKDF-SHA256.
    ///
    /// HKDF does not stretch weak input. Use a high-entropy passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::DerivationFailed`] if HKDF rejects the output
    /// length.
    pub fn derive_from_password(password: &[u8], salt: &[u8]) -> Result<Self, KeyError> {
        use hkdf::Hkdf;
        use sha2::Sha256;

        let hk = Hkdf::<Sha256>::new(Some(salt), password);
        let mut bytes = [0u8; KEY_SIZE];
        hk.expand(b"happystore-value-key-v1", &mut bytes)
            .map_err(|_| KeyError::DerivationFailed("HKDF expand failed".into()))?;
        Ok(Self { bytes })
    }

    /// Returns the raw key. Don't log it.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Encrypts the output of another serializer.
///
/// Stored format: `nonce (12 bytes) || ciphertext || tag (16 bytes)`. A fresh
/// random nonce is drawn for every value, so identical values produce
/// different bytes. Tampered or truncated bytes, or bytes written under a
/// different key, fail to deserialize.
pub struct EncryptedSerializer<S> {
    inner: S,
    cipher: Aes256Gcm,
}

impl<S: Serializer> EncryptedSerializer<S> {
    /// Wraps `inner`, encrypting with `key`.
    #[must_use]
    pub fn new(inner: S, key: &EncryptionKey) -> Self {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
        Self { inner, cipher }
    }

    /// Returns the wrapped serializer.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S> std::fmt::Debug for EncryptedSerializer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedSerializer")
            .field("cipher", &"Aes256Gcm")
            .finish_non_exhaustive()
    }
}

impl<S: Serializer> Serializer for EncryptedSerializer<S> {
    type Value = S::Value;

    fn serialize(&self, value: &S::Value) -> Result<Vec<u8>, SerializationError> {
        let plaintext = self.inner.serialize(value)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|_| SerializationError::new("encryption failed"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend(ciphertext);
        Ok(out)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<S::Value, DeserializationError> {
        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(DeserializationError::new("ciphertext too short"));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| DeserializationError::new("decryption failed"))?;
        self.inner.deserialize(&plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JsonValueSerializer, RawSerializer};
    use serde_json::json;

    #[test]
    fn key_from_bytes_checks_length() {
        assert!(EncryptionKey::from_bytes(&[7u8; KEY_SIZE]).is_ok());
        assert_eq!(
            EncryptionKey::from_bytes(&[0u8; 16]).unwrap_err(),
            KeyError::InvalidKeySize {
                expected: KEY_SIZE,
                actual: 16
            }
        );
    }

    #[test]
    fn derived_keys_are_stable_per_salt() {
        let a = EncryptionKey::derive_from_password(b"correct horse", b"salt-1").unwrap();
        let b = EncryptionKey::derive_from_password(b"correct horse", b"salt-1").unwrap();
        let c = EncryptionKey::derive_from_password(b"correct horse", b"salt-2").unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
    }

    #[test]
    fn debug_redacts_key() {
        let key = EncryptionKey::from_bytes(&[0xAB; KEY_SIZE]).unwrap();
        assert!(format!("{key:?}").contains("REDACTED"));
    }

    #[test]
    fn wraps_inner_serializer() {
        let codec = EncryptedSerializer::new(JsonValueSerializer::new(), &EncryptionKey::generate());
        let value = json!({"secret": [1, 2, 3]});
        let bytes = codec.serialize(&value).unwrap();
        assert!(!bytes.windows(6).any(|w| w == b"secret"));
        assert_eq!(codec.deserialize(&bytes).unwrap(), value);
    }

    #[test]
    fn nonces_differ_per_value() {
        let codec = EncryptedSerializer::new(RawSerializer::new(), &EncryptionKey::generate());
        let a = codec.serialize(&b"same".to_vec()).unwrap();
        let b = codec.serialize(&b"same".to_vec()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_or_tampering_fails() {
        let codec = EncryptedSerializer::new(RawSerializer::new(), &EncryptionKey::generate());
        let other = EncryptedSerializer::new(RawSerializer::new(), &EncryptionKey::generate());
        let mut bytes = codec.serialize(&b"data".to_vec()).unwrap();

        assert!(other.deserialize(&bytes).is_err());
        assert!(codec.deserialize(&bytes[..NONCE_SIZE + TAG_SIZE - 1]).is_err());

        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(codec.deserialize(&bytes).is_err());
    }
}
