//! Message encryption using `ChaCha20-Poly1305`
//!
//! All functions are pure - the nonce must be provided by the caller.
//! This enables deterministic testing with a seeded environment.

use std::fmt;

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Size of a symmetric encryption key (32 bytes)
pub const KEY_SIZE: usize = 32;

/// Size of the AEAD nonce (12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Symmetric key for conversation confidentiality.
///
/// Produced by the external key agreement and replaced on every rotation.
/// The key bytes are zeroized when the value is dropped.
#[derive(Clone)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Copy key bytes from a slice, checking the length.
    ///
    /// Entry point for key agreement output, which usually arrives as a
    /// byte buffer rather than a fixed-size array.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let Ok(bytes) = <[u8; KEY_SIZE]>::try_from(bytes) else {
            return Err(CryptoError::InvalidKeyLength { expected: KEY_SIZE, actual: bytes.len() });
        };
        Ok(Self { bytes })
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Encrypt `plaintext` under `key` and `nonce`.
///
/// Returns the ciphertext with the 16-byte Poly1305 tag appended.
///
/// # Security
///
/// - The nonce MUST never repeat under the same key
/// - Caller MUST provide cryptographically secure random bytes in production
pub fn seal(
    key: &EncryptionKey,
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    cipher.encrypt(Nonce::from_slice(nonce), plaintext).map_err(|_| CryptoError::EncryptionFailed)
}

/// Decrypt `ciphertext` (including tag) under `key` and `nonce`.
///
/// # Errors
///
/// - `InvalidNonceLength`: nonce is not [`NONCE_SIZE`] bytes
/// - `DecryptionFailed`: authentication tag, nonce or key is incorrect
pub fn open(key: &EncryptionKey, nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidNonceLength { expected: NONCE_SIZE, actual: nonce.len() });
    }

    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    cipher.decrypt(Nonce::from_slice(nonce), ciphertext).map_err(|_| {
        CryptoError::DecryptionFailed { reason: "authentication failed".to_string() }
    })
}
