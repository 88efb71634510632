//! Ed25519 identity keys for sender authentication
//!
//! The identity keypair is long-lived per conversation: it signs every
//! outgoing ciphertext and is never replaced by key rotation. Public keys are
//! exchanged as base64 of the raw 32 bytes.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use zeroize::Zeroize;

use crate::{error::CryptoError, fingerprint::Fingerprint};

/// Size of an Ed25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of an Ed25519 secret key seed in bytes
pub const SECRET_KEY_SIZE: usize = 32;

/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Local signing identity.
///
/// Owns the private signing key. The fingerprint is computed once at
/// creation since the keypair never changes.
pub struct IdentityKeyPair {
    signing_key: SigningKey,
    public_key: PublicKey,
    fingerprint: Fingerprint,
}

impl IdentityKeyPair {
    /// Build an identity from a 32-byte secret seed.
    ///
    /// Caller MUST provide cryptographically secure random bytes in
    /// production. The seed is zeroized after use.
    pub fn from_secret_bytes(mut secret: [u8; SECRET_KEY_SIZE]) -> Self {
        let signing_key = SigningKey::from_bytes(&secret);
        secret.zeroize();

        let public_key = PublicKey(signing_key.verifying_key());
        let fingerprint = public_key.fingerprint();

        Self { signing_key, public_key, fingerprint }
    }

    /// Public verification key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Public key in exchange format (base64).
    pub fn export_public_key(&self) -> String {
        self.public_key.export()
    }

    /// Fingerprint of the public key.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Sign `message` with the private key.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKeyPair").field("fingerprint", &self.fingerprint).finish_non_exhaustive()
    }
}

/// Ed25519 public verification key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Import from raw bytes.
    ///
    /// # Errors
    ///
    /// - `KeyImport`: wrong length, not a curve point, or a weak
    ///   (small-order) key
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let Ok(raw) = <[u8; PUBLIC_KEY_SIZE]>::try_from(bytes) else {
            return Err(CryptoError::KeyImport {
                reason: format!("public key must be {PUBLIC_KEY_SIZE} bytes, got {}", bytes.len()),
            });
        };

        let key = VerifyingKey::from_bytes(&raw).map_err(|e| CryptoError::KeyImport {
            reason: format!("invalid Ed25519 public key: {e}"),
        })?;

        if key.is_weak() {
            return Err(CryptoError::KeyImport { reason: "weak Ed25519 public key".to_string() });
        }

        Ok(Self(key))
    }

    /// Import from exchange format (base64).
    pub fn import(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD.decode(encoded.trim()).map_err(|e| CryptoError::KeyImport {
            reason: format!("public key is not base64: {e}"),
        })?;
        Self::from_bytes(&bytes)
    }

    /// Export in exchange format (base64).
    pub fn export(&self) -> String {
        STANDARD.encode(self.0.as_bytes())
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        self.0.as_bytes()
    }

    /// Fingerprint of this key.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_public_key(self.as_bytes())
    }

    /// Check `signature` over `message`.
    ///
    /// Returns `false` for malformed signatures rather than an error; a
    /// failed check is informational to the caller.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        self.0.verify_strict(message, &signature).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.export())
    }
}
