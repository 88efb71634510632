//! Convoseal Cryptographic Primitives
//!
//! Cryptographic building blocks for two-party conversations. Pure functions
//! with deterministic outputs. Callers provide random bytes (nonces, secret
//! key seeds) for deterministic testing.
//!
//! # Key Material
//!
//! Each conversation combines two independent kinds of key material:
//!
//! ```text
//! Key agreement (external)          Identity (long-lived)
//!        │                                   │
//!        ▼                                   ▼
//! EncryptionKey (per generation)     IdentityKeyPair (Ed25519)
//!        │                                   │
//!        ▼                                   ▼
//! ChaCha20-Poly1305 → Ciphertext ──► Signature over ciphertext
//!                                            │
//!                                            ▼
//!                                   Fingerprint (SHA-256 of public key)
//! ```
//!
//! Rotating the encryption key never touches the identity keypair, so
//! fingerprints stay stable for out-of-band verification.
//!
//! # Security
//!
//! Confidentiality and integrity:
//! - ChaCha20-Poly1305 AEAD, 12-byte nonce, 16-byte tag
//! - Failed authentication tag -> reject message
//!
//! Sender authentication:
//! - Ed25519 signature over the ciphertext bytes
//! - Weak (small-order) public keys are rejected at import
//!
//! Key hygiene:
//! - Symmetric keys and signing keys are zeroized on drop

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod aead;
pub mod error;
pub mod fingerprint;
pub mod identity;

pub use aead::{EncryptionKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE, open, seal};
pub use error::CryptoError;
pub use fingerprint::Fingerprint;
pub use identity::{IdentityKeyPair, PUBLIC_KEY_SIZE, PublicKey, SIGNATURE_SIZE};
