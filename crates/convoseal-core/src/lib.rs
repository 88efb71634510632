//! Convoseal Core
//!
//! End-to-end encryption for two-party conversations. Holds per-conversation
//! key material and turns plaintext into signed, encrypted envelopes (and
//! back). The core never performs I/O: key agreement, transport and
//! persistence belong to the caller.
//!
//! # Architecture
//!
//! ```text
//! SecureMessenger<E: Environment>
//!        │
//!        ├── Environment (randomness, wall clock)
//!        │
//!        └── ConversationKeyStore
//!                 │
//!                 ▼
//!          ConversationId → ConversationKeyMaterial
//!                           (encryption key, identity, peer, generation)
//! ```
//!
//! Sending draws a fresh nonce from the environment, seals the plaintext
//! under the conversation's current key and signs the ciphertext with the
//! local identity. Receiving checks the signature over the ciphertext first
//! (a failure only marks the message unverified), then opens the AEAD (a
//! failure rejects the message).
//!
//! # Components
//!
//! - [`SecureMessenger`]: Owned messenger; mutations take `&mut self`
//! - [`SharedMessenger`]: Cloneable, thread-safe handle to one messenger
//! - [`ConversationKeyStore`]: Per-conversation key material
//! - [`EncryptedMessage`]: JSON wire envelope
//! - [`SystemEnv`]: Production environment (OS entropy, system clock)
//!
//! # Example
//!
//! ```
//! use convoseal_core::{EncryptionKey, SecureMessenger, SystemEnv};
//!
//! # fn main() -> Result<(), convoseal_core::MessagingError> {
//! let mut alice = SecureMessenger::new(SystemEnv::new());
//! let mut bob = SecureMessenger::new(SystemEnv::new());
//!
//! let alice_id = alice.generate_identity_key_pair();
//! let bob_id = bob.generate_identity_key_pair();
//! let (alice_pk, alice_fp) = (alice_id.export_public_key(), alice_id.fingerprint().to_string());
//!
//! // Both sides obtained the same key from the key agreement.
//! let shared = [7u8; 32];
//! alice.initialize("room-42", EncryptionKey::from_bytes(shared), alice_id, None)?;
//! bob.initialize(
//!     "room-42",
//!     EncryptionKey::from_bytes(shared),
//!     bob_id,
//!     Some((alice_pk.as_str(), alice_fp.as_str())),
//! )?;
//!
//! let envelope = alice.encrypt("room-42", "hello")?;
//! let message = bob.decrypt("room-42", &envelope)?;
//! assert_eq!(message.content, "hello");
//! assert!(message.is_verified);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod conversation;
mod engine;
pub mod env;
pub mod envelope;
pub mod error;
pub mod key_store;
mod messenger;
mod shared;
mod system_env;

pub use config::{MessengerConfig, ReinitializePolicy};
pub use conversation::ConversationId;
pub use convoseal_crypto::{EncryptionKey, Fingerprint, IdentityKeyPair, PublicKey};
pub use env::Environment;
pub use envelope::{DecryptedMessage, EncryptedMessage};
pub use error::MessagingError;
pub use key_store::{ConversationKeyStore, INITIAL_GENERATION, KeyMaterialSnapshot, PeerIdentity};
pub use messenger::SecureMessenger;
pub use shared::SharedMessenger;
pub use system_env::SystemEnv;
