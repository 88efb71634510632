//! Message encryption engine.
//!
//! Pure functions over one conversation's key material. The nonce and
//! timestamp are provided by the caller ([`crate::SecureMessenger`] draws
//! them from its environment), which keeps these functions deterministic
//! under test.
//!
//! Confidentiality and authenticity are checked separately on receive:
//!
//! - The AEAD tag check is the only step that can fail a message.
//! - The signature check only sets `is_verified`, so the caller can show
//!   an "unverified" warning instead of dropping the message.

use convoseal_crypto::{NONCE_SIZE, aead};

use crate::{
    envelope::{DecryptedMessage, EncryptedMessage},
    error::MessagingError,
    key_store::ConversationKeyMaterial,
};

/// Encrypt and sign `plaintext` under the conversation's current key.
///
/// The signature covers the ciphertext bytes (tag included) only.
pub(crate) fn seal(
    material: &ConversationKeyMaterial,
    plaintext: &[u8],
    nonce: [u8; NONCE_SIZE],
    timestamp: u64,
) -> Result<EncryptedMessage, MessagingError> {
    let ciphertext = aead::seal(material.encryption_key(), &nonce, plaintext)?;
    let signature = material.identity().sign(&ciphertext);

    Ok(EncryptedMessage {
        ciphertext,
        iv: nonce.to_vec(),
        signature: signature.to_vec(),
        timestamp,
        key_generation: material.generation(),
        sender_fingerprint: material.local_fingerprint().to_string(),
    })
}

/// Verify and decrypt an envelope under the conversation's current key.
///
/// # Errors
///
/// - `Decryption` if the AEAD check fails (wrong key, tampered ciphertext
///   or nonce, generation mismatch) or the plaintext is not UTF-8
pub(crate) fn open(
    material: &ConversationKeyMaterial,
    envelope: &EncryptedMessage,
) -> Result<DecryptedMessage, MessagingError> {
    let is_verified = material
        .peer()
        .is_some_and(|peer| peer.public_key().verify(&envelope.ciphertext, &envelope.signature));

    let plaintext = aead::open(material.encryption_key(), &envelope.iv, &envelope.ciphertext)?;

    let content = String::from_utf8(plaintext).map_err(|_| MessagingError::Decryption {
        reason: "plaintext is not valid UTF-8".to_string(),
    })?;

    Ok(DecryptedMessage {
        content,
        timestamp: envelope.timestamp,
        key_generation: envelope.key_generation,
        sender_fingerprint: envelope.sender_fingerprint.clone(),
        is_verified,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use convoseal_crypto::{EncryptionKey, IdentityKeyPair};

    use super::*;
    use crate::key_store::ConversationKeyStore;

    const NONCE: [u8; NONCE_SIZE] = [7; NONCE_SIZE];

    /// Two stores for "alice" and "bob" sharing `room` with key `[1; 32]`.
    fn pair(bind_peers: bool) -> (ConversationKeyStore, ConversationKeyStore) {
        let alice_id = IdentityKeyPair::from_secret_bytes([0xA1; 32]);
        let bob_id = IdentityKeyPair::from_secret_bytes([0xB0; 32]);
        let alice_exchange = (alice_id.export_public_key(), alice_id.fingerprint().to_string());
        let bob_exchange = (bob_id.export_public_key(), bob_id.fingerprint().to_string());

        let mut alice = ConversationKeyStore::new();
        let mut bob = ConversationKeyStore::new();
        alice.initialize("room".into(), EncryptionKey::from_bytes([1; 32]), alice_id, None, 0).unwrap();
        bob.initialize("room".into(), EncryptionKey::from_bytes([1; 32]), bob_id, None, 0).unwrap();

        if bind_peers {
            alice.bind_peer_key("room", &bob_exchange.0, &bob_exchange.1).unwrap();
            bob.bind_peer_key("room", &alice_exchange.0, &alice_exchange.1).unwrap();
        }

        (alice, bob)
    }

    #[test]
    fn seal_fills_envelope_metadata() {
        let (alice, _) = pair(false);
        let material = alice.entry("room").unwrap();

        let envelope = seal(material, b"hi", NONCE, 1234).unwrap();

        assert_eq!(envelope.iv, NONCE.to_vec());
        assert_eq!(envelope.timestamp, 1234);
        assert_eq!(envelope.key_generation, 1);
        assert_eq!(envelope.sender_fingerprint, material.local_fingerprint().to_string());
        assert_eq!(envelope.signature.len(), 64);
        assert_eq!(envelope.ciphertext.len(), 2 + convoseal_crypto::TAG_SIZE);
    }

    #[test]
    fn open_verifies_bound_peer() {
        let (alice, bob) = pair(true);
        let envelope = seal(alice.entry("room").unwrap(), b"hello", NONCE, 1).unwrap();

        let message = open(bob.entry("room").unwrap(), &envelope).unwrap();

        assert_eq!(message.content, "hello");
        assert!(message.is_verified);
    }

    #[test]
    fn open_without_peer_is_unverified() {
        let (alice, bob) = pair(false);
        let envelope = seal(alice.entry("room").unwrap(), b"hello", NONCE, 1).unwrap();

        let message = open(bob.entry("room").unwrap(), &envelope).unwrap();

        assert_eq!(message.content, "hello");
        assert!(!message.is_verified);
    }

    #[test]
    fn bad_signature_is_informational() {
        let (alice, bob) = pair(true);
        let mut envelope = seal(alice.entry("room").unwrap(), b"hello", NONCE, 1).unwrap();
        envelope.signature[0] ^= 0x01;

        let message = open(bob.entry("room").unwrap(), &envelope).unwrap();

        assert_eq!(message.content, "hello");
        assert!(!message.is_verified);
    }

    #[test]
    fn truncated_signature_is_informational() {
        let (alice, bob) = pair(true);
        let mut envelope = seal(alice.entry("room").unwrap(), b"hello", NONCE, 1).unwrap();
        envelope.signature.truncate(10);

        assert!(!open(bob.entry("room").unwrap(), &envelope).unwrap().is_verified);
    }

    #[test]
    fn tampered_ciphertext_is_fatal_for_message() {
        let (alice, bob) = pair(true);
        let mut envelope = seal(alice.entry("room").unwrap(), b"hello", NONCE, 1).unwrap();
        envelope.ciphertext[0] ^= 0x80;

        let result = open(bob.entry("room").unwrap(), &envelope);
        assert!(matches!(result, Err(MessagingError::Decryption { .. })));
    }

    #[test]
    fn wrong_length_nonce_is_decryption_error() {
        let (alice, bob) = pair(false);
        let mut envelope = seal(alice.entry("room").unwrap(), b"hello", NONCE, 1).unwrap();
        envelope.iv.pop();

        let result = open(bob.entry("room").unwrap(), &envelope);
        assert!(matches!(result, Err(MessagingError::Decryption { .. })));
    }

    #[test]
    fn non_utf8_plaintext_is_decryption_error() {
        let (alice, bob) = pair(false);
        let envelope = seal(alice.entry("room").unwrap(), &[0xFF, 0xFE], NONCE, 1).unwrap();

        let result = open(bob.entry("room").unwrap(), &envelope);
        assert!(matches!(result, Err(MessagingError::Decryption { reason }) if reason.contains("UTF-8")));
    }
}
