//! Messenger facade.
//!
//! The `SecureMessenger` owns the environment and the key store, and is the
//! public entry point for every conversation operation. Mutating operations
//! take `&mut self`, so a rotation can never interleave with an encryption on
//! the same instance. For shared access across threads use
//! [`crate::SharedMessenger`].

use std::collections::BTreeSet;

use convoseal_crypto::{EncryptionKey, IdentityKeyPair};

use crate::{
    config::MessengerConfig,
    conversation::ConversationId,
    engine,
    env::Environment,
    envelope::{DecryptedMessage, EncryptedMessage},
    error::MessagingError,
    key_store::{ConversationKeyStore, KeyMaterialSnapshot},
};

/// End-to-end encryption for a set of two-party conversations.
pub struct SecureMessenger<E: Environment> {
    /// Environment for randomness and wall-clock time.
    env: E,

    /// Key material for all active conversations.
    store: ConversationKeyStore,
}

impl<E: Environment> SecureMessenger<E> {
    /// Create a messenger with the default configuration.
    pub fn new(env: E) -> Self {
        Self::with_config(env, MessengerConfig::default())
    }

    /// Create a messenger with an explicit configuration.
    pub fn with_config(env: E, config: MessengerConfig) -> Self {
        Self { env, store: ConversationKeyStore::with_policy(config.reinitialize) }
    }

    /// Generate a fresh Ed25519 identity from the environment's RNG.
    ///
    /// The public half is exported with
    /// [`IdentityKeyPair::export_public_key`] and
    /// [`IdentityKeyPair::fingerprint`] for the peer.
    pub fn generate_identity_key_pair(&self) -> IdentityKeyPair {
        IdentityKeyPair::from_secret_bytes(self.env.random_array())
    }

    /// Generate a random symmetric key.
    ///
    /// Real conversations receive their keys from the external key
    /// agreement; this is for simulations and tests.
    pub fn generate_encryption_key(&self) -> EncryptionKey {
        EncryptionKey::from_bytes(self.env.random_array())
    }

    /// Create (or replace) a conversation at generation 1.
    ///
    /// `peer` is the peer's `(public_key, fingerprint)` in exchange format,
    /// if already known. Both halves are required together; the fingerprint
    /// must match the key.
    pub fn initialize(
        &mut self,
        conversation_id: impl Into<ConversationId>,
        encryption_key: EncryptionKey,
        identity: IdentityKeyPair,
        peer: Option<(&str, &str)>,
    ) -> Result<(), MessagingError> {
        let now = self.env.wall_clock_millis();
        self.store.initialize(conversation_id.into(), encryption_key, identity, peer, now)
    }

    /// Bind the peer's verification key to an existing conversation.
    pub fn bind_peer_key(
        &mut self,
        conversation_id: &str,
        public_key: &str,
        fingerprint: &str,
    ) -> Result<(), MessagingError> {
        self.store.bind_peer_key(conversation_id, public_key, fingerprint)
    }

    /// Replace the encryption key. Returns the new generation.
    pub fn rotate(
        &mut self,
        conversation_id: &str,
        encryption_key: EncryptionKey,
    ) -> Result<u64, MessagingError> {
        let now = self.env.wall_clock_millis();
        self.store.rotate(conversation_id, encryption_key, now)
    }

    /// Encrypt and sign a text message.
    ///
    /// A bound peer key is not required to send.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` if the conversation is unknown
    /// - `Encryption` if the AEAD primitive fails
    pub fn encrypt(
        &self,
        conversation_id: &str,
        plaintext: &str,
    ) -> Result<EncryptedMessage, MessagingError> {
        let material = self.store.entry(conversation_id)?;

        let nonce = self.env.random_array();
        let timestamp = self.env.wall_clock_millis();

        let envelope = engine::seal(material, plaintext.as_bytes(), nonce, timestamp)?;

        tracing::debug!(
            conversation_id,
            generation = envelope.key_generation,
            len = plaintext.len(),
            "encrypted message"
        );

        Ok(envelope)
    }

    /// Verify and decrypt a received envelope.
    ///
    /// A `Decryption` error concerns only this envelope; the conversation
    /// is left untouched and later messages can still be read.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` if the conversation is unknown
    /// - `Decryption` if the AEAD check fails
    pub fn decrypt(
        &self,
        conversation_id: &str,
        envelope: &EncryptedMessage,
    ) -> Result<DecryptedMessage, MessagingError> {
        let material = self.store.entry(conversation_id)?;

        let message = engine::open(material, envelope).inspect_err(|e| {
            tracing::warn!(
                conversation_id,
                local_generation = material.generation(),
                envelope_generation = envelope.key_generation,
                error = %e,
                "message could not be decrypted"
            );
        })?;

        if material.peer().is_some() && !message.is_verified {
            tracing::warn!(
                conversation_id,
                sender = %envelope.sender_fingerprint,
                "signature verification failed"
            );
        } else {
            tracing::debug!(
                conversation_id,
                generation = envelope.key_generation,
                verified = message.is_verified,
                "decrypted message"
            );
        }

        Ok(message)
    }

    /// Check if a conversation is initialized.
    pub fn is_initialized(&self, conversation_id: &str) -> bool {
        self.store.is_initialized(conversation_id)
    }

    /// Current key generation. `None` if not initialized.
    pub fn generation_of(&self, conversation_id: &str) -> Option<u64> {
        self.store.generation_of(conversation_id)
    }

    /// Ids of all initialized conversations.
    pub fn active_conversation_ids(&self) -> BTreeSet<ConversationId> {
        self.store.active_conversation_ids()
    }

    /// Public view of a conversation's key state.
    pub fn snapshot(&self, conversation_id: &str) -> Option<KeyMaterialSnapshot> {
        self.store.snapshot(conversation_id)
    }

    /// Drop one conversation's key material.
    pub fn remove(&mut self, conversation_id: &str) -> bool {
        self.store.remove(conversation_id)
    }

    /// Drop all key material (logout / teardown).
    pub fn clear(&mut self) -> usize {
        self.store.clear()
    }

    /// Underlying key store.
    pub fn store(&self) -> &ConversationKeyStore {
        &self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{config::ReinitializePolicy, env::test_utils::MockEnv};

    fn messenger(seed: u64) -> SecureMessenger<MockEnv> {
        SecureMessenger::new(MockEnv::with_seed(seed))
    }

    #[test]
    fn create_messenger() {
        let messenger = messenger(1);

        assert!(messenger.active_conversation_ids().is_empty());
        assert!(messenger.store().is_empty());
    }

    #[test]
    fn initialize_records_wall_clock() {
        let env = MockEnv::with_seed(1);
        let mut messenger = SecureMessenger::new(env.clone());
        let identity = messenger.generate_identity_key_pair();
        let key = messenger.generate_encryption_key();

        env.set_millis(5_000);
        messenger.initialize("room", key, identity, None).unwrap();
        assert_eq!(messenger.snapshot("room").unwrap().created_at, 5_000);

        env.set_millis(9_000);
        messenger.rotate("room", EncryptionKey::from_bytes([2; 32])).unwrap();
        assert_eq!(messenger.snapshot("room").unwrap().created_at, 9_000);
    }

    #[test]
    fn encrypt_uses_clock_and_fresh_nonces() {
        let env = MockEnv::with_seed(1);
        let mut messenger = SecureMessenger::new(env.clone());
        let identity = messenger.generate_identity_key_pair();
        messenger.initialize("room", EncryptionKey::from_bytes([1; 32]), identity, None).unwrap();

        env.set_millis(42);
        let first = messenger.encrypt("room", "same").unwrap();
        let second = messenger.encrypt("room", "same").unwrap();

        assert_eq!(first.timestamp, 42);
        assert_ne!(first.iv, second.iv);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn encrypt_unknown_conversation_fails() {
        let messenger = messenger(1);

        let result = messenger.encrypt("missing", "hello");
        assert!(matches!(result, Err(MessagingError::NotInitialized { .. })));
    }

    #[test]
    fn decrypt_unknown_conversation_fails() {
        let mut sender = messenger(1);
        let identity = sender.generate_identity_key_pair();
        sender.initialize("room", EncryptionKey::from_bytes([1; 32]), identity, None).unwrap();
        let envelope = sender.encrypt("room", "hello").unwrap();

        let result = messenger(2).decrypt("room", &envelope);
        assert!(matches!(result, Err(MessagingError::NotInitialized { .. })));
    }

    #[test]
    fn failed_decrypt_leaves_conversation_usable() {
        let mut alice = messenger(1);
        let mut bob = messenger(2);
        let alice_id = alice.generate_identity_key_pair();
        let bob_id = bob.generate_identity_key_pair();
        alice.initialize("room", EncryptionKey::from_bytes([3; 32]), alice_id, None).unwrap();
        bob.initialize("room", EncryptionKey::from_bytes([3; 32]), bob_id, None).unwrap();

        let mut garbled = alice.encrypt("room", "garbled").unwrap();
        garbled.ciphertext[0] ^= 1;
        assert!(bob.decrypt("room", &garbled).unwrap_err().is_per_message());

        let good = alice.encrypt("room", "fine").unwrap();
        assert_eq!(bob.decrypt("room", &good).unwrap().content, "fine");
        assert_eq!(bob.generation_of("room"), Some(1));
    }

    #[test]
    fn generated_identities_are_distinct() {
        let messenger = messenger(1);

        let a = messenger.generate_identity_key_pair();
        let b = messenger.generate_identity_key_pair();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn strict_config_is_applied() {
        let config = MessengerConfig::strict();
        assert_eq!(config.reinitialize, ReinitializePolicy::RejectIfPeerBound);

        let mut alice = SecureMessenger::with_config(MockEnv::with_seed(1), config);
        let peer = alice.generate_identity_key_pair();
        let pk = peer.export_public_key();
        let fp = peer.fingerprint().to_string();

        let identity = alice.generate_identity_key_pair();
        alice
            .initialize("room", EncryptionKey::from_bytes([1; 32]), identity, Some((pk.as_str(), fp.as_str())))
            .unwrap();

        let identity = alice.generate_identity_key_pair();
        let result = alice.initialize("room", EncryptionKey::from_bytes([2; 32]), identity, None);
        assert!(matches!(result, Err(MessagingError::AlreadyInitialized { .. })));
    }
}
