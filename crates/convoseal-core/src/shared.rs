//! Thread-safe messenger handle.
//!
//! Wraps a [`SecureMessenger`] in an `RwLock`. Encrypt and decrypt share the
//! read lock and run concurrently; initialize, bind, rotate and remove take
//! the write lock. A rotation therefore waits for in-flight messages to
//! finish, and no message is ever sealed with a key mid-rotation.
//!
//! Lock poisoning is recovered: every write leaves the store consistent
//! before it can panic, so the inner state stays valid.

use std::{
    collections::BTreeSet,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use convoseal_crypto::{EncryptionKey, IdentityKeyPair};

use crate::{
    config::MessengerConfig,
    conversation::ConversationId,
    env::Environment,
    envelope::{DecryptedMessage, EncryptedMessage},
    error::MessagingError,
    key_store::KeyMaterialSnapshot,
    messenger::SecureMessenger,
};

/// Cloneable handle to one shared messenger.
///
/// Clones refer to the same store. Separate `SharedMessenger::new` calls
/// create independent stores that share no key material.
pub struct SharedMessenger<E: Environment> {
    inner: Arc<RwLock<SecureMessenger<E>>>,
}

impl<E: Environment> Clone for SharedMessenger<E> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<E: Environment> SharedMessenger<E> {
    /// Create a shared messenger with the default configuration.
    pub fn new(env: E) -> Self {
        Self::from_messenger(SecureMessenger::new(env))
    }

    /// Create a shared messenger with an explicit configuration.
    pub fn with_config(env: E, config: MessengerConfig) -> Self {
        Self::from_messenger(SecureMessenger::with_config(env, config))
    }

    /// Share an existing messenger.
    pub fn from_messenger(messenger: SecureMessenger<E>) -> Self {
        Self { inner: Arc::new(RwLock::new(messenger)) }
    }

    /// See [`SecureMessenger::generate_identity_key_pair`].
    pub fn generate_identity_key_pair(&self) -> IdentityKeyPair {
        self.read().generate_identity_key_pair()
    }

    /// See [`SecureMessenger::generate_encryption_key`].
    pub fn generate_encryption_key(&self) -> EncryptionKey {
        self.read().generate_encryption_key()
    }

    /// See [`SecureMessenger::initialize`].
    pub fn initialize(
        &self,
        conversation_id: impl Into<ConversationId>,
        encryption_key: EncryptionKey,
        identity: IdentityKeyPair,
        peer: Option<(&str, &str)>,
    ) -> Result<(), MessagingError> {
        self.write().initialize(conversation_id, encryption_key, identity, peer)
    }

    /// See [`SecureMessenger::bind_peer_key`].
    pub fn bind_peer_key(
        &self,
        conversation_id: &str,
        public_key: &str,
        fingerprint: &str,
    ) -> Result<(), MessagingError> {
        self.write().bind_peer_key(conversation_id, public_key, fingerprint)
    }

    /// See [`SecureMessenger::rotate`].
    pub fn rotate(
        &self,
        conversation_id: &str,
        encryption_key: EncryptionKey,
    ) -> Result<u64, MessagingError> {
        self.write().rotate(conversation_id, encryption_key)
    }

    /// See [`SecureMessenger::encrypt`].
    pub fn encrypt(
        &self,
        conversation_id: &str,
        plaintext: &str,
    ) -> Result<EncryptedMessage, MessagingError> {
        self.read().encrypt(conversation_id, plaintext)
    }

    /// See [`SecureMessenger::decrypt`].
    pub fn decrypt(
        &self,
        conversation_id: &str,
        envelope: &EncryptedMessage,
    ) -> Result<DecryptedMessage, MessagingError> {
        self.read().decrypt(conversation_id, envelope)
    }

    /// See [`SecureMessenger::is_initialized`].
    pub fn is_initialized(&self, conversation_id: &str) -> bool {
        self.read().is_initialized(conversation_id)
    }

    /// See [`SecureMessenger::generation_of`].
    pub fn generation_of(&self, conversation_id: &str) -> Option<u64> {
        self.read().generation_of(conversation_id)
    }

    /// See [`SecureMessenger::active_conversation_ids`].
    pub fn active_conversation_ids(&self) -> BTreeSet<ConversationId> {
        self.read().active_conversation_ids()
    }

    /// See [`SecureMessenger::snapshot`].
    pub fn snapshot(&self, conversation_id: &str) -> Option<KeyMaterialSnapshot> {
        self.read().snapshot(conversation_id)
    }

    /// See [`SecureMessenger::remove`].
    pub fn remove(&self, conversation_id: &str) -> bool {
        self.write().remove(conversation_id)
    }

    /// See [`SecureMessenger::clear`].
    pub fn clear(&self) -> usize {
        self.write().clear()
    }

    fn read(&self) -> RwLockReadGuard<'_, SecureMessenger<E>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SecureMessenger<E>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
