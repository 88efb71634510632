//! Key material store for managing per-conversation keys.
//!
//! Each conversation owns a symmetric encryption key, a local identity
//! keypair, an optional peer verification key and a generation counter. The
//! encryption key is rotated by the external key agreement; the identity
//! keypair lives as long as the entry.

use std::collections::{BTreeSet, HashMap};

use convoseal_crypto::{EncryptionKey, Fingerprint, IdentityKeyPair, PublicKey};

use crate::{
    config::ReinitializePolicy, conversation::ConversationId, error::MessagingError,
};

/// Generation assigned by `initialize`.
pub const INITIAL_GENERATION: u64 = 1;

/// Peer verification key bound to a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerIdentity {
    public_key: PublicKey,
    fingerprint: Fingerprint,
}

impl PeerIdentity {
    /// Import a peer key from exchange format.
    ///
    /// # Errors
    ///
    /// - `KeyImport` if the key or fingerprint is malformed, or if the
    ///   fingerprint does not describe the key
    pub fn import(public_key: &str, fingerprint: &str) -> Result<Self, MessagingError> {
        let public_key = PublicKey::import(public_key)?;
        let fingerprint = Fingerprint::parse(fingerprint)?;

        if public_key.fingerprint() != fingerprint {
            return Err(MessagingError::KeyImport {
                reason: format!("fingerprint {fingerprint} does not match the supplied public key"),
            });
        }

        Ok(Self { public_key, fingerprint })
    }

    /// Peer verification key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Peer fingerprint.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

/// Key material for a single conversation.
///
/// Never leaves the crate; callers read public state through
/// [`KeyMaterialSnapshot`].
pub(crate) struct ConversationKeyMaterial {
    encryption_key: EncryptionKey,
    identity: IdentityKeyPair,
    peer: Option<PeerIdentity>,
    generation: u64,
    created_at: u64,
}

impl ConversationKeyMaterial {
    pub(crate) fn encryption_key(&self) -> &EncryptionKey {
        &self.encryption_key
    }

    pub(crate) fn identity(&self) -> &IdentityKeyPair {
        &self.identity
    }

    pub(crate) fn peer(&self) -> Option<&PeerIdentity> {
        self.peer.as_ref()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn local_fingerprint(&self) -> &Fingerprint {
        self.identity.fingerprint()
    }

    pub(crate) fn peer_fingerprint(&self) -> Option<&Fingerprint> {
        self.peer.as_ref().map(PeerIdentity::fingerprint)
    }
}

/// Read-only copy of a conversation's public key state.
///
/// Contains no secret material and is safe to log or display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterialSnapshot {
    /// Conversation this snapshot describes
    pub conversation_id: ConversationId,
    /// Key generation at snapshot time
    pub generation: u64,
    /// Local public key (base64)
    pub local_public_key: String,
    /// Local fingerprint
    pub local_fingerprint: Fingerprint,
    /// Peer public key (base64), if bound
    pub peer_public_key: Option<String>,
    /// Peer fingerprint, if bound
    pub peer_fingerprint: Option<Fingerprint>,
    /// Wall-clock milliseconds of initialization or last rotation
    pub created_at: u64,
}

/// Manages key material for all active conversations.
///
/// # Invariants
///
/// - One entry per conversation id; entries never share key material
/// - Generation starts at 1 and only increases, by exactly 1 per rotation
/// - Rotation never touches the identity keypair or peer key
/// - Failed operations leave the entry unchanged
#[derive(Default)]
pub struct ConversationKeyStore {
    /// Behavior when initializing an existing conversation.
    policy: ReinitializePolicy,

    /// Key material per conversation.
    entries: HashMap<ConversationId, ConversationKeyMaterial>,
}

impl ConversationKeyStore {
    /// Empty store with the default re-initialize policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store with an explicit re-initialize policy.
    pub fn with_policy(policy: ReinitializePolicy) -> Self {
        Self { policy, entries: HashMap::new() }
    }

    /// Create (or replace) the entry for `conversation_id` at generation 1.
    ///
    /// If `peer` is given as `(public_key, fingerprint)`, it is imported and
    /// bound immediately. The key and fingerprint travel together: a peer key
    /// is never bound without its fingerprint, and the fingerprint is always
    /// checked against the key.
    ///
    /// # Errors
    ///
    /// - `KeyImport` if the peer key or fingerprint is malformed, or the
    ///   fingerprint does not describe the key
    /// - `AlreadyInitialized` if the policy is `RejectIfPeerBound` and the
    ///   existing entry has a peer
    pub fn initialize(
        &mut self,
        conversation_id: ConversationId,
        encryption_key: EncryptionKey,
        identity: IdentityKeyPair,
        peer: Option<(&str, &str)>,
        now_millis: u64,
    ) -> Result<(), MessagingError> {
        let peer = peer
            .map(|(public_key, fingerprint)| PeerIdentity::import(public_key, fingerprint))
            .transpose()?;

        if let Some(existing) = self.entries.get(&conversation_id) {
            if let Some(bound) = existing.peer_fingerprint() {
                if self.policy == ReinitializePolicy::RejectIfPeerBound {
                    return Err(MessagingError::AlreadyInitialized { conversation_id });
                }

                tracing::warn!(
                    conversation_id = %conversation_id,
                    previous_peer = %bound,
                    generation = existing.generation,
                    "re-initializing conversation discards bound peer key"
                );
            } else {
                tracing::debug!(conversation_id = %conversation_id, "re-initializing conversation");
            }
        }

        tracing::debug!(
            conversation_id = %conversation_id,
            local_fingerprint = %identity.fingerprint(),
            peer_bound = peer.is_some(),
            "initialized conversation"
        );

        self.entries.insert(
            conversation_id,
            ConversationKeyMaterial {
                encryption_key,
                identity,
                peer,
                generation: INITIAL_GENERATION,
                created_at: now_millis,
            },
        );

        Ok(())
    }

    /// Import and bind the peer's verification key.
    ///
    /// Replaces any previously bound peer key.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` if the conversation is unknown
    /// - `KeyImport` if the key or fingerprint is malformed or inconsistent
    pub fn bind_peer_key(
        &mut self,
        conversation_id: &str,
        public_key: &str,
        fingerprint: &str,
    ) -> Result<(), MessagingError> {
        let entry = self.entry_mut(conversation_id)?;
        let peer = PeerIdentity::import(public_key, fingerprint)?;

        match entry.peer_fingerprint() {
            Some(previous) if previous != peer.fingerprint() => {
                tracing::warn!(
                    conversation_id,
                    previous_peer = %previous,
                    new_peer = %peer.fingerprint(),
                    "peer key replaced with a different fingerprint"
                );
            },
            _ => {
                tracing::debug!(conversation_id, peer = %peer.fingerprint(), "bound peer key");
            },
        }

        entry.peer = Some(peer);
        Ok(())
    }

    /// Replace the encryption key and advance the generation by one.
    ///
    /// Returns the new generation.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` if the conversation is unknown
    /// - `GenerationOverflow` if the counter is exhausted
    pub fn rotate(
        &mut self,
        conversation_id: &str,
        encryption_key: EncryptionKey,
        now_millis: u64,
    ) -> Result<u64, MessagingError> {
        let entry = self.entry_mut(conversation_id)?;

        let Some(next) = entry.generation.checked_add(1) else {
            return Err(MessagingError::GenerationOverflow {
                conversation_id: conversation_id.into(),
            });
        };

        entry.encryption_key = encryption_key;
        entry.generation = next;
        entry.created_at = now_millis;

        tracing::debug!(conversation_id, generation = next, "rotated encryption key");

        Ok(next)
    }

    /// Check if a conversation has key material.
    pub fn is_initialized(&self, conversation_id: &str) -> bool {
        self.entries.contains_key(conversation_id)
    }

    /// Current generation for a conversation. `None` if not initialized.
    pub fn generation_of(&self, conversation_id: &str) -> Option<u64> {
        self.entries.get(conversation_id).map(ConversationKeyMaterial::generation)
    }

    /// Ids of all initialized conversations.
    pub fn active_conversation_ids(&self) -> BTreeSet<ConversationId> {
        self.entries.keys().cloned().collect()
    }

    /// Public view of a conversation's key state. `None` if not initialized.
    pub fn snapshot(&self, conversation_id: &str) -> Option<KeyMaterialSnapshot> {
        let (id, entry) = self.entries.get_key_value(conversation_id)?;

        Some(KeyMaterialSnapshot {
            conversation_id: id.clone(),
            generation: entry.generation,
            local_public_key: entry.identity.export_public_key(),
            local_fingerprint: entry.local_fingerprint().clone(),
            peer_public_key: entry.peer.as_ref().map(|peer| peer.public_key.export()),
            peer_fingerprint: entry.peer_fingerprint().cloned(),
            created_at: entry.created_at,
        })
    }

    /// Drop a conversation's key material. Returns whether it existed.
    pub fn remove(&mut self, conversation_id: &str) -> bool {
        let removed = self.entries.remove(conversation_id).is_some();
        if removed {
            tracing::debug!(conversation_id, "removed conversation");
        }
        removed
    }

    /// Drop all key material. Returns the number of conversations removed.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        tracing::debug!(count, "cleared all conversations");
        count
    }

    /// Number of initialized conversations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no conversations.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entry(
        &self,
        conversation_id: &str,
    ) -> Result<&ConversationKeyMaterial, MessagingError> {
        self.entries
            .get(conversation_id)
            .ok_or_else(|| MessagingError::NotInitialized { conversation_id: conversation_id.into() })
    }

    fn entry_mut(
        &mut self,
        conversation_id: &str,
    ) -> Result<&mut ConversationKeyMaterial, MessagingError> {
        self.entries
            .get_mut(conversation_id)
            .ok_or_else(|| MessagingError::NotInitialized { conversation_id: conversation_id.into() })
    }
}
