//! Fuzz target for envelope decoding and decryption
//!
//! Feeds attacker-controlled envelopes to a receiver that shares a
//! conversation with an honest sender.
//!
//! # Strategy
//!
//! - Arbitrary JSON text through `EncryptedMessage::from_json`
//! - Honest envelopes with ciphertext, nonce and signature mutations
//! - Truncated or extended fields and out-of-range generations
//! - Rotations on either side between messages
//!
//! # Invariants
//!
//! - Decoding and decryption never panic
//! - Unmodified envelopes decrypt to the original text, verified
//! - Any ciphertext or nonce change fails with `Decryption`
//! - A signature-only change decrypts but is never verified
//! - Failures never change the receiver's generation

#![no_main]

use arbitrary::Arbitrary;
use convoseal_core::{
    env::test_utils::MockEnv, EncryptedMessage, EncryptionKey, MessagingError, SecureMessenger,
};
use libfuzzer_sys::fuzz_target;

const ROOM: &str = "fuzz-room";

#[derive(Debug, Clone, Arbitrary)]
struct EnvelopeScenario {
    /// Shared symmetric key
    key: [u8; 32],
    /// Raw wire payload decoded before anything else
    raw_json: String,
    /// Messages and mutations
    operations: Vec<Operation>,
}

#[derive(Debug, Clone, Arbitrary)]
enum Operation {
    /// Send a message and deliver it after applying a mutation
    Deliver { text: String, mutation: Mutation },
    /// Rotate both sides to a new key
    RotateBoth { key: [u8; 32] },
    /// Rotate only the sender, desynchronizing generations
    RotateSender { key: [u8; 32] },
}

#[derive(Debug, Clone, Arbitrary)]
enum Mutation {
    None,
    FlipCiphertext { index: usize, mask: u8 },
    FlipIv { index: usize, mask: u8 },
    FlipSignature { index: usize, mask: u8 },
    TruncateCiphertext { len: usize },
    ReplaceIv(Vec<u8>),
    ReplaceSignature(Vec<u8>),
    SetGeneration(u64),
    ReencodeJson,
}

/// Expected receiver outcome after a mutation.
enum Expect {
    Verified,
    Unverified,
    Rejected,
    Unknown,
}

fn flip(bytes: &mut [u8], index: usize, mask: u8) -> bool {
    if bytes.is_empty() || mask == 0 {
        return false;
    }
    let i = index % bytes.len();
    bytes[i] ^= mask;
    true
}

fn mutate(envelope: &mut EncryptedMessage, mutation: Mutation) -> Expect {
    match mutation {
        Mutation::None => Expect::Verified,
        Mutation::FlipCiphertext { index, mask } => {
            if flip(&mut envelope.ciphertext, index, mask) {
                Expect::Rejected
            } else {
                Expect::Verified
            }
        },
        Mutation::FlipIv { index, mask } => {
            if flip(&mut envelope.iv, index, mask) {
                Expect::Rejected
            } else {
                Expect::Verified
            }
        },
        Mutation::FlipSignature { index, mask } => {
            if flip(&mut envelope.signature, index, mask) {
                Expect::Unverified
            } else {
                Expect::Verified
            }
        },
        Mutation::TruncateCiphertext { len } => {
            if len < envelope.ciphertext.len() {
                envelope.ciphertext.truncate(len);
                Expect::Rejected
            } else {
                Expect::Verified
            }
        },
        Mutation::ReplaceIv(iv) => {
            if iv == envelope.iv {
                Expect::Verified
            } else {
                envelope.iv = iv;
                Expect::Rejected
            }
        },
        Mutation::ReplaceSignature(signature) => {
            if signature == envelope.signature {
                Expect::Verified
            } else {
                envelope.signature = signature;
                Expect::Unverified
            }
        },
        Mutation::SetGeneration(generation) => {
            // The generation is metadata; it is not authenticated.
            envelope.key_generation = generation;
            Expect::Unknown
        },
        Mutation::ReencodeJson => match envelope.to_json().map(|json| EncryptedMessage::from_json(&json)) {
            Ok(Ok(decoded)) => {
                assert_eq!(&decoded, envelope, "JSON must preserve the envelope");
                Expect::Verified
            },
            _ => panic!("honest envelope must survive JSON transport"),
        },
    }
}

fuzz_target!(|scenario: EnvelopeScenario| {
    // INVARIANT 1: Decoding arbitrary text never panics
    if let Ok(envelope) = EncryptedMessage::from_json(&scenario.raw_json) {
        assert!(envelope.key_generation >= 1, "decoded generation must be at least 1");
    }

    let mut sender = SecureMessenger::new(MockEnv::with_seed(1));
    let mut receiver = SecureMessenger::new(MockEnv::with_seed(2));

    let sender_id = sender.generate_identity_key_pair();
    let receiver_id = receiver.generate_identity_key_pair();
    let public_key = sender_id.export_public_key();
    let fingerprint = sender_id.fingerprint().to_string();

    sender.initialize(ROOM, EncryptionKey::from_bytes(scenario.key), sender_id, None).unwrap();
    receiver
        .initialize(
            ROOM,
            EncryptionKey::from_bytes(scenario.key),
            receiver_id,
            Some((public_key.as_str(), fingerprint.as_str())),
        )
        .unwrap();

    // INVARIANT 2: Arbitrary decoded envelopes never panic the receiver
    if let Ok(envelope) = EncryptedMessage::from_json(&scenario.raw_json) {
        let _ = receiver.decrypt(ROOM, &envelope);
    }

    let mut in_sync = true;

    for op in scenario.operations.into_iter().take(64) {
        match op {
            Operation::RotateBoth { key } => {
                sender.rotate(ROOM, EncryptionKey::from_bytes(key)).unwrap();
                receiver.rotate(ROOM, EncryptionKey::from_bytes(key)).unwrap();
                in_sync = true;
            },
            Operation::RotateSender { key } => {
                sender.rotate(ROOM, EncryptionKey::from_bytes(key)).unwrap();
                in_sync = false;
            },
            Operation::Deliver { text, mutation } => {
                let mut envelope = sender.encrypt(ROOM, &text).unwrap();
                let expect = mutate(&mut envelope, mutation);
                let generation = receiver.generation_of(ROOM);

                let result = receiver.decrypt(ROOM, &envelope);

                // INVARIANT 3: Failures leave the conversation untouched
                assert_eq!(receiver.generation_of(ROOM), generation);

                if !in_sync {
                    // Keys differ unless the rotation picked the same bytes.
                    continue;
                }

                match (expect, result) {
                    (Expect::Verified, Ok(message)) => {
                        assert_eq!(message.content, text);
                        assert!(message.is_verified, "honest envelope must verify");
                    },
                    (Expect::Unverified, Ok(message)) => {
                        assert_eq!(message.content, text);
                        assert!(!message.is_verified, "forged signature must not verify");
                    },
                    (Expect::Rejected, Err(MessagingError::Decryption { .. })) => {},
                    (Expect::Unknown, _) => {},
                    (_, other) => panic!("unexpected outcome: {other:?}"),
                }
            },
        }
    }
});
