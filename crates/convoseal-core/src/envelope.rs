//! Wire envelopes for encrypted messages.
//!
//! The JSON form carries binary fields as standard padded base64 and uses
//! camelCase field names:
//!
//! ```text
//! {
//!   "ciphertext": "<base64>",
//!   "iv": "<base64, 12 bytes>",
//!   "signature": "<base64, 64 bytes>",
//!   "timestamp": 1700000000000,
//!   "keyGeneration": 1,
//!   "senderFingerprint": "6668 7AAD ..."
//! }
//! ```
//!
//! The core never touches the network: callers hand the JSON to their
//! transport and decode incoming payloads before decrypting.

use serde::{Deserialize, Serialize};

use crate::error::MessagingError;

/// One encrypted, signed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedMessage {
    /// AEAD ciphertext including the 16-byte tag
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    /// Random nonce, unique per message
    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,
    /// Sender's signature over the ciphertext bytes
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
    /// Sender wall clock, epoch milliseconds
    pub timestamp: u64,
    /// Sender's key generation at encryption time
    pub key_generation: u64,
    /// Sender's claimed identity fingerprint
    pub sender_fingerprint: String,
}

impl EncryptedMessage {
    /// Encode as JSON for transport.
    pub fn to_json(&self) -> Result<String, MessagingError> {
        serde_json::to_string(self)
            .map_err(|e| MessagingError::MalformedEnvelope { reason: e.to_string() })
    }

    /// Decode a JSON payload received from the transport.
    ///
    /// # Errors
    ///
    /// - `MalformedEnvelope` if the JSON, base64 or key generation is invalid
    pub fn from_json(input: &str) -> Result<Self, MessagingError> {
        let envelope: Self = serde_json::from_str(input)
            .map_err(|e| MessagingError::MalformedEnvelope { reason: e.to_string() })?;

        if envelope.key_generation == 0 {
            return Err(MessagingError::MalformedEnvelope {
                reason: "key generation must be at least 1".to_string(),
            });
        }

        Ok(envelope)
    }
}

/// Result of receiving a message.
///
/// `is_verified` is true only if a peer key was bound and the signature
/// checked out. An unverified message still decrypted successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptedMessage {
    /// Recovered plaintext
    pub content: String,
    /// Sender wall clock from the envelope
    pub timestamp: u64,
    /// Sender key generation from the envelope
    pub key_generation: u64,
    /// Sender fingerprint from the envelope
    pub sender_fingerprint: String,
    /// Whether the signature verified against the bound peer key
    pub is_verified: bool,
}

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(D::Error::custom)
    }
}
