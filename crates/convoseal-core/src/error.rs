//! Error types for conversation messaging.
//!
//! Errors fall in two groups. Conversation-level errors (`NotInitialized`,
//! `KeyImport`, `Encryption`, ...) propagate to the caller, which decides
//! policy (refuse to send, prompt for a new handshake). Per-message errors
//! (`Decryption`, `MalformedEnvelope`) concern a single envelope and leave
//! the conversation untouched.
//!
//! A failed signature check is not an error: it is reported as
//! `is_verified = false` on a successful decryption.

use convoseal_crypto::CryptoError;
use thiserror::Error;

use crate::conversation::ConversationId;

/// Errors from key store and message operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagingError {
    /// Operation referenced a conversation that was never initialized (or
    /// was removed)
    #[error("conversation not initialized: {conversation_id}")]
    NotInitialized {
        /// The unknown conversation
        conversation_id: ConversationId,
    },

    /// Re-initialization rejected because peer material is already bound
    #[error("conversation already initialized with a bound peer: {conversation_id}")]
    AlreadyInitialized {
        /// The existing conversation
        conversation_id: ConversationId,
    },

    /// Malformed or inconsistent public key material
    #[error("key import failed: {reason}")]
    KeyImport {
        /// Reason the key was rejected
        reason: String,
    },

    /// Underlying primitive failed while sending
    #[error("encryption failed: {reason}")]
    Encryption {
        /// Reason for encryption failure
        reason: String,
    },

    /// AEAD authentication failed (wrong key, tampering, or key generation
    /// mismatch)
    #[error("decryption failed: {reason}")]
    Decryption {
        /// Reason for decryption failure
        reason: String,
    },

    /// Rotation would overflow the generation counter
    #[error("key generation overflow for conversation {conversation_id}")]
    GenerationOverflow {
        /// The conversation whose counter is exhausted
        conversation_id: ConversationId,
    },

    /// Envelope could not be encoded or decoded
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope {
        /// Reason the envelope was rejected
        reason: String,
    },
}

impl MessagingError {
    /// Returns true if this error concerns a single message only.
    ///
    /// Per-message errors must be caught by the caller and surfaced as
    /// "message could not be read"; the conversation stays usable.
    pub fn is_per_message(&self) -> bool {
        match self {
            Self::Decryption { .. } | Self::MalformedEnvelope { .. } => true,

            Self::NotInitialized { .. }
            | Self::AlreadyInitialized { .. }
            | Self::KeyImport { .. }
            | Self::Encryption { .. }
            | Self::GenerationOverflow { .. } => false,
        }
    }
}

impl From<CryptoError> for MessagingError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::KeyImport { reason } => Self::KeyImport { reason },
            CryptoError::InvalidKeyLength { .. } => Self::KeyImport { reason: err.to_string() },
            CryptoError::EncryptionFailed => Self::Encryption { reason: err.to_string() },
            CryptoError::DecryptionFailed { reason } => Self::Decryption { reason },
            CryptoError::InvalidNonceLength { .. } => Self::Decryption { reason: err.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decryption_is_per_message() {
        let err = MessagingError::Decryption { reason: "tag mismatch".to_string() };
        assert!(err.is_per_message());

        let err = MessagingError::MalformedEnvelope { reason: "bad json".to_string() };
        assert!(err.is_per_message());
    }

    #[test]
    fn conversation_errors_propagate() {
        let err = MessagingError::NotInitialized { conversation_id: "room-1".into() };
        assert!(!err.is_per_message());

        let err = MessagingError::KeyImport { reason: "bad key".to_string() };
        assert!(!err.is_per_message());
    }

    #[test]
    fn crypto_errors_map_to_messaging_errors() {
        let err: MessagingError =
            CryptoError::InvalidNonceLength { expected: 12, actual: 3 }.into();
        assert_eq!(
            err,
            MessagingError::Decryption {
                reason: "invalid nonce length: expected 12, got 3".to_string()
            }
        );

        let err: MessagingError = CryptoError::EncryptionFailed.into();
        assert!(matches!(err, MessagingError::Encryption { .. }));

        let err: MessagingError = CryptoError::KeyImport { reason: "x".to_string() }.into();
        assert_eq!(err, MessagingError::KeyImport { reason: "x".to_string() });
    }

    #[test]
    fn error_display() {
        let err = MessagingError::NotInitialized { conversation_id: "room-42".into() };
        assert_eq!(err.to_string(), "conversation not initialized: room-42");
    }
}
