//! Human-comparable fingerprints of public identity keys
//!
//! A fingerprint is the first 16 bytes of SHA-256 over the raw 32-byte public
//! key, rendered as uppercase hex in groups of four:
//!
//! ```text
//! 6668 7AAD F862 BD77 6C8F C18B 8E9F 8E20
//! ```
//!
//! Two parties compare fingerprints out of band to detect a substituted key.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::{error::CryptoError, identity::PUBLIC_KEY_SIZE};

/// Number of digest bytes kept in a fingerprint
pub const FINGERPRINT_BYTES: usize = 16;

/// Hex characters per display group
const GROUP_LEN: usize = 4;

/// Stable digest of a public verification key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a raw public key.
    pub fn of_public_key(public_key: &[u8; PUBLIC_KEY_SIZE]) -> Self {
        let digest = Sha256::digest(public_key);
        Self(group_hex(&hex::encode_upper(&digest[..FINGERPRINT_BYTES])))
    }

    /// Parse a fingerprint string received from a peer.
    ///
    /// Accepts any case and any whitespace between characters, and
    /// normalizes to the canonical grouped form.
    pub fn parse(input: &str) -> Result<Self, CryptoError> {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();

        let bytes = hex::decode(&compact).map_err(|e| CryptoError::KeyImport {
            reason: format!("fingerprint is not hex: {e}"),
        })?;

        if bytes.len() != FINGERPRINT_BYTES {
            return Err(CryptoError::KeyImport {
                reason: format!(
                    "fingerprint must be {FINGERPRINT_BYTES} bytes, got {}",
                    bytes.len()
                ),
            });
        }

        Ok(Self(group_hex(&hex::encode_upper(bytes))))
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.0)
    }
}

fn group_hex(hex: &str) -> String {
    let mut out = String::with_capacity(hex.len() + hex.len() / GROUP_LEN);
    for (i, c) in hex.chars().enumerate() {
        if i > 0 && i % GROUP_LEN == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}
