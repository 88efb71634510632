//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` backs the messenger with the real wall clock and the OS
//! cryptographic RNG. Nonces and identity seeds drawn from it are not
//! reproducible; use `MockEnv` where determinism matters.

use crate::env::Environment;

/// Production environment using system time and cryptographic RNG.
///
/// # Security
///
/// The RNG uses getrandom which provides OS-level cryptographic randomness
/// (e.g., /dev/urandom on Linux, `BCryptGenRandom` on Windows). Suitable for
/// nonces and identity key seeds.
///
/// # Panics
///
/// Panics if the OS RNG fails. Without working randomness no nonce or
/// identity key can be generated safely, and continuing would risk nonce
/// reuse.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - nonces cannot be generated");
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock_millis(&self) -> u64 {
        // A clock before 1970 reads as 0 rather than aborting a send.
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as u64)
    }
}
