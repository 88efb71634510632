//! Messenger configuration.

/// What `initialize` does when the conversation already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReinitializePolicy {
    /// Replace all prior key material. A warning is logged when bound peer
    /// material is discarded.
    #[default]
    Overwrite,

    /// Reject with `AlreadyInitialized` if the existing entry has a bound
    /// peer key. Entries without a peer are still replaced.
    RejectIfPeerBound,
}

/// Configuration for [`crate::SecureMessenger`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessengerConfig {
    /// Re-initialization behavior
    pub reinitialize: ReinitializePolicy,
}

impl MessengerConfig {
    /// Configuration that refuses to overwrite a conversation with a bound
    /// peer.
    pub fn strict() -> Self {
        Self { reinitialize: ReinitializePolicy::RejectIfPeerBound }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_overwrites() {
        assert_eq!(MessengerConfig::default().reinitialize, ReinitializePolicy::Overwrite);
    }

    #[test]
    fn config_is_copy() {
        let strict = MessengerConfig::strict();
        let copied = strict;

        assert_eq!(strict, copied);
        assert_eq!(copied.reinitialize, ReinitializePolicy::RejectIfPeerBound);
    }
}
