//! Convoseal command-line tool.
//!
//! # Usage
//!
//! ```bash
//! # Generate an identity and print its exchange form
//! convoseal keygen
//!
//! # Fingerprint a peer's public key for out-of-band comparison
//! convoseal fingerprint '11qYAYKxCrfVS/7TyWQHOg7hcvPapiMlrwIaaPcHURo='
//!
//! # Two in-process parties exchanging messages, rotating every 2 messages
//! convoseal --log-level debug demo --rotate-after 2 hello there general kenobi
//! ```

use std::io::{self, Write};

use clap::{Parser, Subcommand};
use convoseal_core::{ConversationId, EncryptedMessage, Environment, SecureMessenger, SystemEnv};
use convoseal_crypto::PublicKey;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Convoseal conversation tools
#[derive(Parser, Debug)]
#[command(name = "convoseal")]
#[command(about = "End-to-end encrypted conversation messaging tools")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an identity keypair and print the public half
    Keygen,

    /// Print the fingerprint of a base64 public key
    Fingerprint {
        /// Public key in exchange format (base64)
        public_key: String,
    },

    /// Run two in-process parties and print every wire envelope
    Demo {
        /// Conversation identifier
        #[arg(short, long, default_value = "room-42")]
        conversation: String,

        /// Rotate both sides after this many messages (0 disables rotation)
        #[arg(short, long, default_value = "0")]
        rotate_after: usize,

        /// Messages to send, alternating between the two parties
        #[arg(required = true)]
        messages: Vec<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let mut out = io::stdout().lock();

    match args.command {
        Command::Keygen => {
            let messenger = SecureMessenger::new(SystemEnv::new());
            let identity = messenger.generate_identity_key_pair();
            let exchange = serde_json::json!({
                "publicKey": identity.export_public_key(),
                "fingerprint": identity.fingerprint().to_string(),
            });
            writeln!(out, "{exchange}")?;
        },
        Command::Fingerprint { public_key } => {
            let key = PublicKey::import(&public_key)?;
            writeln!(out, "{}", key.fingerprint())?;
        },
        Command::Demo { conversation, rotate_after, messages } => {
            run_demo(
                SystemEnv::new(),
                SystemEnv::new(),
                &conversation,
                rotate_after,
                &messages,
                &mut out,
            )?;
        },
    }

    Ok(())
}

/// Drive a two-party conversation in process.
///
/// Each party gets its own environment. Envelopes are written to `out` as
/// JSON lines and decoded back from that text before decryption.
fn run_demo<E: Environment>(
    alice_env: E,
    bob_env: E,
    conversation: &str,
    rotate_after: usize,
    messages: &[String],
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let conversation = ConversationId::new(conversation);
    let mut alice = SecureMessenger::new(alice_env);
    let mut bob = SecureMessenger::new(bob_env);

    let alice_id = alice.generate_identity_key_pair();
    let bob_id = bob.generate_identity_key_pair();
    let alice_exchange = (alice_id.export_public_key(), alice_id.fingerprint().to_string());
    let bob_exchange = (bob_id.export_public_key(), bob_id.fingerprint().to_string());

    // Stands in for the external key agreement.
    let key = alice.generate_encryption_key();
    alice.initialize(
        conversation.clone(),
        key.clone(),
        alice_id,
        Some((bob_exchange.0.as_str(), bob_exchange.1.as_str())),
    )?;
    bob.initialize(
        conversation.clone(),
        key,
        bob_id,
        Some((alice_exchange.0.as_str(), alice_exchange.1.as_str())),
    )?;

    tracing::info!(
        conversation_id = %conversation,
        alice = %alice_exchange.1,
        bob = %bob_exchange.1,
        "conversation established"
    );

    let id = conversation.as_str();
    for (i, text) in messages.iter().enumerate() {
        if rotate_after > 0 && i > 0 && i % rotate_after == 0 {
            let next = alice.generate_encryption_key();
            let generation = alice.rotate(id, next.clone())?;
            bob.rotate(id, next)?;
            tracing::info!(conversation_id = id, generation, "rotated both parties");
        }

        let (sender, receiver, from) =
            if i % 2 == 0 { (&alice, &bob, "alice") } else { (&bob, &alice, "bob") };

        let wire = sender.encrypt(id, text)?.to_json()?;
        writeln!(out, "{wire}")?;

        let envelope = EncryptedMessage::from_json(&wire)?;
        let message = receiver.decrypt(id, &envelope)?;
        tracing::info!(
            from,
            generation = message.key_generation,
            verified = message.is_verified,
            len = message.content.len(),
            "delivered"
        );
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use convoseal_core::env::test_utils::MockEnv;

    use super::*;

    fn demo_lines(rotate_after: usize, messages: &[&str]) -> Vec<EncryptedMessage> {
        let messages: Vec<String> = messages.iter().map(ToString::to_string).collect();
        let mut out = Vec::new();

        run_demo(
            MockEnv::with_seed(1),
            MockEnv::with_seed(2),
            "room-42",
            rotate_after,
            &messages,
            &mut out,
        )
        .unwrap();

        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| EncryptedMessage::from_json(line).unwrap())
            .collect()
    }

    #[test]
    fn demo_prints_one_envelope_per_message() {
        let envelopes = demo_lines(0, &["a", "b", "c"]);

        assert_eq!(envelopes.len(), 3);
        assert!(envelopes.iter().all(|e| e.key_generation == 1));
        // Parties alternate.
        assert_ne!(envelopes[0].sender_fingerprint, envelopes[1].sender_fingerprint);
        assert_eq!(envelopes[0].sender_fingerprint, envelopes[2].sender_fingerprint);
    }

    #[test]
    fn demo_rotates_on_schedule() {
        let envelopes = demo_lines(2, &["1", "2", "3", "4", "5"]);

        let generations: Vec<_> = envelopes.iter().map(|e| e.key_generation).collect();
        assert_eq!(generations, vec![1, 1, 2, 2, 3]);
    }

    #[test]
    fn args_parse_demo() {
        let args = Args::try_parse_from([
            "convoseal",
            "demo",
            "--conversation",
            "room-7",
            "--rotate-after",
            "3",
            "hi",
        ])
        .unwrap();

        match args.command {
            Command::Demo { conversation, rotate_after, messages } => {
                assert_eq!(conversation, "room-7");
                assert_eq!(rotate_after, 3);
                assert_eq!(messages, vec!["hi".to_string()]);
            },
            other => unreachable!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn args_require_demo_messages() {
        assert!(Args::try_parse_from(["convoseal", "demo"]).is_err());
    }
}
