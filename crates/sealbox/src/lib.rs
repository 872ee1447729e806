//! # Sealbox
//!
//! Multi-recipient file encryption. A set of identities shares one encrypted
//! file; each can recover the content key independently, and the recipient
//! list can change without any key exchange beyond the initial invite.
//!
//! ## Overview
//!
//! An envelope file carries signed metadata (an ephemeral public key, the
//! recipient list with one wrapped content key per recipient, and the
//! ephemeral key's signature over that list) followed by the AES-256-CBC
//! body. Every change to the plaintext or the recipients reseals the file
//! under a fresh content key and a fresh ephemeral key.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealbox::{Sealbox, SealboxConfig};
//! use sealbox::core::{Identity, Profile};
//!
//! async fn example() -> sealbox::Result<()> {
//!     let alice = Identity::generate(Profile::new("alice", "alice@example.com"));
//!     let bob = Identity::generate(Profile::new("bob", "bob@example.com"));
//!     let sealbox = Sealbox::new(SealboxConfig::default());
//!
//!     // Create the file with alice as its only recipient
//!     sealbox.write("secrets.env", &alice, &mut &b"API_KEY=hunter2\n"[..]).await?;
//!
//!     // Let bob in
//!     sealbox.add_recipient("secrets.env", &alice, bob.invite()).await?;
//!
//!     let plaintext = sealbox.read_to_vec("secrets.env", &bob).await?;
//!     assert_eq!(plaintext, b"API_KEY=hunter2\n");
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `sealbox::core` - Identities, keys and the envelope data model
//! - `sealbox::codec` - The envelope text format
//! - `sealbox::perms` - Recipient registry and content cipher
//! - `sealbox::store` - Identity and contact persistence

pub mod config;
pub mod error;
pub mod protocol;
mod stream;

// Re-export component crates
pub use sealbox_codec as codec;
pub use sealbox_core as core;
pub use sealbox_perms as perms;
pub use sealbox_store as store;

// Re-export main types for convenience
pub use config::SealboxConfig;
pub use error::{ErrorKind, Result, SealboxError};
pub use protocol::{Opened, RecipientChange, Sealbox};

// Re-export commonly used core types
pub use sealbox_core::{
    EnvelopeMetadata, Identity, Profile, PublicKey, RecipientCandidate, RecipientEntry,
};
pub use sealbox_perms::{ContentKey, SignatureFailure};
