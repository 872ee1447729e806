//! # Sealbox Core
//!
//! Pure primitives for Sealbox: identities, signatures, key agreement and the
//! envelope data model.
//!
//! This crate contains no I/O. It is pure computation over cryptographic
//! data structures.
//!
//! ## Key Types
//!
//! - [`Identity`] - A participant's keypair and self-signed profile
//! - [`RecipientCandidate`] - The shareable half of an identity (an invite)
//! - [`RecipientEntry`] - A recipient inside an envelope, with its wrapped content key
//! - [`EnvelopeMetadata`] - Ephemeral key, recipients and the recipients-list signature
//!
//! ## Signing
//!
//! Signatures cover domain-separated canonical CBOR. See [`canonical`].

pub mod canonical;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod identity;
pub mod types;

pub use canonical::{profile_message, recipients_message};
pub use crypto::{
    Keypair, PublicKey, SharedSecret, Signature, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE, SIGNATURE_SIZE,
};
pub use error::CoreError;
pub use identity::{verify_profile_signature, Identity, Profile, RecipientCandidate};
pub use types::{EnvelopeMetadata, RecipientEntry, WrappedKey};
