//! Envelope data model.
//!
//! Field names on the wire are short (`pub`, `sig`, `enc`, `key`, `users`)
//! and match the metadata text format written by the codec.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::recipients_message;
use crate::crypto::{PublicKey, Signature};
use crate::encoding::{base64_serde, from_base64, to_base64};
use crate::error::CoreError;
use crate::identity::{verify_profile_signature, Profile, RecipientCandidate};

/// A content key encrypted for one recipient.
#[derive(Clone, PartialEq, Eq)]
pub struct WrappedKey(Vec<u8>);

impl WrappedKey {
    /// Create from raw ciphertext.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw ciphertext.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encode as base64.
    pub fn to_base64(&self) -> String {
        to_base64(&self.0)
    }

    /// Parse from base64.
    pub fn from_base64(s: &str) -> Result<Self, CoreError> {
        from_base64(s).map(Self)
    }
}

impl fmt::Debug for WrappedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WrappedKey({} bytes)", self.0.len())
    }
}

base64_serde!(WrappedKey);

/// One recipient of an envelope.
///
/// Carries the recipient's signed profile and the envelope's content key
/// wrapped under ECDH(ephemeral, recipient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipientEntry {
    #[serde(rename = "pub")]
    pub public_key: PublicKey,
    pub handle: String,
    pub email: String,
    #[serde(rename = "sig")]
    pub signature: Signature,
    #[serde(rename = "enc")]
    pub wrapped_key: WrappedKey,
}

impl RecipientEntry {
    /// Build an entry from a candidate and its wrapped key.
    pub fn new(candidate: RecipientCandidate, wrapped_key: WrappedKey) -> Self {
        Self {
            public_key: candidate.public_key,
            handle: candidate.handle,
            email: candidate.email,
            signature: candidate.signature,
            wrapped_key,
        }
    }

    /// The recipient's profile fields.
    pub fn profile(&self) -> Profile {
        Profile::new(self.handle.clone(), self.email.clone())
    }

    /// Verify this entry's own profile signature.
    pub fn verify_profile(&self) -> Result<(), CoreError> {
        verify_profile_signature(&self.public_key, &self.profile(), &self.signature)
    }
}

impl From<RecipientEntry> for RecipientCandidate {
    fn from(entry: RecipientEntry) -> Self {
        Self {
            public_key: entry.public_key,
            handle: entry.handle,
            email: entry.email,
            signature: entry.signature,
        }
    }
}

impl From<&RecipientEntry> for RecipientCandidate {
    fn from(entry: &RecipientEntry) -> Self {
        entry.clone().into()
    }
}

/// The metadata block of an envelope.
///
/// Entirely regenerated on every reseal. `signature` is made by the ephemeral
/// key over the ordered recipient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvelopeMetadata {
    #[serde(rename = "key")]
    pub ephemeral_public: PublicKey,
    #[serde(rename = "users")]
    pub recipients: Vec<RecipientEntry>,
    #[serde(rename = "sig")]
    pub signature: Signature,
}

impl EnvelopeMetadata {
    /// The message covered by `signature`.
    pub fn signed_message(&self) -> Vec<u8> {
        recipients_message(&self.recipients)
    }

    /// Verify `signature` against `ephemeral_public`.
    pub fn verify_signature(&self) -> Result<(), CoreError> {
        self.ephemeral_public
            .verify(&self.signed_message(), &self.signature)
    }

    /// Locate a recipient by public key.
    pub fn recipient(&self, public_key: &PublicKey) -> Option<(usize, &RecipientEntry)> {
        self.recipients
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.public_key == *public_key)
    }

    /// Whether `public_key` is among the recipients.
    pub fn contains(&self, public_key: &PublicKey) -> bool {
        self.recipient(public_key).is_some()
    }
}
