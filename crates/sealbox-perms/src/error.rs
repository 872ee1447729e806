//! Error types for the recipient registry and content cipher.

use std::fmt;

use sealbox_core::PublicKey;
use thiserror::Error;

/// Which signature failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureFailure {
    /// The ephemeral key's signature over the recipient list.
    Metadata,
    /// A recipient's own profile signature, by position in the list.
    Recipient { index: usize, email: String },
}

impl fmt::Display for SignatureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metadata => f.write_str("metadata signature"),
            Self::Recipient { index, email } => {
                write!(f, "signature of recipient #{index} <{email}>")
            }
        }
    }
}

/// Errors from the symmetric cipher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    /// Ciphertext length is not a positive multiple of the block size.
    #[error("ciphertext is truncated")]
    Truncated,

    /// The final block does not carry valid padding.
    #[error("invalid padding")]
    BadPadding,

    /// An unwrapped content key has the wrong size.
    #[error("invalid key length: expected 32, got {0}")]
    KeyLength(usize),
}

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum PermsError {
    /// A signature did not verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(SignatureFailure),

    /// The identity is not among the recipients.
    #[error("access denied: identity is not a recipient")]
    AccessDenied,

    /// The same public key appears twice in a recipient list.
    #[error("duplicate recipient {}", .0.fingerprint())]
    DuplicateRecipient(PublicKey),

    /// A recipient list is empty.
    #[error("recipient list is empty")]
    NoRecipients,

    /// Symmetric encryption or decryption failed.
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] sealbox_core::CoreError),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, PermsError>;
