//! Error types for Sealbox Core.

use thiserror::Error;

/// Core errors that can occur during key, signature and identity operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    /// The key agreement produced an all-zero secret (low-order peer point).
    #[error("key agreement produced a non-contributory shared secret")]
    WeakSharedSecret,

    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}
