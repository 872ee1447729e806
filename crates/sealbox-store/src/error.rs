//! Error types for the store module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be serialized or parsed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// No identity has been created yet.
    #[error("no identity at {}", .0.display())]
    NoIdentity(PathBuf),

    /// An identity already exists and overwrite was not requested.
    #[error("identity already exists at {}", .0.display())]
    IdentityExists(PathBuf),

    /// A stored identity failed verification.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// A contact alias is already taken.
    #[error("contact alias already exists: {0}")]
    AliasExists(String),

    /// No contact matches the alias or email.
    #[error("no contact named {0}")]
    AliasNotFound(String),

    /// Core error (for example an invite whose signature does not verify).
    #[error("core error: {0}")]
    Core(#[from] sealbox_core::CoreError),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
