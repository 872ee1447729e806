//! Error types for Sealbox operations.
//!
//! Lower-level errors fold into four outward-facing kinds (see [`ErrorKind`]).
//! `InvalidSignature` and `AccessDenied` stay distinct because they call for
//! different remedies: the first means the file was tampered with, the
//! second that the caller needs to be added by an existing recipient.

use sealbox_codec::CodecError;
use sealbox_core::CoreError;
use sealbox_perms::{PermsError, SignatureFailure};
use sealbox_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Sealbox operations.
#[derive(Debug, Error)]
pub enum SealboxError {
    /// The envelope is malformed.
    #[error("format error: {0}")]
    Format(String),

    /// A metadata or recipient signature did not verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(SignatureFailure),

    /// The identity is not a recipient of the envelope.
    #[error("access denied: you are not a recipient of this file")]
    AccessDenied,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Identity or contact storage error.
    #[error("storage error: {0}")]
    Store(StoreError),

    /// The request cannot be applied to this envelope.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// Coarse classification of a [`SealboxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Format,
    InvalidSignature,
    AccessDenied,
    Io,
    Store,
    InvalidOperation,
}

impl SealboxError {
    /// The error's kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Format(_) => ErrorKind::Format,
            Self::InvalidSignature(_) => ErrorKind::InvalidSignature,
            Self::AccessDenied => ErrorKind::AccessDenied,
            Self::Io(_) => ErrorKind::Io,
            Self::Store(_) => ErrorKind::Store,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
        }
    }
}

impl From<CodecError> for SealboxError {
    fn from(e: CodecError) -> Self {
        Self::Format(e.to_string())
    }
}

impl From<CoreError> for SealboxError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidProfile(reason) => Self::InvalidOperation(reason),
            other => Self::Format(other.to_string()),
        }
    }
}

impl From<StoreError> for SealboxError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Core(CoreError::InvalidProfile(reason)) => Self::InvalidOperation(reason),
            other => Self::Store(other),
        }
    }
}

impl From<PermsError> for SealboxError {
    fn from(e: PermsError) -> Self {
        match e {
            PermsError::InvalidSignature(which) => Self::InvalidSignature(which),
            PermsError::AccessDenied => Self::AccessDenied,
            PermsError::NoRecipients => {
                Self::InvalidOperation("an envelope needs at least one recipient".into())
            }
            other @ (PermsError::DuplicateRecipient(_) | PermsError::Cipher(_)) => {
                Self::Format(other.to_string())
            }
            PermsError::CoreError(core) => core.into(),
        }
    }
}

/// Result type for Sealbox operations.
pub type Result<T> = std::result::Result<T, SealboxError>;

#[cfg(test)]
mod tests {
    use super::*;
    use sealbox_codec::DecodeState;
    use sealbox_perms::CipherError;

    #[test]
    fn test_kinds() {
        let format: SealboxError = CodecError::UnexpectedEof {
            state: DecodeState::InMetadata,
        }
        .into();
        assert_eq!(format.kind(), ErrorKind::Format);

        let sig: SealboxError = PermsError::InvalidSignature(SignatureFailure::Metadata).into();
        assert_eq!(sig.kind(), ErrorKind::InvalidSignature);

        let denied: SealboxError = PermsError::AccessDenied.into();
        assert_eq!(denied.kind(), ErrorKind::AccessDenied);

        let padding: SealboxError = PermsError::Cipher(CipherError::BadPadding).into();
        assert_eq!(padding.kind(), ErrorKind::Format);

        let io: SealboxError = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert_eq!(io.kind(), ErrorKind::Io);
    }

    #[tokio::test]
    async fn test_rejected_enrollment_is_invalid_operation() {
        use sealbox_core::{Identity, Profile};
        use sealbox_store::{IdentityStore, MemoryIdentityStore};

        let store = MemoryIdentityStore::new();
        let identity = Identity::generate(Profile::new("alice", "alice-at-example"));
        let err: SealboxError = store.save(&identity, false).await.unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert!(err.to_string().contains("alice-at-example"));

        let missing: SealboxError = store.load().await.unwrap_err().into();
        assert_eq!(missing.kind(), ErrorKind::Store);
    }

    #[test]
    fn test_recipient_failure_names_email() {
        let err: SealboxError = PermsError::InvalidSignature(SignatureFailure::Recipient {
            index: 2,
            email: "bob@example.com".into(),
        })
        .into();
        assert!(err.to_string().contains("bob@example.com"));
    }
}
