//! Error types for the envelope codec.
//!
//! Every variant is a framing failure: the input is not a well-formed
//! envelope. No partial envelope is ever returned alongside one.

use thiserror::Error;

use crate::envelope::DecodeState;

/// Errors that can occur while decoding or encoding an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The first line is not the header sentinel.
    #[error("line {line}: expected envelope header")]
    MissingHeader { line: usize },

    /// A metadata line lacks the required prefix tag.
    #[error("line {line}: metadata line is missing its prefix tag")]
    MissingTag { line: usize },

    /// Input ended before the body section was reached.
    #[error("unexpected end of input while {state}")]
    UnexpectedEof { state: DecodeState },

    /// A line is not valid UTF-8.
    #[error("line {line}: invalid UTF-8")]
    InvalidUtf8 { line: usize },

    /// A body line is not valid base64.
    #[error("line {line}: invalid base64 in body")]
    InvalidBase64 { line: usize },

    /// A line exceeds [`MAX_LINE_LEN`](crate::MAX_LINE_LEN) bytes.
    #[error("line {line}: longer than {limit} bytes")]
    LineTooLong { line: usize, limit: usize },

    /// The metadata block exceeds [`MAX_METADATA_LEN`](crate::MAX_METADATA_LEN) bytes.
    #[error("metadata block larger than {limit} bytes")]
    MetadataTooLarge { limit: usize },

    /// The metadata text does not parse as envelope metadata.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
