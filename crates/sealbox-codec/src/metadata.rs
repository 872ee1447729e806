//! Metadata text format.
//!
//! Metadata is rendered as pretty-printed JSON before being split into tagged
//! lines. Binary fields are base64 strings; see `sealbox_core::encoding`.

use sealbox_core::EnvelopeMetadata;

use crate::error::{CodecError, Result};

/// Render metadata as text, one JSON token group per line.
pub fn to_text(metadata: &EnvelopeMetadata) -> Result<String> {
    serde_json::to_string_pretty(metadata).map_err(|e| CodecError::InvalidMetadata(e.to_string()))
}

/// Parse de-tagged metadata text.
pub fn from_text(text: &str) -> Result<EnvelopeMetadata> {
    serde_json::from_str(text).map_err(|e| CodecError::InvalidMetadata(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(from_text(""), Err(CodecError::InvalidMetadata(_))));
    }

    #[test]
    fn test_rejects_short_key() {
        let text = r#"{"key": "AAAA", "users": [], "sig": "AAAA"}"#;
        assert!(matches!(from_text(text), Err(CodecError::InvalidMetadata(_))));
    }

    #[test]
    fn test_text_has_no_blank_lines() {
        let key = sealbox_core::Keypair::generate();
        let meta = EnvelopeMetadata {
            ephemeral_public: key.public_key(),
            recipients: vec![],
            signature: key.sign(b"x"),
        };
        let text = to_text(&meta).unwrap();
        assert!(text.lines().all(|l| !l.trim().is_empty()));
        assert_eq!(from_text(&text).unwrap(), meta);
    }
}
