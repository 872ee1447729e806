//! Streaming envelope decoder and encoder.
//!
//! ```text
//! === BEGIN SEALBOX ===
//! SEALBOX # sealbox encrypted file
//! SEALBOX {
//! SEALBOX   "key": "...",
//! ...
//! === END SEALBOX ===
//! <base64 ciphertext chunk>
//! <base64 ciphertext chunk>
//! ```
//!
//! The decoder is push-based and performs no I/O. Callers feed it chunks of
//! any size and receive the metadata once, followed by ciphertext chunks as
//! their lines complete. Lines longer than [`MAX_LINE_LEN`] and metadata
//! blocks larger than [`MAX_METADATA_LEN`] are rejected, so memory use stays
//! bounded whatever the input.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use std::fmt;

use sealbox_core::EnvelopeMetadata;

use crate::error::{CodecError, Result};
use crate::line::LineReader;
use crate::metadata;

/// First line of every envelope.
pub const HEADER: &str = "=== BEGIN SEALBOX ===";

/// Line that closes the metadata block.
pub const FOOTER: &str = "=== END SEALBOX ===";

/// Prefix of every metadata line.
pub const TAG: &str = "SEALBOX ";

/// Comment written after the header. Tagged lines starting with `#` are ignored.
pub const COMMENT: &str = "# sealbox encrypted file";

/// Longest accepted line, terminator excluded.
pub const MAX_LINE_LEN: usize = 2 * 1024 * 1024;

/// Largest accepted metadata block.
pub const MAX_METADATA_LEN: usize = 1024 * 1024;

/// Largest ciphertext chunk whose body line stays within [`MAX_LINE_LEN`].
pub const MAX_CHUNK_LEN: usize = MAX_LINE_LEN / 4 * 3;

/// Decoder position within the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    AwaitingHeader,
    InMetadata,
    InBody,
}

impl fmt::Display for DecodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingHeader => f.write_str("awaiting header"),
            Self::InMetadata => f.write_str("reading metadata"),
            Self::InBody => f.write_str("reading body"),
        }
    }
}

/// Output of the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The parsed metadata block. Emitted exactly once, before any chunk.
    Metadata(EnvelopeMetadata),
    /// One decoded ciphertext chunk (one body line).
    Chunk(Bytes),
}

/// Push-based envelope decoder.
///
/// After an error the decoder is poisoned: every later call returns the
/// same error and yields nothing.
#[derive(Debug)]
pub struct EnvelopeDecoder {
    lines: LineReader,
    state: DecodeState,
    metadata_text: String,
    error: Option<CodecError>,
}

impl EnvelopeDecoder {
    /// Create a decoder awaiting the header line.
    pub fn new() -> Self {
        Self {
            lines: LineReader::new(),
            state: DecodeState::AwaitingHeader,
            metadata_text: String::new(),
            error: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Feed the next chunk of input.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Event>> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let mut events = Vec::new();
        self.lines.extend(chunk);
        while let Some(line) = self.lines.next_line() {
            let line_no = self.lines.line_number();
            if let Err(err) = self.on_line(line, line_no, &mut events) {
                self.error = Some(err.clone());
                return Err(err);
            }
        }
        if self.lines.pending() > MAX_LINE_LEN + 2 {
            let err = CodecError::LineTooLong {
                line: self.lines.line_number() + 1,
                limit: MAX_LINE_LEN,
            };
            self.error = Some(err.clone());
            return Err(err);
        }
        Ok(events)
    }

    /// Signal end of input.
    ///
    /// Processes an unterminated final line, then requires the decoder to be
    /// in the body section.
    pub fn finish(&mut self) -> Result<Vec<Event>> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let mut events = Vec::new();
        let result = match self.lines.finish() {
            Some(line) => {
                let line_no = self.lines.line_number();
                self.on_line(line, line_no, &mut events)
            }
            None => Ok(()),
        }
        .and_then(|()| match self.state {
            DecodeState::InBody => Ok(()),
            state => Err(CodecError::UnexpectedEof { state }),
        });

        match result {
            Ok(()) => Ok(events),
            Err(err) => {
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn on_line(&mut self, line: Bytes, line_no: usize, events: &mut Vec<Event>) -> Result<()> {
        if line.len() > MAX_LINE_LEN {
            return Err(CodecError::LineTooLong {
                line: line_no,
                limit: MAX_LINE_LEN,
            });
        }
        match self.state {
            DecodeState::AwaitingHeader => {
                if &line[..] != HEADER.as_bytes() {
                    return Err(CodecError::MissingHeader { line: line_no });
                }
                self.state = DecodeState::InMetadata;
            }
            DecodeState::InMetadata => {
                let text = std::str::from_utf8(&line)
                    .map_err(|_| CodecError::InvalidUtf8 { line: line_no })?;
                if text == FOOTER {
                    let text = std::mem::take(&mut self.metadata_text);
                    events.push(Event::Metadata(metadata::from_text(&text)?));
                    self.state = DecodeState::InBody;
                } else if text == TAG.trim_end() {
                    self.metadata_text.push('\n');
                } else {
                    let rest = text
                        .strip_prefix(TAG)
                        .ok_or(CodecError::MissingTag { line: line_no })?;
                    if !rest.starts_with('#') {
                        self.metadata_text.push_str(rest);
                        self.metadata_text.push('\n');
                    }
                }
                if self.metadata_text.len() > MAX_METADATA_LEN {
                    return Err(CodecError::MetadataTooLarge {
                        limit: MAX_METADATA_LEN,
                    });
                }
            }
            DecodeState::InBody => {
                if line.is_empty() {
                    return Ok(());
                }
                let chunk = STANDARD
                    .decode(&line)
                    .map_err(|_| CodecError::InvalidBase64 { line: line_no })?;
                events.push(Event::Chunk(Bytes::from(chunk)));
            }
        }
        Ok(())
    }
}

impl Default for EnvelopeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a complete in-memory envelope.
pub fn decode_all(input: &[u8]) -> Result<(EnvelopeMetadata, Vec<Bytes>)> {
    let mut decoder = EnvelopeDecoder::new();
    let mut events = decoder.feed(input)?;
    events.extend(decoder.finish()?);

    let mut metadata = None;
    let mut chunks = Vec::new();
    for event in events {
        match event {
            Event::Metadata(m) => metadata = Some(m),
            Event::Chunk(c) => chunks.push(c),
        }
    }
    // finish() succeeded, so the footer (and with it the metadata) was seen.
    let metadata = metadata.ok_or(CodecError::UnexpectedEof {
        state: DecodeState::InMetadata,
    })?;
    Ok((metadata, chunks))
}

/// Envelope serializer.
pub struct EnvelopeEncoder;

impl EnvelopeEncoder {
    /// Header sentinel, comment, tagged metadata lines and footer sentinel.
    pub fn header(metadata: &EnvelopeMetadata) -> Result<String> {
        let text = metadata::to_text(metadata)?;
        let mut out = String::with_capacity(text.len() * 2);
        out.push_str(HEADER);
        out.push('\n');
        out.push_str(TAG);
        out.push_str(COMMENT);
        out.push('\n');
        for line in text.lines() {
            out.push_str(TAG);
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(FOOTER);
        out.push('\n');
        Ok(out)
    }

    /// One ciphertext chunk as a base64 body line.
    pub fn body_line(chunk: &[u8]) -> String {
        let mut line = STANDARD.encode(chunk);
        line.push('\n');
        line
    }

    /// Serialize a complete envelope in memory. Empty chunks are skipped.
    pub fn encode_all<'a>(
        metadata: &EnvelopeMetadata,
        chunks: impl IntoIterator<Item = &'a [u8]>,
    ) -> Result<Vec<u8>> {
        let mut out = Self::header(metadata)?.into_bytes();
        for chunk in chunks.into_iter().filter(|c| !c.is_empty()) {
            out.extend_from_slice(Self::body_line(chunk).as_bytes());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sealbox_core::{recipients_message, Identity, Keypair, Profile, RecipientEntry, WrappedKey};

    fn sample_metadata(n: usize) -> EnvelopeMetadata {
        let recipients: Vec<RecipientEntry> = (0..n)
            .map(|i| {
                let id = Identity::generate(Profile::new(
                    format!("user{i}"),
                    format!("user{i}@example.com"),
                ));
                RecipientEntry::new(id.invite(), WrappedKey::from_bytes(vec![i as u8; 48]))
            })
            .collect();
        let ephemeral = Keypair::generate();
        let signature = ephemeral.sign(&recipients_message(&recipients));
        EnvelopeMetadata {
            ephemeral_public: ephemeral.public_key(),
            recipients,
            signature,
        }
    }

    fn sample_envelope() -> (EnvelopeMetadata, Vec<Vec<u8>>, Vec<u8>) {
        let meta = sample_metadata(3);
        let chunks: Vec<Vec<u8>> = (0..5u8).map(|i| vec![i; 16 * (i as usize + 1)]).collect();
        let bytes = EnvelopeEncoder::encode_all(&meta, chunks.iter().map(Vec::as_slice)).unwrap();
        (meta, chunks, bytes)
    }

    fn decode_in_chunks(input: &[u8], size: usize) -> Result<(EnvelopeMetadata, Vec<u8>)> {
        let mut decoder = EnvelopeDecoder::new();
        let mut events = Vec::new();
        for piece in input.chunks(size) {
            events.extend(decoder.feed(piece)?);
        }
        events.extend(decoder.finish()?);

        let mut meta = None;
        let mut body = Vec::new();
        for event in events {
            match event {
                Event::Metadata(m) => {
                    assert!(meta.is_none(), "metadata emitted twice");
                    assert!(body.is_empty(), "chunk before metadata");
                    meta = Some(m);
                }
                Event::Chunk(c) => body.extend_from_slice(&c),
            }
        }
        Ok((meta.expect("metadata"), body))
    }

    #[test]
    fn test_encode_layout() {
        let (_, _, bytes) = sample_envelope();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(HEADER));
        assert_eq!(lines.next(), Some("SEALBOX # sealbox encrypted file"));
        let footer_at = text.lines().position(|l| l == FOOTER).unwrap();
        assert!(text
            .lines()
            .skip(1)
            .take(footer_at - 1)
            .all(|l| l.starts_with(TAG)));
        assert_eq!(text.lines().count(), footer_at + 1 + 5);
    }

    #[test]
    fn test_decode_all() {
        let (meta, chunks, bytes) = sample_envelope();
        let (decoded, decoded_chunks) = decode_all(&bytes).unwrap();
        assert_eq!(decoded, meta);
        let decoded_chunks: Vec<Vec<u8>> = decoded_chunks.iter().map(|c| c.to_vec()).collect();
        assert_eq!(decoded_chunks, chunks);
    }

    #[test]
    fn test_split_sizes_agree() {
        let (meta, chunks, bytes) = sample_envelope();
        let expected_body: Vec<u8> = chunks.concat();
        for size in [1, 7, 4096] {
            let (decoded, body) = decode_in_chunks(&bytes, size).unwrap();
            assert_eq!(decoded, meta, "chunk size {size}");
            assert_eq!(body, expected_body, "chunk size {size}");
        }
    }

    #[test]
    fn test_metadata_emitted_before_body_arrives() {
        let (meta, _, bytes) = sample_envelope();
        let text = String::from_utf8(bytes).unwrap();
        let footer_end = text.find(FOOTER).unwrap() + FOOTER.len() + 1;

        let mut decoder = EnvelopeDecoder::new();
        let events = decoder.feed(&text.as_bytes()[..footer_end]).unwrap();
        assert_eq!(events, vec![Event::Metadata(meta)]);
        assert_eq!(decoder.state(), DecodeState::InBody);
    }

    #[test]
    fn test_empty_body_is_valid() {
        let meta = sample_metadata(1);
        let bytes = EnvelopeEncoder::encode_all(&meta, std::iter::empty()).unwrap();
        let (decoded, chunks) = decode_all(&bytes).unwrap();
        assert_eq!(decoded, meta);
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_missing_footer() {
        let (_, _, bytes) = sample_envelope();
        let text = String::from_utf8(bytes).unwrap();
        let truncated = &text[..text.find(FOOTER).unwrap()];
        assert_eq!(
            decode_all(truncated.as_bytes()).unwrap_err(),
            CodecError::UnexpectedEof {
                state: DecodeState::InMetadata
            }
        );
    }

    #[test]
    fn test_missing_header() {
        let (_, _, bytes) = sample_envelope();
        let text = String::from_utf8(bytes).unwrap();
        let headless = text.strip_prefix(&format!("{HEADER}\n")).unwrap();
        assert_eq!(
            decode_all(headless.as_bytes()).unwrap_err(),
            CodecError::MissingHeader { line: 1 }
        );
    }

    #[test]
    fn test_unrecognized_metadata_prefix() {
        let (_, _, bytes) = sample_envelope();
        let text = String::from_utf8(bytes)
            .unwrap()
            .replacen("SEALBOX   \"key\"", "SEALBOY   \"key\"", 1);
        assert!(matches!(
            decode_all(text.as_bytes()),
            Err(CodecError::MissingTag { .. })
        ));
    }

    #[test]
    fn test_invalid_base64_body_line() {
        let (_, _, mut bytes) = sample_envelope();
        bytes.extend_from_slice(b"***not-base64***\n");
        assert!(matches!(
            decode_all(&bytes),
            Err(CodecError::InvalidBase64 { .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(
            decode_all(b"").unwrap_err(),
            CodecError::UnexpectedEof {
                state: DecodeState::AwaitingHeader
            }
        );
    }

    #[test]
    fn test_unterminated_last_body_line() {
        let (_, chunks, mut bytes) = sample_envelope();
        assert_eq!(bytes.pop(), Some(b'\n'));
        let (_, decoded) = decode_all(&bytes).unwrap();
        assert_eq!(decoded.len(), chunks.len());
    }

    #[test]
    fn test_crlf_envelope() {
        let (meta, chunks, bytes) = sample_envelope();
        let text = String::from_utf8(bytes).unwrap().replace('\n', "\r\n");
        let (decoded, decoded_chunks) = decode_all(text.as_bytes()).unwrap();
        assert_eq!(decoded, meta);
        assert_eq!(decoded_chunks.len(), chunks.len());
    }

    #[test]
    fn test_line_without_newline_rejected() {
        let mut decoder = EnvelopeDecoder::new();
        let block = vec![b'A'; 64 * 1024];
        let mut fed = 0;
        let err = loop {
            match decoder.feed(&block) {
                Ok(events) => assert!(events.is_empty()),
                Err(err) => break err,
            }
            fed += block.len();
            assert!(fed <= MAX_LINE_LEN + 2 * block.len(), "never rejected");
        };
        assert_eq!(
            err,
            CodecError::LineTooLong {
                line: 1,
                limit: MAX_LINE_LEN
            }
        );
        assert!(decoder.finish().is_err());
    }

    #[test]
    fn test_oversized_body_line_in_one_feed() {
        let (_, _, mut bytes) = sample_envelope();
        bytes.extend(std::iter::repeat(b'A').take(MAX_LINE_LEN + 4));
        bytes.push(b'\n');
        assert!(matches!(
            decode_all(&bytes),
            Err(CodecError::LineTooLong { .. })
        ));
    }

    #[test]
    fn test_metadata_without_footer_is_capped() {
        let mut decoder = EnvelopeDecoder::new();
        decoder.feed(format!("{HEADER}\n").as_bytes()).unwrap();
        let line = format!("{TAG}{}\n", "x".repeat(4096));
        let mut fed = 0;
        let err = loop {
            match decoder.feed(line.as_bytes()) {
                Ok(events) => assert!(events.is_empty()),
                Err(err) => break err,
            }
            fed += line.len();
            assert!(fed <= 2 * MAX_METADATA_LEN, "never rejected");
        };
        assert_eq!(
            err,
            CodecError::MetadataTooLarge {
                limit: MAX_METADATA_LEN
            }
        );
    }

    #[test]
    fn test_max_chunk_fits_one_line() {
        let chunk = vec![0u8; MAX_CHUNK_LEN];
        let line = EnvelopeEncoder::body_line(&chunk);
        assert!(line.len() - 1 <= MAX_LINE_LEN);
    }

    #[test]
    fn test_decoder_poisoned_after_error() {
        let mut decoder = EnvelopeDecoder::new();
        assert!(decoder.feed(b"garbage\n").is_err());
        let (_, _, bytes) = sample_envelope();
        assert!(matches!(
            decoder.feed(&bytes),
            Err(CodecError::MissingHeader { .. })
        ));
        assert!(decoder.finish().is_err());
    }

    proptest! {
        #[test]
        fn prop_any_split_decodes_identically(cuts in prop::collection::vec(1usize..300, 1..20)) {
            let (meta, chunks, bytes) = sample_envelope();
            let expected: Vec<u8> = chunks.concat();

            let mut decoder = EnvelopeDecoder::new();
            let mut events = Vec::new();
            let mut rest = bytes.as_slice();
            for cut in cuts.iter().cycle() {
                if rest.is_empty() {
                    break;
                }
                let (head, tail) = rest.split_at((*cut).min(rest.len()));
                events.extend(decoder.feed(head).unwrap());
                rest = tail;
            }
            events.extend(decoder.finish().unwrap());

            prop_assert_eq!(&events[0], &Event::Metadata(meta));
            let body: Vec<u8> = events[1..]
                .iter()
                .flat_map(|e| match e {
                    Event::Chunk(c) => c.to_vec(),
                    Event::Metadata(_) => panic!("metadata twice"),
                })
                .collect();
            prop_assert_eq!(body, expected);
        }
    }
}
