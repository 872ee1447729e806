//! # Sealbox Codec
//!
//! Streaming parser and serializer for the on-disk envelope format.
//!
//! An envelope is UTF-8 text: a header sentinel, tagged metadata lines, a
//! footer sentinel, then one base64 ciphertext chunk per line. The decoder
//! tolerates chunk boundaries anywhere in the input, including mid-line.
//!
//! ## Key Types
//!
//! - [`LineReader`] - Reassembles lines from arbitrary chunks
//! - [`EnvelopeDecoder`] - Push-based decoder: `AwaitingHeader → InMetadata → InBody`
//! - [`EnvelopeEncoder`] - Renders metadata and body lines
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealbox_codec::{EnvelopeDecoder, Event};
//!
//! fn example(chunks: &[&[u8]]) -> sealbox_codec::Result<()> {
//!     let mut decoder = EnvelopeDecoder::new();
//!     for chunk in chunks {
//!         for event in decoder.feed(chunk)? {
//!             match event {
//!                 Event::Metadata(meta) => println!("{} recipients", meta.recipients.len()),
//!                 Event::Chunk(ciphertext) => println!("{} bytes", ciphertext.len()),
//!             }
//!         }
//!     }
//!     decoder.finish()?;
//!     Ok(())
//! }
//! ```

pub mod envelope;
pub mod error;
pub mod line;
pub mod metadata;

pub use envelope::{
    decode_all, DecodeState, EnvelopeDecoder, EnvelopeEncoder, Event, COMMENT, FOOTER, HEADER,
    MAX_CHUNK_LEN, MAX_LINE_LEN, MAX_METADATA_LEN, TAG,
};
pub use error::{CodecError, Result};
pub use line::{LineReader, Lines};
