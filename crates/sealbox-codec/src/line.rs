//! Chunk-to-line reassembly.
//!
//! [`LineReader`] accepts input in arbitrary chunks and hands back complete
//! lines. A chunk boundary may fall anywhere, including inside a `\r\n` pair;
//! the incomplete tail is buffered until the next push or [`LineReader::finish`].

use bytes::{Bytes, BytesMut};

/// Splits a byte stream into `\n`-terminated lines.
///
/// Yielded lines exclude the terminator and one optional trailing `\r`.
#[derive(Debug, Default)]
pub struct LineReader {
    buf: BytesMut,
    /// Bytes at the front of `buf` already searched for `\n`.
    scanned: usize,
    /// Number of lines yielded so far.
    lines: usize,
}

impl LineReader {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and iterate the lines it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Lines<'_> {
        self.extend(chunk);
        Lines { reader: self }
    }

    /// Append a chunk without taking lines; pair with [`LineReader::next_line`].
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Take the next complete line, if one is buffered.
    pub fn next_line(&mut self) -> Option<Bytes> {
        let pos = self.buf[self.scanned..].iter().position(|&b| b == b'\n');
        match pos {
            Some(offset) => {
                let end = self.scanned + offset;
                let line = self.buf.split_to(end + 1).freeze();
                self.scanned = 0;
                self.lines += 1;
                Some(strip_terminator(line))
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// End of input: return the unterminated tail, if non-empty.
    pub fn finish(&mut self) -> Option<Bytes> {
        self.scanned = 0;
        if self.buf.is_empty() {
            return None;
        }
        self.lines += 1;
        let tail = self.buf.split().freeze();
        Some(strip_terminator(tail))
    }

    /// 1-based number of the most recently yielded line.
    pub fn line_number(&self) -> usize {
        self.lines
    }

    /// Bytes buffered but not yet yielded.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn strip_terminator(mut line: Bytes) -> Bytes {
    if line.last() == Some(&b'\n') {
        line.truncate(line.len() - 1);
    }
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    line
}

/// Iterator over the lines completed by one [`LineReader::push`].
pub struct Lines<'a> {
    reader: &'a mut LineReader,
}

impl Iterator for Lines<'_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_line()
    }
}
