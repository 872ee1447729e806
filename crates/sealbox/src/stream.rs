//! Streaming envelope I/O.
//!
//! [`PlaintextReader`] pulls an envelope file through the decoder and the
//! cipher, yielding plaintext a piece at a time. [`EnvelopeWriter`] does the
//! reverse into an open file. [`StagedFile`] gives the writer a temporary
//! sibling that replaces the target only on [`StagedFile::commit`].

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};

use sealbox_codec::{EnvelopeDecoder, EnvelopeEncoder, Event, MAX_CHUNK_LEN};
use sealbox_core::EnvelopeMetadata;
use sealbox_perms::{ContentKey, Iv, StreamDecryptor, StreamEncryptor, BLOCK_SIZE};

use crate::error::{Result, SealboxError};

/// Read only as far as the metadata block.
pub(crate) async fn read_metadata(path: &Path, buffer_size: usize) -> Result<EnvelopeMetadata> {
    let mut file = File::open(path).await?;
    let mut decoder = EnvelopeDecoder::new();
    let mut buf = vec![0u8; buffer_size.max(1)];
    loop {
        let n = file.read(&mut buf).await?;
        let events = if n == 0 {
            decoder.finish()?
        } else {
            decoder.feed(&buf[..n])?
        };
        for event in events {
            if let Event::Metadata(metadata) = event {
                return Ok(metadata);
            }
        }
        if n == 0 {
            return Err(SealboxError::Format("envelope has no metadata".into()));
        }
    }
}

/// Decrypting reader over an envelope file.
pub(crate) struct PlaintextReader {
    file: File,
    decoder: EnvelopeDecoder,
    /// `None` once the final block has been produced.
    decryptor: Option<StreamDecryptor>,
    expected: EnvelopeMetadata,
    buf: Vec<u8>,
}

impl PlaintextReader {
    /// Open `path` for decryption under metadata that has already been
    /// verified. The file's metadata must match it exactly.
    pub(crate) async fn open(
        path: &Path,
        metadata: &EnvelopeMetadata,
        content_key: &ContentKey,
        buffer_size: usize,
    ) -> Result<Self> {
        let iv = Iv::derive(&metadata.ephemeral_public);
        Ok(Self {
            file: File::open(path).await?,
            decoder: EnvelopeDecoder::new(),
            decryptor: Some(StreamDecryptor::new(content_key, &iv)),
            expected: metadata.clone(),
            buf: vec![0u8; buffer_size.max(1)],
        })
    }

    /// The next piece of plaintext, or `None` after the last.
    ///
    /// Pieces may be empty; only `None` means the body is exhausted.
    pub(crate) async fn next(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if self.decryptor.is_none() {
                return Ok(None);
            }

            let n = self.file.read(&mut self.buf).await?;
            let events = if n == 0 {
                self.decoder.finish()?
            } else {
                self.decoder.feed(&self.buf[..n])?
            };

            let mut out = Vec::new();
            for event in events {
                match event {
                    Event::Metadata(found) => {
                        if found != self.expected {
                            return Err(SealboxError::Format(
                                "envelope changed since it was opened".into(),
                            ));
                        }
                    }
                    Event::Chunk(chunk) => {
                        if let Some(decryptor) = self.decryptor.as_mut() {
                            out.extend(decryptor.update(&chunk));
                        }
                    }
                }
            }

            if n == 0 {
                if let Some(decryptor) = self.decryptor.take() {
                    out.extend(decryptor.finalize().map_err(sealbox_perms::PermsError::from)?);
                }
                return Ok(Some(out));
            }
            if !out.is_empty() {
                return Ok(Some(out));
            }
        }
    }
}

/// Largest plaintext chunk per body line. A line carries up to two blocks
/// more ciphertext than plaintext.
const MAX_PLAINTEXT_CHUNK: usize = MAX_CHUNK_LEN - 2 * BLOCK_SIZE;

/// Encrypting writer producing one envelope.
pub(crate) struct EnvelopeWriter {
    out: BufWriter<File>,
    encryptor: StreamEncryptor,
    pending: Vec<u8>,
    chunk_size: usize,
}

impl EnvelopeWriter {
    /// Write the header and metadata block; the body follows via `write`.
    pub(crate) async fn start(
        file: File,
        metadata: &EnvelopeMetadata,
        content_key: &ContentKey,
        chunk_size: usize,
    ) -> Result<Self> {
        let mut out = BufWriter::new(file);
        out.write_all(EnvelopeEncoder::header(metadata)?.as_bytes())
            .await?;
        let iv = Iv::derive(&metadata.ephemeral_public);
        Ok(Self {
            out,
            encryptor: StreamEncryptor::new(content_key, &iv),
            pending: Vec::new(),
            chunk_size: chunk_size.clamp(1, MAX_PLAINTEXT_CHUNK),
        })
    }

    /// Encrypt plaintext, emitting one body line per full chunk.
    pub(crate) async fn write(&mut self, plaintext: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(plaintext);
        while self.pending.len() >= self.chunk_size {
            let ciphertext = self.encryptor.update(&self.pending[..self.chunk_size]);
            self.pending.drain(..self.chunk_size);
            self.emit(&ciphertext).await?;
        }
        Ok(())
    }

    /// Finalize the cipher and flush, handing back the file for syncing.
    pub(crate) async fn finish(mut self) -> Result<File> {
        let mut ciphertext = self.encryptor.update(&self.pending);
        ciphertext.extend(self.encryptor.finalize());
        if !ciphertext.is_empty() {
            self.out
                .write_all(EnvelopeEncoder::body_line(&ciphertext).as_bytes())
                .await?;
        }
        self.out.flush().await?;
        Ok(self.out.into_inner())
    }

    async fn emit(&mut self, ciphertext: &[u8]) -> Result<()> {
        if ciphertext.is_empty() {
            return Ok(());
        }
        self.out
            .write_all(EnvelopeEncoder::body_line(ciphertext).as_bytes())
            .await?;
        Ok(())
    }
}

/// A temporary sibling of `target` that replaces it on commit.
///
/// Dropping without committing removes the temporary file, so a failed or
/// cancelled write never disturbs the target.
pub(crate) struct StagedFile {
    tmp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Create (or truncate) the temporary file.
    pub(crate) async fn create(target: &Path) -> Result<(Self, File)> {
        let tmp = temp_path(target);
        let file = File::create(&tmp).await?;
        let staged = Self {
            tmp,
            target: target.to_path_buf(),
            committed: false,
        };
        Ok((staged, file))
    }

    /// Sync the temporary file and rename it over the target.
    pub(crate) async fn commit(mut self, file: File) -> Result<()> {
        file.sync_all().await?;
        drop(file);
        if let Ok(existing) = tokio::fs::metadata(&self.target).await {
            tokio::fs::set_permissions(&self.tmp, existing.permissions()).await?;
        }
        tokio::fs::rename(&self.tmp, &self.target).await?;
        self.committed = true;
        Ok(())
    }

    /// The temporary path.
    pub(crate) fn path(&self) -> &Path {
        &self.tmp
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.tmp) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.tmp.display(),
                    "failed to remove temporary file: {}",
                    e
                );
            }
        }
    }
}

/// `dir/name.ext` becomes `dir/.name.sealbox-tmp.ext`.
pub(crate) fn temp_path(target: &Path) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!(".{stem}.sealbox-tmp");
    if let Some(ext) = target.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    target.with_file_name(name)
}
