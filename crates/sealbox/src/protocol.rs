//! Sealbox: open, decrypt, reseal and re-recipient envelope files.
//!
//! Every operation takes the acting [`Identity`] explicitly. An envelope is
//! used linearly: open (verify + unwrap), then decrypt or reseal. Signatures
//! are verified once, at open; nothing is decrypted before they pass.
//!
//! Writes never touch the target until the new envelope is complete. Output
//! goes to a hidden sibling that is synced and renamed into place.

use std::path::Path;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use sealbox_core::{EnvelopeMetadata, Identity, PublicKey, RecipientCandidate, RecipientEntry};
use sealbox_perms::{candidates, seal_for, unwrap_content_key, verify_all, ContentKey};
use sealbox_store::ContactBook;

use crate::config::SealboxConfig;
use crate::error::{Result, SealboxError};
use crate::stream::{read_metadata, EnvelopeWriter, PlaintextReader, StagedFile};

/// An opened envelope: verified metadata and the recovered content key.
#[derive(Debug)]
pub struct Opened {
    pub metadata: EnvelopeMetadata,
    pub content_key: ContentKey,
    /// False when the file did not exist and fresh metadata was minted.
    pub existed: bool,
}

/// A change to an envelope's recipient set.
#[derive(Debug, Default, Clone)]
pub struct RecipientChange {
    /// Recipient to add; replaces an existing entry with the same key.
    pub add: Option<RecipientCandidate>,
    /// Recipient to remove, by public key.
    pub remove: Option<PublicKey>,
}

impl RecipientChange {
    /// Add `candidate`.
    pub fn add(candidate: RecipientCandidate) -> Self {
        Self {
            add: Some(candidate),
            remove: None,
        }
    }

    /// Remove the recipient holding `public_key`.
    pub fn remove(public_key: PublicKey) -> Self {
        Self {
            add: None,
            remove: Some(public_key),
        }
    }

    /// Apply to a recipient list.
    fn apply(self, mut recipients: Vec<RecipientCandidate>) -> Result<Vec<RecipientCandidate>> {
        if let Some(key) = self.remove {
            let before = recipients.len();
            recipients.retain(|c| c.public_key != key);
            if recipients.len() == before {
                return Err(SealboxError::InvalidOperation(format!(
                    "{} is not a recipient",
                    key.fingerprint()
                )));
            }
        }

        if let Some(candidate) = self.add {
            match recipients
                .iter_mut()
                .find(|c| c.public_key == candidate.public_key)
            {
                Some(existing) => *existing = candidate,
                None => recipients.push(candidate),
            }
        }

        if recipients.is_empty() {
            return Err(SealboxError::InvalidOperation(
                "cannot remove the last recipient".into(),
            ));
        }
        Ok(recipients)
    }
}

/// The envelope protocol.
#[derive(Debug, Clone, Default)]
pub struct Sealbox {
    config: SealboxConfig,
}

impl Sealbox {
    /// Create with the given configuration.
    pub fn new(config: SealboxConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SealboxConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Opening
    // ─────────────────────────────────────────────────────────────────────────

    /// Read and verify an envelope's metadata without unwrapping anything.
    pub async fn inspect(&self, path: impl AsRef<Path>) -> Result<EnvelopeMetadata> {
        let metadata = read_metadata(path.as_ref(), self.config.read_buffer_size).await?;
        verify_all(&metadata)?;
        Ok(metadata)
    }

    /// Open an existing envelope for `identity`.
    ///
    /// Fails with `Format` on bad framing, `InvalidSignature` if any
    /// signature fails, `AccessDenied` if the identity is not a recipient.
    pub async fn open(&self, path: impl AsRef<Path>, identity: &Identity) -> Result<Opened> {
        let path = path.as_ref();
        let metadata = self.inspect(path).await?;
        let content_key = unwrap_content_key(&metadata, identity)?;

        tracing::debug!(
            path = %path.display(),
            recipients = metadata.recipients.len(),
            ephemeral = %metadata.ephemeral_public.fingerprint(),
            "opened envelope"
        );

        Ok(Opened {
            metadata,
            content_key,
            existed: true,
        })
    }

    /// Open `path`, or mint fresh metadata with `identity` as sole recipient
    /// if it does not exist. Nothing is written in the latter case.
    pub async fn open_or_create(
        &self,
        path: impl AsRef<Path>,
        identity: &Identity,
    ) -> Result<Opened> {
        let path = path.as_ref();
        match tokio::fs::metadata(path).await {
            Ok(_) => self.open(path, identity).await,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let sealed = seal_for(&[identity.invite()])?;
                tracing::debug!(
                    path = %path.display(),
                    ephemeral = %sealed.metadata.ephemeral_public.fingerprint(),
                    "created envelope metadata"
                );
                Ok(Opened {
                    metadata: sealed.metadata,
                    content_key: sealed.content_key,
                    existed: false,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Body streaming
    // ─────────────────────────────────────────────────────────────────────────

    /// Decrypt the body of `path` into `sink`, returning the plaintext length.
    ///
    /// `metadata` must be the verified metadata from [`Sealbox::open`]; the
    /// file's own metadata must still match it.
    pub async fn decrypt_to<W>(
        &self,
        path: impl AsRef<Path>,
        metadata: &EnvelopeMetadata,
        content_key: &ContentKey,
        sink: &mut W,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut reader = PlaintextReader::open(
            path.as_ref(),
            metadata,
            content_key,
            self.config.read_buffer_size,
        )
        .await?;

        let mut written = 0u64;
        while let Some(plaintext) = reader.next().await? {
            sink.write_all(&plaintext).await?;
            written += plaintext.len() as u64;
        }
        sink.flush().await?;
        Ok(written)
    }

    /// Encrypt everything from `source` into an envelope at `path`.
    ///
    /// `path` is replaced only after the whole envelope has been written and
    /// synced; on any error it is left untouched.
    pub async fn encrypt_from<R>(
        &self,
        path: impl AsRef<Path>,
        metadata: &EnvelopeMetadata,
        content_key: &ContentKey,
        source: &mut R,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let (staged, file) = StagedFile::create(path.as_ref()).await?;
        let mut writer =
            EnvelopeWriter::start(file, metadata, content_key, self.config.chunk_size).await?;

        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];
        loop {
            let n = source.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            writer.write(&buf[..n]).await?;
        }

        staged.commit(writer.finish().await?).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Convenience flows
    // ─────────────────────────────────────────────────────────────────────────

    /// Open and decrypt a whole file into memory.
    pub async fn read_to_vec(&self, path: impl AsRef<Path>, identity: &Identity) -> Result<Vec<u8>> {
        let path = path.as_ref();
        let opened = self.open(path, identity).await?;
        let mut plaintext = Vec::new();
        self.decrypt_to(path, &opened.metadata, &opened.content_key, &mut plaintext)
            .await?;
        Ok(plaintext)
    }

    /// Replace the plaintext of `path`, creating it if needed.
    ///
    /// The recipient set is kept; the content key and ephemeral key are
    /// fresh. Returns the new metadata.
    pub async fn write<R>(
        &self,
        path: impl AsRef<Path>,
        identity: &Identity,
        source: &mut R,
    ) -> Result<EnvelopeMetadata>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let path = path.as_ref();
        let opened = self.open_or_create(path, identity).await?;
        let sealed = if opened.existed {
            seal_for(&candidates(&opened.metadata))?
        } else {
            sealbox_perms::Sealed {
                metadata: opened.metadata,
                content_key: opened.content_key,
            }
        };

        self.encrypt_from(path, &sealed.metadata, &sealed.content_key, source)
            .await?;

        tracing::info!(
            path = %path.display(),
            recipients = sealed.metadata.recipients.len(),
            ephemeral = %sealed.metadata.ephemeral_public.fingerprint(),
            "wrote envelope"
        );
        Ok(sealed.metadata)
    }

    /// Verified recipients of `path`. The identity must be one of them.
    pub async fn list_recipients(
        &self,
        path: impl AsRef<Path>,
        identity: &Identity,
    ) -> Result<Vec<RecipientEntry>> {
        Ok(self.open(path, identity).await?.metadata.recipients)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Recipient mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply `change` and reseal `path` for the resulting recipients.
    ///
    /// The content key and ephemeral key always change. The old body is
    /// streamed through decryption straight into the new envelope; plaintext
    /// is never written to disk.
    pub async fn mutate_recipients(
        &self,
        path: impl AsRef<Path>,
        identity: &Identity,
        change: RecipientChange,
    ) -> Result<EnvelopeMetadata> {
        let path = path.as_ref();
        let opened = self.open(path, identity).await?;
        let recipients = change.apply(candidates(&opened.metadata))?;
        self.reseal(path, &opened, &recipients).await
    }

    /// Add `candidate` as a recipient of `path`.
    pub async fn add_recipient(
        &self,
        path: impl AsRef<Path>,
        identity: &Identity,
        candidate: RecipientCandidate,
    ) -> Result<EnvelopeMetadata> {
        self.mutate_recipients(path, identity, RecipientChange::add(candidate))
            .await
    }

    /// Remove the recipient holding `public_key` from `path`.
    pub async fn remove_recipient(
        &self,
        path: impl AsRef<Path>,
        identity: &Identity,
        public_key: &PublicKey,
    ) -> Result<EnvelopeMetadata> {
        self.mutate_recipients(path, identity, RecipientChange::remove(*public_key))
            .await
    }

    /// Add the contact named `alias_or_email` as a recipient of `path`.
    pub async fn add_contact<C>(
        &self,
        path: impl AsRef<Path>,
        identity: &Identity,
        contacts: &C,
        alias_or_email: &str,
    ) -> Result<EnvelopeMetadata>
    where
        C: ContactBook + ?Sized,
    {
        let candidate = contacts.resolve(alias_or_email).await?;
        self.add_recipient(path, identity, candidate).await
    }

    /// Remove the contact named `alias_or_email` from the recipients of `path`.
    pub async fn remove_contact<C>(
        &self,
        path: impl AsRef<Path>,
        identity: &Identity,
        contacts: &C,
        alias_or_email: &str,
    ) -> Result<EnvelopeMetadata>
    where
        C: ContactBook + ?Sized,
    {
        let candidate = contacts.resolve(alias_or_email).await?;
        self.remove_recipient(path, identity, &candidate.public_key)
            .await
    }

    async fn reseal(
        &self,
        path: &Path,
        opened: &Opened,
        recipients: &[RecipientCandidate],
    ) -> Result<EnvelopeMetadata> {
        let sealed = seal_for(recipients)?;

        let mut reader = PlaintextReader::open(
            path,
            &opened.metadata,
            &opened.content_key,
            self.config.read_buffer_size,
        )
        .await?;
        let (staged, file) = StagedFile::create(path).await?;
        let mut writer = EnvelopeWriter::start(
            file,
            &sealed.metadata,
            &sealed.content_key,
            self.config.chunk_size,
        )
        .await?;

        while let Some(plaintext) = reader.next().await? {
            writer.write(&plaintext).await?;
        }
        // The source must be closed before it can be replaced on every platform.
        drop(reader);
        staged.commit(writer.finish().await?).await?;

        tracing::info!(
            path = %path.display(),
            recipients = sealed.metadata.recipients.len(),
            ephemeral = %sealed.metadata.ephemeral_public.fingerprint(),
            "resealed envelope"
        );
        Ok(sealed.metadata)
    }
}
