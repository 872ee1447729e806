//! Contact book: aliases for known recipient candidates.
//!
//! Every candidate is verified before it is stored, so anything resolved
//! from a contact book can be handed straight to a recipient mutation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use sealbox_core::RecipientCandidate;

use crate::atomic::replace_file;
use crate::error::{Result, StoreError};

/// Alias to candidate, ordered by alias.
pub type Contacts = BTreeMap<String, RecipientCandidate>;

/// Named recipient candidates.
#[async_trait]
pub trait ContactBook: Send + Sync {
    /// All contacts, ordered by alias.
    async fn list(&self) -> Result<Vec<(String, RecipientCandidate)>>;

    /// Add a verified contact. An existing alias is replaced only if `force`.
    async fn add(&self, alias: &str, candidate: RecipientCandidate, force: bool) -> Result<()>;

    /// Remove a contact, returning it.
    async fn remove(&self, alias: &str) -> Result<RecipientCandidate>;

    /// Look up by alias, falling back to an exact email match.
    async fn resolve(&self, alias_or_email: &str) -> Result<RecipientCandidate>;
}

fn insert(
    contacts: &mut Contacts,
    alias: &str,
    candidate: RecipientCandidate,
    force: bool,
) -> Result<()> {
    candidate.verify()?;
    if !force && contacts.contains_key(alias) {
        return Err(StoreError::AliasExists(alias.to_string()));
    }
    contacts.insert(alias.to_string(), candidate);
    Ok(())
}

fn lookup(contacts: &Contacts, alias_or_email: &str) -> Result<RecipientCandidate> {
    contacts
        .get(alias_or_email)
        .or_else(|| contacts.values().find(|c| c.email == alias_or_email))
        .cloned()
        .ok_or_else(|| StoreError::AliasNotFound(alias_or_email.to_string()))
}

/// Contact book persisted as a pretty JSON object.
///
/// The file is re-read on every call so edits by other processes are seen.
/// Writes within this process are serialized, and each write replaces the
/// whole file through a temporary sibling.
#[derive(Debug)]
pub struct FileContactBook {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileContactBook {
    /// Store contacts at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Contacts> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(Contacts::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Contacts::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, contacts: &Contacts) -> Result<()> {
        let mut json = serde_json::to_string_pretty(contacts)?;
        json.push('\n');
        replace_file(&self.path, json.as_bytes(), false).await?;
        Ok(())
    }
}

#[async_trait]
impl ContactBook for FileContactBook {
    async fn list(&self) -> Result<Vec<(String, RecipientCandidate)>> {
        Ok(self.read().await?.into_iter().collect())
    }

    async fn add(&self, alias: &str, candidate: RecipientCandidate, force: bool) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut contacts = self.read().await?;
        let key = candidate.public_key.fingerprint();
        insert(&mut contacts, alias, candidate, force)?;
        self.write(&contacts).await?;
        info!(alias, key = %key, "added contact");
        Ok(())
    }

    async fn remove(&self, alias: &str) -> Result<RecipientCandidate> {
        let _guard = self.write_lock.lock().await;
        let mut contacts = self.read().await?;
        let removed = contacts
            .remove(alias)
            .ok_or_else(|| StoreError::AliasNotFound(alias.to_string()))?;
        self.write(&contacts).await?;
        info!(alias, "removed contact");
        Ok(removed)
    }

    async fn resolve(&self, alias_or_email: &str) -> Result<RecipientCandidate> {
        let candidate = lookup(&self.read().await?, alias_or_email)?;
        debug!(
            name = alias_or_email,
            key = %candidate.public_key.fingerprint(),
            "resolved contact"
        );
        Ok(candidate)
    }
}

/// In-memory contact book for tests.
#[derive(Debug, Default)]
pub struct MemoryContactBook {
    inner: RwLock<Contacts>,
}

impl MemoryContactBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactBook for MemoryContactBook {
    async fn list(&self) -> Result<Vec<(String, RecipientCandidate)>> {
        Ok(self
            .inner
            .read()
            .await
            .iter()
            .map(|(alias, c)| (alias.clone(), c.clone()))
            .collect())
    }

    async fn add(&self, alias: &str, candidate: RecipientCandidate, force: bool) -> Result<()> {
        insert(&mut *self.inner.write().await, alias, candidate, force)
    }

    async fn remove(&self, alias: &str) -> Result<RecipientCandidate> {
        self.inner
            .write()
            .await
            .remove(alias)
            .ok_or_else(|| StoreError::AliasNotFound(alias.to_string()))
    }

    async fn resolve(&self, alias_or_email: &str) -> Result<RecipientCandidate> {
        lookup(&*self.inner.read().await, alias_or_email)
    }
}
