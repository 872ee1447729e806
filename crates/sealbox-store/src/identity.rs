//! Identity persistence.
//!
//! The identity file holds the secret seed, so it is written with mode 0600
//! on unix and never overwritten unless the caller asks. An overwrite goes
//! through a temporary sibling, so the old identity survives a failed save.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::debug;

use sealbox_core::encoding::{array_from_base64, to_base64};
use sealbox_core::{Identity, Profile, Signature, SECRET_KEY_SIZE};

use crate::atomic::replace_file;
use crate::error::{Result, StoreError};

/// Persistent storage for the local identity.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Load and verify the stored identity.
    async fn load(&self) -> Result<Identity>;

    /// Persist `identity`. Fails with `IdentityExists` if one is already
    /// stored and `overwrite` is false, and with `CoreError::InvalidProfile`
    /// if the profile does not validate.
    async fn save(&self, identity: &Identity, overwrite: bool) -> Result<()>;
}

/// On-disk form of an identity.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredIdentity {
    handle: String,
    email: String,
    sig: Signature,
    key: String,
}

impl StoredIdentity {
    fn from_identity(identity: &Identity) -> Self {
        Self {
            handle: identity.profile().handle.clone(),
            email: identity.profile().email.clone(),
            sig: *identity.signature(),
            key: to_base64(&identity.seed()),
        }
    }

    fn into_identity(self) -> Result<Identity> {
        let seed: [u8; SECRET_KEY_SIZE] = array_from_base64(&self.key)?;
        Identity::from_parts(&seed, Profile::new(self.handle, self.email), self.sig)
            .map_err(|e| StoreError::InvalidIdentity(e.to_string()))
    }
}

/// Identity stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    /// Store the identity at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    async fn load(&self) -> Result<Identity> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NoIdentity(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        let stored: StoredIdentity = serde_json::from_str(&text)?;
        let identity = stored.into_identity()?;
        debug!(
            path = %self.path.display(),
            key = %identity.public_key().fingerprint(),
            "loaded identity"
        );
        Ok(identity)
    }

    async fn save(&self, identity: &Identity, overwrite: bool) -> Result<()> {
        identity.profile().validate()?;
        let mut json = serde_json::to_string_pretty(&StoredIdentity::from_identity(identity))?;
        json.push('\n');

        if overwrite {
            replace_file(&self.path, json.as_bytes(), true).await?;
        } else {
            let mut options = tokio::fs::OpenOptions::new();
            options.write(true).create_new(true);
            #[cfg(unix)]
            options.mode(0o600);

            let mut file = match options.open(&self.path).await {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    return Err(StoreError::IdentityExists(self.path.clone()))
                }
                Err(e) => return Err(e.into()),
            };
            file.write_all(json.as_bytes()).await?;
            file.sync_all().await?;
        }

        debug!(
            path = %self.path.display(),
            key = %identity.public_key().fingerprint(),
            "saved identity"
        );
        Ok(())
    }
}

/// In-memory identity store for tests.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    inner: RwLock<Option<Identity>>,
}

impl MemoryIdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn load(&self) -> Result<Identity> {
        self.inner
            .read()
            .await
            .clone()
            .ok_or_else(|| StoreError::NoIdentity(PathBuf::from("<memory>")))
    }

    async fn save(&self, identity: &Identity, overwrite: bool) -> Result<()> {
        identity.profile().validate()?;
        let mut inner = self.inner.write().await;
        if inner.is_some() && !overwrite {
            return Err(StoreError::IdentityExists(PathBuf::from("<memory>")));
        }
        *inner = Some(identity.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbox_core::CoreError;
    use tempfile::TempDir;

    fn alice() -> Identity {
        Identity::generate(Profile::new("alice", "alice@example.com"))
    }

    #[tokio::test]
    async fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileIdentityStore::new(dir.path().join(".sealbox"));
        let id = alice();

        store.save(&id, false).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.public_key(), id.public_key());
        assert_eq!(loaded.profile(), id.profile());
        assert_eq!(loaded.seed(), id.seed());
    }

    #[tokio::test]
    async fn test_file_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = FileIdentityStore::new(dir.path().join(".sealbox"));
        let first = alice();
        store.save(&first, false).await.unwrap();

        let second = alice();
        assert!(matches!(
            store.save(&second, false).await,
            Err(StoreError::IdentityExists(_))
        ));
        assert_eq!(store.load().await.unwrap().public_key(), first.public_key());

        store.save(&second, true).await.unwrap();
        assert_eq!(store.load().await.unwrap().public_key(), second.public_key());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = FileIdentityStore::new(dir.path().join("nope"));
        assert!(matches!(store.load().await, Err(StoreError::NoIdentity(_))));
    }

    #[tokio::test]
    async fn test_tampered_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".sealbox");
        let store = FileIdentityStore::new(&path);
        store.save(&alice(), false).await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let text = text.replace("alice@example.com", "mallory@example.com");
        tokio::fs::write(&path, text).await.unwrap();

        assert!(matches!(
            store.load().await,
            Err(StoreError::InvalidIdentity(_))
        ));
    }

    #[tokio::test]
    async fn test_file_format_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".sealbox");
        FileIdentityStore::new(&path)
            .save(&alice(), false)
            .await
            .unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["email", "handle", "key", "sig"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".sealbox");
        FileIdentityStore::new(&path)
            .save(&alice(), false)
            .await
            .unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_overwrite_tightens_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".sealbox");
        std::fs::write(&path, b"{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let id = alice();
        let store = FileIdentityStore::new(&path);
        store.save(&id, true).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().await.unwrap().public_key(), id.public_key());
    }

    #[tokio::test]
    async fn test_invalid_profile_not_saved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".sealbox");
        let store = FileIdentityStore::new(&path);

        for profile in [
            Profile::new("", "alice@example.com"),
            Profile::new("alice", "not-an-email"),
        ] {
            let id = Identity::generate(profile);
            assert!(matches!(
                store.save(&id, false).await,
                Err(StoreError::Core(CoreError::InvalidProfile(_)))
            ));
            assert!(matches!(
                store.save(&id, true).await,
                Err(StoreError::Core(CoreError::InvalidProfile(_)))
            ));
        }
        assert!(!path.exists());

        let memory = MemoryIdentityStore::new();
        let id = Identity::generate(Profile::new("", "nobody@example.com"));
        assert!(memory.save(&id, false).await.is_err());
        assert!(matches!(memory.load().await, Err(StoreError::NoIdentity(_))));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryIdentityStore::new();
        assert!(matches!(store.load().await, Err(StoreError::NoIdentity(_))));

        let id = alice();
        store.save(&id, false).await.unwrap();
        assert!(store.save(&alice(), false).await.is_err());
        assert_eq!(store.load().await.unwrap().public_key(), id.public_key());
    }
}
