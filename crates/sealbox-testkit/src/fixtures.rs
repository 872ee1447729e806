//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::PathBuf;

use sealbox::{Identity, Profile, RecipientCandidate, Result, Sealbox, SealboxConfig};
use sealbox_core::Keypair;
use tempfile::TempDir;

/// A test fixture: one identity, a scratch directory and a [`Sealbox`].
pub struct TestFixture {
    pub identity: Identity,
    pub sealbox: Sealbox,
    dir: TempDir,
}

impl TestFixture {
    /// Create a new test fixture with a random identity.
    pub fn new() -> Self {
        Self::with_identity(Identity::generate(Profile::new("alice", "alice@example.com")))
    }

    /// Create with a deterministic identity from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::with_identity(seeded_identity(seed, "alice"))
    }

    /// Create around an existing identity.
    pub fn with_identity(identity: Identity) -> Self {
        Self::with_config(identity, SealboxConfig::default())
    }

    /// Create with a specific configuration.
    pub fn with_config(identity: Identity, config: SealboxConfig) -> Self {
        Self {
            identity,
            sealbox: Sealbox::new(config),
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    /// A path inside the scratch directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// The fixture identity's invite.
    pub fn invite(&self) -> RecipientCandidate {
        self.identity.invite()
    }

    /// Seal `plaintext` into `name` with the fixture identity as sole
    /// recipient.
    pub async fn seal(&self, name: &str, plaintext: &[u8]) -> Result<PathBuf> {
        let path = self.path(name);
        self.sealbox
            .write(&path, &self.identity, &mut &plaintext[..])
            .await?;
        Ok(path)
    }

    /// Decrypt `name` as `identity`.
    pub async fn open_as(&self, name: &str, identity: &Identity) -> Result<Vec<u8>> {
        self.sealbox.read_to_vec(self.path(name), identity).await
    }

    /// Names of the files currently in the scratch directory.
    pub fn entries(&self) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(self.dir.path())
            .expect("failed to read temp dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A deterministic identity named `name`.
pub fn seeded_identity(seed: [u8; 32], name: &str) -> Identity {
    Identity::from_keypair(
        Keypair::from_seed(&seed),
        Profile::new(name, format!("{name}@example.com")),
    )
}

/// Create multiple identities for multi-party tests.
pub fn multi_party_identities(count: usize) -> Vec<Identity> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[1] = 1;
            seeded_identity(seed, &format!("party{i}"))
        })
        .collect()
}
