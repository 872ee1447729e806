//! Store configuration.

use std::path::PathBuf;

/// Identity file name under the home directory.
pub const IDENTITY_FILE: &str = ".sealbox";

/// Contact book file name under the home directory.
pub const CONTACTS_FILE: &str = ".sealbox-contacts";

/// Where identities and contacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub identity_path: PathBuf,
    pub contacts_path: PathBuf,
}

impl StoreConfig {
    /// Place both files under `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            identity_path: dir.join(IDENTITY_FILE),
            contacts_path: dir.join(CONTACTS_FILE),
        }
    }
}

impl Default for StoreConfig {
    /// Files in the user's home directory, or the working directory if no
    /// home directory can be determined.
    fn default() -> Self {
        Self::in_dir(dirs::home_dir().unwrap_or_default())
    }
}
