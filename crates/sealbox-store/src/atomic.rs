//! Whole-file replacement through a temporary sibling.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Write `contents` to a sibling of `path`, sync it, then rename it over
/// `path`. A failure at any point leaves `path` as it was.
///
/// With `private` set the new file is readable by its owner only (unix),
/// whatever mode the file it replaces had.
pub(crate) async fn replace_file(path: &Path, contents: &[u8], private: bool) -> io::Result<()> {
    let tmp = temp_path(path);
    let result = match write_synced(&tmp, contents, private).await {
        Ok(()) => tokio::fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&tmp).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %tmp.display(), "failed to remove temporary file: {}", e);
            }
        }
    }
    result
}

#[cfg_attr(not(unix), allow(unused_variables))]
async fn write_synced(tmp: &Path, contents: &[u8], private: bool) -> io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    if private {
        options.mode(0o600);
    }
    let mut file = options.open(tmp).await?;

    // A leftover temp file keeps its old mode through `create`.
    #[cfg(unix)]
    if private {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }

    file.write_all(contents).await?;
    file.sync_all().await?;
    Ok(())
}

/// `dir/name` becomes `dir/name.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_temp_path() {
        assert_eq!(
            temp_path(Path::new("/home/a/.sealbox")),
            PathBuf::from("/home/a/.sealbox.tmp")
        );
    }

    #[tokio::test]
    async fn test_replace_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book");
        tokio::fs::write(&path, b"old contents").await.unwrap();

        replace_file(&path, b"new", false).await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"new");
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_failed_rename_keeps_target() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be replaced by a file.
        let path = dir.path().join("occupied");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        assert!(replace_file(&path, b"data", false).await.is_err());
        assert!(path.join("keep").exists());
        assert!(!temp_path(&path).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_private_over_stale_temp() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret");
        let tmp = temp_path(&path);
        std::fs::write(&tmp, b"stale").unwrap();
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o644)).unwrap();

        replace_file(&path, b"seed", true).await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
