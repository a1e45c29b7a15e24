//! Local filesystem storage backend.
//!
//! Directories live under a configured root and are accessed through
//! `tokio::fs` for async I/O.

use crate::backend::NameStream;
use crate::error::{ErrorKind, Result};
use crate::{StorageBackend, path::validate as validate_name};
use async_stream::stream;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

/// Local filesystem storage backend.
///
/// # Examples
///
/// ```no_run
/// use bilirename_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("downloads", "/home/me/Videos/bilibili").map_err(|e| e.to_string())?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalBackend {
    name: String,
    /// Directory containing the identifier directories
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidName`](ErrorKind::InvalidName) if the root is not
    /// absolute or is not a directory, and [`NotFound`](ErrorKind::NotFound)
    /// if it does not exist. The root is never created: there would be
    /// nothing in it to rename.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidName(root));
        }
        if !root.exists() {
            exn::bail!(ErrorKind::NotFound(root));
        }
        if !root.is_dir() {
            exn::bail!(ErrorKind::InvalidName(root));
        }
        Ok(Self { name: name.into(), root })
    }

    /// Validates the name and joins it with the root directory.
    fn absolute_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_name(name)?))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::AlreadyExists | std::io::ErrorKind::DirectoryNotEmpty => {
                ErrorKind::AlreadyExists(path.to_path_buf())
            },
            _ => ErrorKind::Io(e),
        }
    }

    /// Returns the directory name of an entry, or `None` for anything that
    /// should not be listed.
    async fn process_entry(&self, entry: DirEntry) -> Result<Option<String>> {
        let path = entry.path();
        // Symlinks are not followed, the same as the directory walk that
        // produced the downloads in the first place.
        let file_type = entry.file_type().await.map_err(|e| Self::map_io_error(e, &path))?;
        if !file_type.is_dir() {
            return Ok(None);
        }
        match entry.file_name().into_string() {
            Ok(name) => Ok(Some(name)),
            Err(raw) => {
                tracing::warn!(name = ?raw, "Skipping directory with a non UTF-8 name");
                Ok(None)
            },
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream(&self) -> NameStream<'_> {
        Box::pin(stream! {
            let mut entries = match fs::read_dir(&self.root).await {
                Ok(entries) => entries,
                Err(err) => {
                    yield Err(exn::Exn::from(Self::map_io_error(err, &self.root)));
                    return;
                },
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &self.root))); continue; },
                };
                match self.process_entry(entry).await {
                    Ok(Some(name)) => yield Ok(name),
                    Ok(None) => {},
                    Err(e) => yield Err(e),
                }
            }
        })
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.absolute_path(from)?;
        let to_path = self.absolute_path(to)?;
        if !fs::try_exists(&from_path).await.map_err(ErrorKind::Io)? {
            exn::bail!(ErrorKind::NotFound(from_path));
        }
        // `rename(2)` happily replaces an empty directory; refuse up front.
        if fs::try_exists(&to_path).await.map_err(ErrorKind::Io)? {
            exn::bail!(ErrorKind::AlreadyExists(to_path));
        }
        Ok(fs::rename(&from_path, &to_path).await.map_err(|e| Self::map_io_error(e, &to_path))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_absolute_existing_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("name", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("name", "relative/path").is_err());
        let err = LocalBackend::new("name", temp_dir.path().join("missing")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        std::fs::write(temp_dir.path().join("file"), b"data").unwrap();
        let err = LocalBackend::new("name", temp_dir.path().join("file")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_list_only_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp_dir.path().join("300")).unwrap();
        std::fs::create_dir(temp_dir.path().join("100")).unwrap();
        std::fs::create_dir_all(temp_dir.path().join("200/nested")).unwrap();
        std::fs::write(temp_dir.path().join("400"), b"not a directory").unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        assert_eq!(backend.list().await.unwrap(), vec!["100", "200", "300"]);
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        assert!(backend.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rename() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp_dir.path().join("123")).unwrap();
        std::fs::write(temp_dir.path().join("123/video.mp4"), b"data").unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        backend.rename("123", "1-Title").await.unwrap();
        assert!(!temp_dir.path().join("123").exists());
        assert_eq!(std::fs::read(temp_dir.path().join("1-Title/video.mp4")).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_rename_never_overwrites() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp_dir.path().join("123")).unwrap();
        std::fs::create_dir(temp_dir.path().join("taken")).unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let err = backend.rename("123", "taken").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AlreadyExists(_)));
        assert!(temp_dir.path().join("123").is_dir());
    }

    #[tokio::test]
    async fn test_rename_missing_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let err = backend.rename("123", "1-Title").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_path_security() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp_dir.path().join("123")).unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        // Attempts to leave the root, or to nest, should fail
        assert!(backend.rename("123", "../escaped").await.is_err());
        assert!(backend.rename("123", "a/b").await.is_err());
        assert!(backend.rename("..", "x").await.is_err());
        assert!(temp_dir.path().join("123").is_dir());
        assert!(!temp_dir.path().parent().unwrap().join("escaped").exists());
    }
}
