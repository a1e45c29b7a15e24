//! In-memory storage backend for testing.

use super::NameStream;
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_name;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Directory names are stored in a `BTreeSet` behind a [`RwLock`], so all
/// trait methods can operate on `&self` without external synchronisation.
/// Individual renames can be made to fail with
/// [`fail_rename_of`](Self::fail_rename_of) to exercise per-pair error
/// handling.
///
/// # Examples
///
/// ```
/// use bilirename_storage::backend::{MockBackend, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_dirs(["170001", "170002"]);
/// assert_eq!(backend.list().await.map_err(|e| e.to_string())?, vec!["170001", "170002"]);
///
/// backend.rename("170001", "1-Title").await.map_err(|e| e.to_string())?;
/// assert_eq!(backend.dirs().await, vec!["1-Title", "170002"]);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    dirs: RwLock<BTreeSet<String>>,
    failing: HashSet<String>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with directories.
    ///
    /// Panics if any name fails validation. If test setup is wrong, then
    /// test should not pass.
    pub fn with_dirs(dirs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut set = BTreeSet::new();
        for dir in dirs {
            let dir = dir.into();
            if validate_name(&dir).is_err() {
                // The panic here is DELIBERATE. MockBackend is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockBackend::with_dirs: invalid name {dir}");
            }
            set.insert(dir);
        }
        Self {
            name: "mock".to_string(),
            dirs: RwLock::new(set),
            failing: HashSet::new(),
        }
    }

    /// Make every rename whose source is `name` fail with a
    /// [`BackendError`](ErrorKind::BackendError).
    pub fn fail_rename_of(mut self, name: impl Into<String>) -> Self {
        self.failing.insert(name.into());
        self
    }

    /// Snapshot of the current directory names, sorted.
    pub async fn dirs(&self) -> Vec<String> {
        self.dirs.read().await.iter().cloned().collect()
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let dirs: [&str; 0] = [];
        Self::with_dirs(dirs)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream(&self) -> NameStream<'_> {
        Box::pin(async_stream::stream! {
            // Snapshot under the read lock, then drop it before yielding to
            // avoid holding the lock across yield points.
            let names = self.dirs().await;
            for name in names {
                yield Ok(name);
            }
        })
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        validate_name(from)?;
        validate_name(to)?;
        if self.failing.contains(from) {
            exn::bail!(ErrorKind::BackendError(format!("injected failure renaming {from}")));
        }
        let mut guard = self.dirs.write().await;
        if !guard.contains(from) {
            exn::bail!(ErrorKind::NotFound(PathBuf::from(from)));
        }
        if guard.contains(to) {
            exn::bail!(ErrorKind::AlreadyExists(PathBuf::from(to)));
        }
        guard.remove(from);
        guard.insert(to.to_string());
        Ok(())
    }
}
