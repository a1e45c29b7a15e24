//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the interface through
//! which the library enumerates identifier directories and applies renames.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;

pub type NameStream<'a> = Pin<Box<dyn Stream<Item = Result<String>> + Send + 'a>>;

/// Unified interface for the library root.
///
/// # Naming
/// Every name is a single directory name relative to the root, validated
/// with [`validate_name`](crate::validate_name) before use. Implementations
/// must enforce this validation.
///
/// # Examples
///
/// ```
/// use bilirename_storage::{backend::StorageBackend, error::Result};
///
/// async fn rename_if_present(backend: &dyn StorageBackend, from: &str, to: &str) -> Result<bool> {
///     if !backend.list().await?.iter().any(|name| name == from) {
///         return Ok(false);
///     }
///     backend.rename(from, to).await?;
///     Ok(true)
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// List the names of all immediate subdirectories of the root.
    ///
    /// Default implementation collects [`list_stream()`](Self::list_stream)
    /// and sorts the result, so callers get a deterministic order regardless
    /// of the order the underlying filesystem returns entries in.
    async fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.list_stream().try_collect().await?;
        names.sort();
        Ok(names)
    }

    /// Stream the names of all immediate subdirectories of the root, in no
    /// particular order. Regular files are never yielded.
    fn list_stream(&self) -> NameStream<'_>;

    /// Rename `from` to `to`, both directly under the root.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the source
    /// does not exist, and [`AlreadyExists`](crate::error::ErrorKind::AlreadyExists)
    /// if the destination does. Existing directories are never overwritten.
    ///
    /// ```no_run
    /// # use bilirename_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// backend.rename("170001", "1-Title-(2012-03-04-05-06-07)").await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn rename(&self, from: &str, to: &str) -> Result<()>;
}
