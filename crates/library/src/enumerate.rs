use crate::error::{ErrorKind, Result};
use bilirename_api::Identifier;
use bilirename_storage::StorageBackend;
use exn::ResultExt;
use tracing::instrument;

/// Lists the identifier directories under the backend's root, sorted by name.
///
/// With `numeric_only`, names that are not entirely ASCII digits (directories
/// renamed by an earlier run, for instance) are skipped.
#[instrument(skip(backend), fields(backend = backend.name()))]
pub async fn enumerate(backend: &dyn StorageBackend, numeric_only: bool) -> Result<Vec<Identifier>> {
    let names = backend.list().await.or_raise(|| ErrorKind::Enumerate)?;
    let found = names.len();
    let ids: Vec<_> = names
        .into_iter()
        .map(Identifier::from)
        .filter(|id| {
            let keep = !numeric_only || id.is_numeric();
            if !keep {
                tracing::debug!(name = %id, "Skipping non-numeric directory");
            }
            keep
        })
        .collect();
    tracing::info!(found, kept = ids.len(), "Enumerated identifier directories");
    Ok(ids)
}
