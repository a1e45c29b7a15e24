use crate::error::{Error, ErrorKind};
use crate::plan::RenamePair;
use async_stream::stream;
use bilirename_storage::StorageBackend;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use std::pin::pin;

/// What happened to one [`RenamePair`].
#[derive(Debug)]
pub enum ApplyEvent {
    Renamed(RenamePair),
    /// The directory already has its generated name.
    AlreadyCorrect(RenamePair),
    Failed(RenamePair, Error),
}

#[derive(Debug, Default)]
pub struct ApplySummary {
    pub renamed: Vec<RenamePair>,
    pub unchanged: Vec<RenamePair>,
    pub failed: Vec<(RenamePair, Error)>,
}
impl ApplySummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Performs the renames one after another, in plan order.
///
/// A failed rename is reported and the remaining pairs are still attempted.
pub fn apply<'a>(backend: &'a dyn StorageBackend, pairs: Vec<RenamePair>) -> impl Stream<Item = ApplyEvent> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        for pair in pairs {
            if pair.is_noop() {
                tracing::debug!(name = %pair.source, "Already correctly named");
                yield ApplyEvent::AlreadyCorrect(pair);
                continue;
            }
            match backend.rename(&pair.source, &pair.destination).await.or_raise(|| ErrorKind::Apply) {
                Ok(()) => {
                    tracing::info!(backend = backend.name(), from = %pair.source, to = %pair.destination, "Renamed");
                    yield ApplyEvent::Renamed(pair);
                },
                Err(e) => {
                    tracing::error!(
                        backend = backend.name(),
                        from = %pair.source,
                        to = %pair.destination,
                        error = ?e,
                        "Rename failed"
                    );
                    yield ApplyEvent::Failed(pair, e);
                },
            }
        }
    })
}

/// Drains [`apply`], handing each event to `on_event` before recording it.
pub async fn apply_all<F>(backend: &dyn StorageBackend, pairs: Vec<RenamePair>, mut on_event: F) -> ApplySummary
where
    F: FnMut(&ApplyEvent),
{
    let mut summary = ApplySummary::default();
    let mut events = pin!(apply(backend, pairs));
    while let Some(event) = events.next().await {
        on_event(&event);
        match event {
            ApplyEvent::Renamed(pair) => summary.renamed.push(pair),
            ApplyEvent::AlreadyCorrect(pair) => summary.unchanged.push(pair),
            ApplyEvent::Failed(pair, e) => summary.failed.push((pair, e)),
        }
    }
    summary
}
