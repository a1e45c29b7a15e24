use crate::resolve::{RemoteError, Resolution, Unresolved, resolve};
use async_stream::stream;
use bilirename_api::{Identifier, Lookup, VideoInfo};
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::pin::pin;

/// How many identifiers have reached a final outcome, out of how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}
impl Display for Progress {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.processed, self.total)
    }
}

/// Progress events emitted by [`resolve_stream`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. For each window in order: [`WindowStarted`](Self::WindowStarted), one
///    [`Resolved`](Self::Resolved) per identifier of the window (in
///    completion order), then [`WindowComplete`](Self::WindowComplete).
/// 3. [`Complete`](Self::Complete), exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveEvent {
    Started { total: usize },
    /// Windows are numbered from 1.
    WindowStarted { window: usize, size: usize },
    Resolved { progress: Progress, resolution: Resolution },
    WindowComplete { window: usize, size: usize },
    Complete,
}

/// Everything a batch run produced. `successes` and `errors` keep the
/// window-major completion order of the run; no ordering is implied beyond
/// that.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub successes: Vec<VideoInfo>,
    pub errors: Vec<RemoteError>,
    pub unresolved: Vec<Unresolved>,
}
impl BatchResult {
    /// Number of identifiers accounted for.
    pub fn len(&self) -> usize {
        self.successes.len() + self.errors.len() + self.unresolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Resolved(info) => self.successes.push(info),
            Resolution::Rejected(error) => self.errors.push(error),
            Resolution::Unresolved(unresolved) => self.unresolved.push(unresolved),
        }
    }
}

/// Streams [`ResolveEvent`]s while resolving every identifier in `ids`.
///
/// Identifiers are split into consecutive windows of `window_size` (the last
/// one may be shorter; zero is treated as one). Every identifier of a window
/// is resolved concurrently and the next window is only started once all of
/// them have settled, so no more than `window_size` lookups are ever in
/// flight. The progress counter lives in this stream alone.
pub fn resolve_stream<'a, L: Lookup + ?Sized>(
    lookup: &'a L,
    ids: &'a [Identifier],
    window_size: usize,
    max_attempts: u32,
) -> impl Stream<Item = ResolveEvent> + 'a {
    let window_size = window_size.max(1);
    let total = ids.len();
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield ResolveEvent::Started { total };
        let mut processed = 0;
        for (index, window) in ids.chunks(window_size).enumerate() {
            let (number, size) = (index + 1, window.len());
            tracing::debug!(window = number, size, "Starting window");
            yield ResolveEvent::WindowStarted { window: number, size };

            let mut pending: FuturesUnordered<_> = window.iter().map(|id| resolve(lookup, id, max_attempts)).collect();
            while let Some(resolution) = pending.next().await {
                processed += 1;
                yield ResolveEvent::Resolved { progress: Progress { processed, total }, resolution };
            }

            yield ResolveEvent::WindowComplete { window: number, size };
        }
        yield ResolveEvent::Complete;
    })
}

/// Resolves every identifier in `ids` (see [`resolve_stream`]) and collects
/// the outcomes, handing each event to `on_event` as it happens.
pub async fn run_batches<L, F>(
    lookup: &L,
    ids: &[Identifier],
    window_size: usize,
    max_attempts: u32,
    mut on_event: F,
) -> BatchResult
where
    L: Lookup + ?Sized,
    F: FnMut(&ResolveEvent),
{
    let mut result = BatchResult::default();
    let mut events = pin!(resolve_stream(lookup, ids, window_size, max_attempts));
    while let Some(event) = events.next().await {
        on_event(&event);
        if let ResolveEvent::Resolved { resolution, .. } = event {
            result.record(resolution);
        }
    }
    tracing::info!(
        successes = result.successes.len(),
        errors = result.errors.len(),
        unresolved = result.unresolved.len(),
        "Batch run complete"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolver::tests::{Reply, Scripted};
    use rstest::rstest;

    fn ids(count: usize) -> Vec<Identifier> {
        (1..=count).map(|n| Identifier::from(n.to_string())).collect()
    }

    fn all_ok(ids: &[Identifier]) -> Scripted {
        ids.iter().fold(Scripted::default(), |lookup, id| lookup.with(id.as_str(), [Reply::Ok("Title", 100)]))
    }

    async fn collect(lookup: &Scripted, ids: &[Identifier], window_size: usize) -> Vec<ResolveEvent> {
        resolve_stream(lookup, ids, window_size, 3).collect().await
    }

    #[tokio::test]
    async fn test_windows_of_five() {
        let ids = ids(12);
        let lookup = all_ok(&ids);
        let windows: Vec<_> = collect(&lookup, &ids, 5)
            .await
            .into_iter()
            .filter_map(|event| match event {
                ResolveEvent::WindowStarted { window, size } => Some((window, size)),
                _ => None,
            })
            .collect();
        assert_eq!(windows, vec![(1, 5), (2, 5), (3, 2)]);
    }

    #[tokio::test]
    async fn test_next_window_waits_for_previous() {
        let ids = ids(12);
        let lookup = all_ok(&ids);
        let _ = collect(&lookup, &ids, 5).await;
        let log = lookup.log.lock().unwrap().clone();
        let last_end_of_first = log
            .iter()
            .rposition(|(id, what)| *what == "end" && ids[..5].iter().any(|i| i.as_str() == id.as_str()))
            .unwrap();
        let first_start_of_second = log
            .iter()
            .position(|(id, what)| *what == "start" && ids[5..10].iter().any(|i| i.as_str() == id.as_str()))
            .unwrap();
        assert!(last_end_of_first < first_start_of_second);
        assert!(lookup.peak_in_flight() <= 5);
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(5)]
    #[tokio::test]
    async fn test_in_flight_never_exceeds_window(#[case] window_size: usize) {
        let ids = ids(11);
        let lookup = all_ok(&ids);
        let _ = collect(&lookup, &ids, window_size).await;
        assert!(lookup.peak_in_flight() <= window_size);
        assert!(lookup.peak_in_flight() >= 1);
    }

    #[tokio::test]
    async fn test_event_order_and_progress() {
        let ids = ids(7);
        let lookup = all_ok(&ids);
        let events = collect(&lookup, &ids, 5).await;
        assert_eq!(events.first(), Some(&ResolveEvent::Started { total: 7 }));
        assert_eq!(events.last(), Some(&ResolveEvent::Complete));
        let progress: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                ResolveEvent::Resolved { progress, .. } => Some(progress.processed),
                _ => None,
            })
            .collect();
        assert_eq!(progress, (1..=7).collect::<Vec<_>>());
        // Two windows: started + complete for each, one resolved per id, plus start/end.
        assert_eq!(events.len(), 2 + 2 * 2 + 7);
    }

    #[tokio::test]
    async fn test_all_succeed() {
        let ids = ids(8);
        let lookup = all_ok(&ids);
        let mut seen = 0;
        let result = run_batches(&lookup, &ids, 5, 3, |event| {
            if matches!(event, ResolveEvent::Resolved { .. }) {
                seen += 1;
            }
        })
        .await;
        assert_eq!(seen, 8);
        assert_eq!(result.successes.len(), 8);
        assert!(result.errors.is_empty());
        assert!(result.unresolved.is_empty());
        for id in &ids {
            assert_eq!(lookup.calls(id.as_str()), 1);
        }
    }

    #[tokio::test]
    async fn test_outcomes_are_partitioned() {
        let ids = ids(4);
        let lookup = Scripted::default()
            .with("1", [Reply::Ok("One", 1)])
            .with("2", [Reply::Code(-404)])
            .with("3", [Reply::Network])
            .with("4", [Reply::Unknown(-999), Reply::Ok("Four", 4)]);
        let result = run_batches(&lookup, &ids, 2, 3, |_| {}).await;
        assert_eq!(result.len(), 4);
        let mut titles: Vec<_> = result.successes.iter().map(|info| info.title.as_str()).collect();
        titles.sort_unstable();
        assert_eq!(titles, vec!["Four", "One"]);
        assert_eq!(result.errors, vec![RemoteError { id: Identifier::from("2"), code: -404 }]);
        assert_eq!(result.unresolved.len(), 1);
        assert_eq!(result.unresolved[0].id, Identifier::from("3"));
        assert_eq!(lookup.calls("2"), 3);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let lookup = Scripted::default();
        let events = collect(&lookup, &[], 5).await;
        assert_eq!(events, vec![ResolveEvent::Started { total: 0 }, ResolveEvent::Complete]);
        assert!(run_batches(&lookup, &[], 5, 3, |_| {}).await.is_empty());
    }

    #[tokio::test]
    async fn test_zero_window_is_one() {
        let ids = ids(3);
        let lookup = all_ok(&ids);
        let _ = collect(&lookup, &ids, 0).await;
        assert_eq!(lookup.peak_in_flight(), 1);
    }
}
