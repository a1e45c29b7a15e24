//! Identifier resolution: the retrying per-identifier resolver and the
//! windowed batch orchestrator built on top of it.
//!
//! [`resolve`] performs up to `max_attempts` lookups for one identifier and
//! classifies the result into a [`Resolution`]. It never fails: every way a
//! lookup can go wrong is an outcome, not an error.
//!
//! [`resolve_stream`] splits the identifier list into consecutive windows and
//! resolves each window concurrently, never starting a window before the
//! previous one has fully settled, so at most `window_size` lookups are ever
//! in flight. [`run_batches`] drains that stream into a [`BatchResult`].

mod batch;
mod outcome;
mod resolver;

pub use self::batch::{BatchResult, Progress, ResolveEvent, resolve_stream, run_batches};
pub use self::outcome::{Failure, RemoteError, Resolution, Unresolved};
pub use self::resolver::resolve;
