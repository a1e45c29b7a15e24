//! Resolve identifier-named directories against the remote video service and
//! rename them after the videos they hold.
//!
//! The pipeline is [`enumerate`] ⇒ [`run_batches`] ⇒ [`build_plan`] ⇒
//! [`apply_all`], with the caller free to stop between any two steps (to
//! preview the plan or ask for confirmation, for example).

mod apply;
mod enumerate;
pub mod error;
mod plan;
pub mod resolve;
mod template;

pub use crate::apply::{ApplyEvent, ApplySummary, apply, apply_all};
pub use crate::enumerate::enumerate;
pub use crate::plan::{Abort, Plan, RenamePair, build_plan};
pub use crate::resolve::{BatchResult, Progress, ResolveEvent, resolve_stream, run_batches};
pub use crate::template::{DEFAULT_TEMPLATE, DEFAULT_TIME_FORMAT, NameGenerator, TimeFormat, sanitize};

/// Settings for turning a [`BatchResult`] into a [`Plan`].
pub struct Context {
    pub generator: NameGenerator,
    /// Leave unresolved identifiers out of the plan instead of aborting.
    pub skip_unresolved: bool,
}
impl Context {
    pub fn new(generator: NameGenerator) -> Self {
        Self { generator, skip_unresolved: false }
    }

    pub fn with_skip_unresolved(mut self, skip: bool) -> Self {
        self.skip_unresolved = skip;
        self
    }
}
