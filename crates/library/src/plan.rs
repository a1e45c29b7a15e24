//! Turns a [`BatchResult`] into a list of renames, or refuses to.

use crate::Context;
use crate::error::Result;
use crate::resolve::{BatchResult, RemoteError, Unresolved};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// One directory rename: `source` is the current (identifier) name and
/// `destination` the generated one, both relative to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePair {
    pub source: String,
    pub destination: String,
}
impl RenamePair {
    pub fn is_noop(&self) -> bool {
        self.source == self.destination
    }
}
impl Display for RenamePair {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

/// Why nothing may be renamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abort {
    pub errors: Vec<RemoteError>,
    pub unresolved: Vec<Unresolved>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Ready(Vec<RenamePair>),
    Aborted(Abort),
}

/// Builds the rename plan for a finished batch run.
///
/// Any [`RemoteError`] aborts the whole plan; so does any [`Unresolved`]
/// identifier unless `ctx.skip_unresolved` is set, in which case those are
/// left out. Otherwise the successes are ordered by ascending publish date
/// (ties keep their completion order) and named with 1-based indices.
///
/// Fails only if the name generator does.
pub fn build_plan(result: &BatchResult, ctx: &Context) -> Result<Plan> {
    let unresolved = if ctx.skip_unresolved {
        for skipped in &result.unresolved {
            tracing::warn!(id = %skipped.id, failure = %skipped.last_failure, "Skipping unresolved identifier");
        }
        Vec::new()
    } else {
        result.unresolved.clone()
    };
    if !result.errors.is_empty() || !unresolved.is_empty() {
        return Ok(Plan::Aborted(Abort { errors: result.errors.clone(), unresolved }));
    }

    let mut ordered: Vec<_> = result.successes.iter().collect();
    ordered.sort_by_key(|info| info.pubdate);
    let pairs = ordered
        .into_iter()
        .enumerate()
        .map(|(index, info)| {
            Ok(RenamePair {
                source: info.aid.to_string(),
                destination: ctx.generator.generate(index + 1, info)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Plan::Ready(pairs))
}
