use crate::resolve::{Failure, RemoteError, Resolution, Unresolved};
use bilirename_api::{Identifier, Lookup, Status};
use tracing::instrument;

/// Resolves one identifier, retrying immediately (no backoff) up to
/// `max_attempts` times. A `max_attempts` of zero still makes one attempt.
///
/// - A success ends the loop at once.
/// - A recognized error code is retried, and becomes
///   [`Resolution::Rejected`] only if it is the answer to the final attempt.
/// - Transport failures and unrecognized codes are retried; if the final
///   attempt ends that way the outcome is [`Resolution::Unresolved`].
///
/// Every attempt is logged.
#[instrument(skip(lookup, id), fields(id = %id))]
pub async fn resolve<L: Lookup + ?Sized>(lookup: &L, id: &Identifier, max_attempts: u32) -> Resolution {
    let max_attempts = max_attempts.max(1);
    let mut last_failure = None;
    for attempt in 1..=max_attempts {
        match lookup.lookup(id).await {
            Ok(Status::Ok(info)) => {
                tracing::debug!(attempt, title = %info.title, pubdate = info.pubdate, "Identifier resolved");
                return Resolution::Resolved(info);
            },
            Ok(Status::Recognized(code)) => {
                tracing::warn!(attempt, max_attempts, code, "Remote service returned an error code");
                if attempt == max_attempts {
                    return Resolution::Rejected(RemoteError { id: id.clone(), code });
                }
            },
            Ok(Status::Unrecognized { code, message }) => {
                tracing::warn!(attempt, max_attempts, code, reason = %message, "Remote service returned an unknown code");
                last_failure = Some(Failure::Unrecognized { code, message });
            },
            Err(e) => {
                tracing::warn!(attempt, max_attempts, error = %e, "Lookup failed");
                last_failure = Some(Failure::Transport(e.to_string()));
            },
        }
    }
    Resolution::Unresolved(Unresolved {
        id: id.clone(),
        attempts: max_attempts,
        // Infallible: the final attempt either returned or recorded a failure.
        last_failure: last_failure.unwrap_or_else(|| Failure::Transport("no attempt made".to_string())),
    })
}
