use bilirename_api::{Identifier, VideoInfo};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// The remote service refused the identifier with a recognized code on the
/// final attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub id: Identifier,
    pub code: i64,
}

/// Why the last attempt for an [`Unresolved`] identifier produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Connection error, timeout, or an undecodable response.
    Transport(String),
    /// A status code outside the recognized set.
    Unrecognized { code: i64, message: String },
}
impl Display for Failure {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Transport(reason) => write!(f, "{reason}"),
            Self::Unrecognized { code, message } if message.is_empty() => write!(f, "unrecognized code {code}"),
            Self::Unrecognized { code, message } => write!(f, "unrecognized code {code}: {message}"),
        }
    }
}

/// Every attempt for the identifier ended in a transport failure or an
/// unrecognized code, or the final one did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub id: Identifier,
    pub attempts: u32,
    pub last_failure: Failure,
}

/// Final outcome of resolving one identifier. Exactly one per identifier
/// per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(VideoInfo),
    Rejected(RemoteError),
    Unresolved(Unresolved),
}
impl Resolution {
    pub fn id(&self) -> &Identifier {
        match self {
            Self::Resolved(info) => &info.aid,
            Self::Rejected(error) => &error.id,
            Self::Unresolved(unresolved) => &unresolved.id,
        }
    }
}
