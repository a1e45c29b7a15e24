//! Identifiers, the view API's response document, and its classification.

use crate::error::{ErrorKind, Result};
use serde::Deserialize;
use std::convert::Infallible;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Remote status codes that mean the service understood the request and
/// refused it: bad request, access denied, not found, and the three
/// "video unavailable" states.
pub const RECOGNIZED_CODES: [i64; 6] = [-400, -403, -404, 62002, 62004, 62012];

/// Opaque token naming both a local directory and a remote video.
///
/// Numeric in practice, but never parsed: the exact directory name is what
/// gets sent to the API and what gets renamed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(String);
impl Identifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier looks like an AV number (ASCII digits only).
    pub fn is_numeric(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}
impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}
impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}
impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
impl FromStr for Identifier {
    type Err = Infallible;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// Metadata of a successfully resolved video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    /// The identifier that was requested (the directory name)
    pub aid: Identifier,
    /// Video title, as published
    pub title: String,
    /// Publish time, unix seconds
    pub pubdate: i64,
}

/// Classified outcome of one successful round trip to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// `code == 0`: the video exists.
    Ok(VideoInfo),
    /// One of [`RECOGNIZED_CODES`].
    Recognized(i64),
    /// Any other non-zero code.
    Unrecognized { code: i64, message: String },
}

/// The view endpoint's response envelope.
///
/// ```json
/// {"code": 0, "message": "0", "ttl": 1, "data": {"aid": 170001, "title": "...", "pubdate": 1325345678, ...}}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ViewResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    /// Only decoded for `code == 0`; error responses may carry their own shape.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ViewData {
    #[serde(default)]
    pub aid: Option<u64>,
    pub title: String,
    pub pubdate: i64,
}

impl ViewResponse {
    pub(crate) fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| exn::Exn::from(ErrorKind::InvalidResponse(e.to_string())))
    }

    /// Classifies the response for the identifier that was requested.
    ///
    /// A success code without a `data` object is a malformed response, not a
    /// success.
    pub(crate) fn classify(self, requested: &Identifier) -> Result<Status> {
        match self.code {
            0 => {
                let data = self.data.filter(|data| !data.is_null()).ok_or_else(|| {
                    exn::Exn::from(ErrorKind::InvalidResponse("success code without data".to_string()))
                })?;
                let data: ViewData = serde_json::from_value(data)
                    .map_err(|e| exn::Exn::from(ErrorKind::InvalidResponse(e.to_string())))?;
                if let Some(aid) = data.aid
                    && aid.to_string() != requested.as_str()
                {
                    tracing::debug!(requested = %requested, returned = aid, "API returned a different aid");
                }
                Ok(Status::Ok(VideoInfo {
                    aid: requested.clone(),
                    title: data.title,
                    pubdate: data.pubdate,
                }))
            },
            code if RECOGNIZED_CODES.contains(&code) => Ok(Status::Recognized(code)),
            code => Ok(Status::Unrecognized { code, message: self.message }),
        }
    }
}
