//! API Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An API error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Neither variant carries a remote status code: a response that decodes
/// correctly is never an error, it is a [`Status`](crate::Status).
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The HTTP client could not be constructed.
    #[display("failed to build HTTP client")]
    Client,
    /// Connection failure, timeout, or a non-success HTTP status.
    #[display("transport failure: {_0}")]
    Transport(#[error(not(source))] String),
    /// The body was not the JSON document the API promises.
    #[display("malformed response: {_0}")]
    InvalidResponse(#[error(not(source))] String),
}
