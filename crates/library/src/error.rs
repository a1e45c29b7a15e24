//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Resolution failures are not errors: they are outcomes, collected into a
//! [`BatchResult`](crate::BatchResult). Only things that stop the run
//! itself end up here.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("issue with name generation from template")]
    Template,
    #[display("could not enumerate identifier directories")]
    Enumerate,
    #[display("could not rename directory")]
    Apply,
}
