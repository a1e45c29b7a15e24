//! Storage for a bilirename library: a single root directory whose immediate
//! subdirectories are named after the identifiers being resolved.
//!
//! Only two operations matter to the rest of the workspace: enumerating those
//! subdirectories, and renaming one of them to another name under the same
//! root. Both go through the [`StorageBackend`] trait so that the library
//! crate can be tested against the in-memory `MockBackend`.

pub mod backend;
pub mod error;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::path::validate as validate_name;
