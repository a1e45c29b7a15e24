//! Directory name validation.
//!
//! Every name handed to a backend is relative to the library root and must
//! stay directly inside it: renames never move a directory into a
//! subdirectory or out of the root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates that `name` is exactly one plain path component.
///
/// > **Note:** Titles are sanitized before they reach this point, so a
/// >           separator here means the *template* produced one.
///
/// # Returns
/// Returns the name as a [`PathBuf`] if valid, or
/// [`InvalidName`](crate::error::ErrorKind::InvalidName) if invalid.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use bilirename_storage::validate_name;
/// // Valid names
/// assert!(validate_name("170001").is_ok());
/// assert!(validate_name("1-My Video-(2020-01-01)").is_ok());
/// // Invalid names
/// assert!(validate_name("").is_err());
/// assert!(validate_name("..").is_err());
/// assert!(validate_name("a/b").is_err());
/// assert!(validate_name("/etc").is_err());
/// assert!(validate_name("a\0b").is_err());
/// // A trailing separator still names the same directory
/// assert_eq!(validate_name("170001/").unwrap(), Path::new("170001"));
/// ```
pub fn validate(name: impl AsRef<Path>) -> Result<PathBuf> {
    let name = name.as_ref();
    let invalid = || ErrorKind::InvalidName(name.to_path_buf());
    let mut components = name.components();
    let single = match (components.next(), components.next()) {
        (Some(Component::Normal(s)), None) => s,
        _ => exn::bail!(invalid()),
    };
    // Null bytes pass through Path::components() on Unix but cause
    // truncation in C-based syscalls, so reject them explicitly.
    if single.as_encoded_bytes().contains(&0) {
        exn::bail!(invalid());
    }
    Ok(PathBuf::from(single))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert_eq!(validate("170001").unwrap(), Path::new("170001"));
        assert_eq!(validate("1-A_B-(2021)").unwrap(), Path::new("1-A_B-(2021)"));
        assert_eq!(validate("名前 with spaces").unwrap(), Path::new("名前 with spaces"));
    }

    #[test]
    fn test_rejects_nested_paths() {
        assert!(validate("a/b").is_err());
        assert!(validate("./a/b").is_err());
        assert!(validate("a/../b").is_err());
    }

    #[test]
    fn test_rejects_special_components() {
        assert!(validate("").is_err());
        assert!(validate(".").is_err());
        assert!(validate("..").is_err());
        assert!(validate("/").is_err());
        assert!(validate("/absolute").is_err());
    }

    #[test]
    fn test_rejects_null_bytes() {
        let err = validate("abc\0def").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidName(_)));
    }
}
