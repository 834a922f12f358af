//! Path validation for catalog-provided placement paths.
//!
//! Relative paths come from the remote catalog and end up joined onto the
//! device's library directory, so they must never be able to escape it.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Validates and normalises a relative placement path.
///
/// > **Note:** This does **not** normalize backslashes or non-UTF8 bytes.
/// > Null bytes are explicitly rejected.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use shelfsync_device::validate_path;
/// assert!(validate_path("Author/Series/01 - Title").is_ok());
/// assert!(validate_path("a/../Title").is_ok()); // (never leaves the library)
/// assert!(validate_path("../Title").is_err());
/// assert!(validate_path("a/../../b").is_err());
/// assert_eq!(validate_path("/Author//./Title/").unwrap(), Path::new("Author/Title"));
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but
                // truncate in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
                }
                components.push(s)
            },
            // Catalog paths are relative to the library root even when they
            // start with a separator.
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Validates a value used as exactly one directory name (e.g. a library ID).
pub fn validate_segment(segment: &str) -> Result<&str> {
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !segment.contains('\0') => Ok(segment),
        _ => exn::bail!(ErrorKind::InvalidPath(PathBuf::from(segment))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Author/Title", "Author/Title")]
    #[case("Author/Series/01", "Author/Series/01")]
    #[case("./Author/Title/", "Author/Title")]
    #[case("/Author/Title", "Author/Title")]
    #[case("Author/Other/../Title", "Author/Title")]
    fn test_valid(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("/")]
    #[case("..")]
    #[case("../sibling")]
    #[case("Author/../../escape")]
    #[case("Author/Ti\0tle")]
    fn test_invalid(#[case] input: &str) {
        let err = validate(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[rstest]
    #[case("lib_c1u6t4p45c35rf0nzd", true)]
    #[case("lib/nested", false)]
    #[case("..", false)]
    #[case("", false)]
    #[case("/", false)]
    fn test_segment(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(validate_segment(input).is_ok(), valid);
    }
}
