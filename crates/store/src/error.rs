//! Store Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    /// The reader's database file does not exist (never created by the
    /// reader, or the wrong directory was given as the device root).
    #[display("database not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// A stored value cannot be represented.
    #[display("invalid data in column: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Always `false`: store errors are never retried within a run, the item
    /// is retried by the next run instead.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Database)]
    #[case(ErrorKind::NotFound(PathBuf::from("/media/KOBOeReader/.kobo/KoboReader.sqlite")))]
    #[case(ErrorKind::InvalidData("ReadStatus"))]
    fn test_never_retryable(#[case] kind: ErrorKind) {
        assert!(!kind.is_retryable());
    }
}
