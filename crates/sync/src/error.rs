//! Sync Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.
//!
//! A run either fails as a whole (the variants under "Fatal") before anything
//! on the device was touched, or it completes and reports per-item failures
//! in its [`RunSummary`](crate::RunSummary).

use derive_more::{Display, Error};
use std::error::Error as StdError;

/// A sync error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// ### Fatal
/// - [`ErrorKind::DeviceNotMounted`]
/// - [`ErrorKind::LibraryNotFound`]
/// - [`ErrorKind::NotBookLibrary`]
/// - [`ErrorKind::DatabaseUnavailable`]
/// - [`ErrorKind::Catalog`]
/// - [`ErrorKind::Integrity`]
///
/// ### Per item
/// - [`ErrorKind::Fetch`]
/// - [`ErrorKind::Filesystem`]
/// - [`ErrorKind::Store`]
/// - [`ErrorKind::MissingContent`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The device root does not exist or is not a directory.
    #[display("device is not mounted")]
    DeviceNotMounted,
    /// No catalog library has the configured name.
    #[display("library not found: {_0}")]
    LibraryNotFound(#[error(not(source))] String),
    /// The configured library does not hold books.
    #[display("library {_0:?} is not a book library")]
    NotBookLibrary(#[error(not(source))] String),
    /// The reader's database is missing or cannot be opened.
    #[display("reader database unavailable")]
    DatabaseUnavailable,
    /// The catalog could not be listed.
    #[display("could not list the remote catalog")]
    Catalog,
    /// The device tree holds a marker that cannot be trusted.
    #[display("device tree cannot be trusted")]
    Integrity,

    /// A catalog request for this item failed.
    #[display("catalog request failed: {_0}")]
    Fetch(#[error(not(source))] String),
    /// A filesystem operation for this item failed.
    #[display("filesystem operation failed: {_0}")]
    Filesystem(#[error(not(source))] String),
    /// Reading or writing this item's database row failed.
    #[display("database operation failed: {_0}")]
    Store(#[error(not(source))] String),
    /// The catalog lists no content file for this item.
    #[display("item has no ebook file")]
    MissingContent,
}

impl ErrorKind {
    /// Returns `true` if the error aborts the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotMounted
                | Self::LibraryNotFound(_)
                | Self::NotBookLibrary(_)
                | Self::DatabaseUnavailable
                | Self::Catalog
                | Self::Integrity
        )
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Filesystem(_))
    }
}

/// Re-raise a dependency error as a per-item kind that carries the
/// dependency's message, so the run summary can say what went wrong.
pub(crate) trait DescribeExt<T> {
    fn or_describe(self, kind: fn(String) -> ErrorKind) -> Result<T>;
}
impl<T, K> DescribeExt<T> for std::result::Result<T, exn::Exn<K>>
where
    K: StdError + Send + Sync + 'static,
{
    fn or_describe(self, kind: fn(String) -> ErrorKind) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => {
                let source: &K = &err;
                let reason = source.to_string();
                exn::ResultExt::or_raise(Err(err), || kind(reason))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::DeviceNotMounted, true)]
    #[case(ErrorKind::LibraryNotFound("Ebooks".to_string()), true)]
    #[case(ErrorKind::Integrity, true)]
    #[case(ErrorKind::Fetch("timeout".to_string()), false)]
    #[case(ErrorKind::MissingContent, false)]
    fn test_is_fatal(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_fatal(), expected);
    }

    #[rstest]
    #[case(ErrorKind::Fetch("timeout".to_string()), true)]
    #[case(ErrorKind::Filesystem("permission denied".to_string()), true)]
    #[case(ErrorKind::Store("database error".to_string()), false)]
    #[case(ErrorKind::MissingContent, false)]
    #[case(ErrorKind::Integrity, false)]
    fn test_is_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }

    #[test]
    fn test_or_describe_keeps_reason() {
        let failed: shelfsync_catalog::error::Result<()> =
            Err(shelfsync_catalog::error::ErrorKind::Status(503).into());
        let err = failed.or_describe(ErrorKind::Fetch).unwrap_err();
        let kind: &ErrorKind = &err;
        assert_eq!(kind.to_string(), "catalog request failed: unexpected HTTP status 503");
    }
}
