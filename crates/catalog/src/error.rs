//! Catalog Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request never produced a response (DNS, TLS, connection reset,
    /// timeout) or the response body was cut short.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The server answered with a non-success status code.
    #[display("unexpected HTTP status {_0}")]
    Status(#[error(not(source))] u16),
    /// The server rejected the credentials.
    #[display("unauthorized: check the configured API token")]
    Unauthorized,
    /// The requested library or item does not exist.
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The response body did not match the expected shape.
    #[display("could not decode catalog response")]
    Decode,
    /// The configured server URL or a derived endpoint is malformed.
    #[display("invalid URL: {_0}")]
    InvalidUrl(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status(code) => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Network("reset".to_string()), true)]
    #[case(ErrorKind::Status(503), true)]
    #[case(ErrorKind::Status(429), true)]
    #[case(ErrorKind::Status(400), false)]
    #[case(ErrorKind::Unauthorized, false)]
    #[case(ErrorKind::NotFound("li_1".to_string()), false)]
    #[case(ErrorKind::Decode, false)]
    fn test_is_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }
}
