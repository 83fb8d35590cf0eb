//! Remote Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Provider implementations raise these; the engine wraps
//! them in its own error tree.

use derive_more::{Display, Error};

/// A remote error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for remote operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested dataset, project or task does not exist.
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Connection failures, timeouts and 5xx responses.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The remote refused a page index during enumeration (typically past the
    /// last page while the collection shrinks underneath the listing).
    #[display("invalid page: {_0}")]
    InvalidPage(#[error(not(source))] u64),
    /// The remote rejected the request payload.
    #[display("rejected by remote: {_0}")]
    Rejected(#[error(not(source))] String),
    /// Credentials missing or refused.
    #[display("unauthorized")]
    Unauthorized,
    /// The remote answered with something that could not be understood.
    #[display("invalid response: {_0}")]
    InvalidResponse(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::InvalidPage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotFound("dataset d1".to_string()).to_string(), "not found: dataset d1");
        assert_eq!(ErrorKind::InvalidPage(7).to_string(), "invalid page: 7");
        assert_eq!(ErrorKind::Unauthorized.to_string(), "unauthorized");
    }

    #[rstest]
    #[case(ErrorKind::Network("timeout".to_string()), true)]
    #[case(ErrorKind::InvalidPage(3), true)]
    #[case(ErrorKind::NotFound("task 1".to_string()), false)]
    #[case(ErrorKind::Rejected("bad payload".to_string()), false)]
    #[case(ErrorKind::Unauthorized, false)]
    fn error_kind_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }
}
