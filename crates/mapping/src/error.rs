//! Mapping Store Error Types
//!
//! `sqlx` errors are never exposed directly; they sit underneath one of the
//! kinds below in the `exn` error tree.

use derive_more::{Display, Error};

/// A mapping store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for mapping store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong, from the point of view of whoever called the store.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// An active mapping already links this dataset and project.
    #[display("active mapping already exists: ({_0}, {_1})")]
    Conflict(#[error(not(source))] String, #[error(not(source))] String),
    /// A stored value could not be converted into its model type.
    #[display("invalid mapping data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database)
    }
}
