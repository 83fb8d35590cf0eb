//! Engine Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors from the remote providers and
//! the mapping store are kept as children in the tree.

use derive_more::{Display, Error};
use uuid::Uuid;

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of an engine failure.
///
/// ### Lookup Errors
/// - [`ErrorKind::MappingNotFound`]
/// - [`ErrorKind::ProjectNotMapped`]
/// - [`ErrorKind::DatasetNotFound`]
/// - [`ErrorKind::InvalidBatchSize`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Source`]
/// - [`ErrorKind::Destination`]
/// - [`ErrorKind::Store`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No active mapping with this ID.
    #[display("mapping not found: {_0}")]
    MappingNotFound(#[error(not(source))] Uuid),
    /// No active mapping for this destination project.
    #[display("no mapping for destination project: {_0}")]
    ProjectNotMapped(#[error(not(source))] String),
    /// The source does not know the mapped dataset (any more).
    #[display("source dataset not found: {_0}")]
    DatasetNotFound(#[error(not(source))] String),
    #[display("batch size must be positive")]
    InvalidBatchSize,
    /// A source listing or lookup failed.
    #[display("source request failed")]
    Source,
    /// A destination request that cannot be degraded or counted failed.
    #[display("destination request failed")]
    Destination,
    /// Reading or updating the mapping store failed.
    #[display("mapping store failed")]
    Store,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Source | Self::Destination | Self::Store)
    }

    /// Returns `true` for errors that mean "nothing to synchronize" rather
    /// than "synchronization broke".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::MappingNotFound(_) | Self::ProjectNotMapped(_) | Self::DatasetNotFound(_))
    }
}
