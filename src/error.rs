//! Service Error Types
//!
//! Errors from the lower crates are kept as children of one of these kinds,
//! so the full error tree is still available for logging.

use derive_more::{Display, Error};
use uuid::Uuid;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The configuration could not be loaded or is invalid.
    #[display("configuration error")]
    Config,
    /// The mapping database could not be opened or queried.
    #[display("mapping database error")]
    Database,
    /// A reconciliation pass for this mapping is already running.
    #[display("mapping {_0} is already being synchronized")]
    AlreadyRunning(#[error(not(source))] Uuid),
    /// The mapping, project or dataset asked for does not exist.
    #[display("not found")]
    NotFound,
    #[display("synchronization engine error")]
    Engine,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database | Self::AlreadyRunning(_) | Self::Engine)
    }
}
