//! Collaborator interfaces for synchronization.
//!
//! Two remote systems take part in every synchronization:
//! - the **source** ([`SourceProvider`]): the dataset-management service and
//!   source of record for files, and
//! - the **destination** ([`DestinationProvider`]): the annotation service
//!   whose project tasks should mirror the source dataset.
//!
//! Transport, authentication and wire formats are left to implementations.
//! The `mock` feature provides in-memory implementations for tests.

pub mod destination;
pub mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod models;
pub mod source;

pub use crate::destination::{DestinationProvider, TaskStream};
pub use crate::source::SourceProvider;
use std::sync::Arc;

pub type SourceHandle = Arc<dyn SourceProvider + Send + Sync>;
pub type DestinationHandle = Arc<dyn DestinationProvider + Send + Sync>;
