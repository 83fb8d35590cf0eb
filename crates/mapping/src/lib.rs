//! SQLite store for dataset to annotation project mappings.
//!
//! A mapping records that a destination (annotation) project was provisioned
//! for a source dataset, and when the two were last reconciled. Mappings are
//! soft-deleted when the association is torn down so that the history is
//! kept; at most one *active* mapping may exist per dataset/project pair.
//!
//! The reconciliation engine only depends on the [`MappingStore`] trait;
//! [`Repository`] is the full CRUD surface used by provisioning and
//! teardown.

mod db;
pub mod error;
mod models;
mod repo;
mod store;

pub use crate::db::Database;
pub use crate::models::{Mapping, MappingState};
pub use crate::repo::Repository;
pub use crate::store::MappingStore;
use std::sync::Arc;

pub type MappingHandle = Arc<dyn MappingStore + Send + Sync>;
