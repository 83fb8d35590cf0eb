//! The narrow view of the mapping store that a reconciliation pass needs.

use crate::Repository;
use crate::error::Result;
use crate::models::Mapping;
use async_trait::async_trait;
use time::UtcDateTime;
use uuid::Uuid;

/// Lookup and bookkeeping for mappings, as seen by the reconciliation engine.
///
/// A pass touches the store exactly twice: once to resolve the mapping at
/// the start, and once to record its completion. Anything richer (creating,
/// listing, tearing down) goes through the concrete [`Repository`].
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Get an active mapping by its ID.
    async fn get(&self, id: Uuid) -> Result<Option<Mapping>>;

    /// Get the active mappings of a source dataset, newest first.
    async fn list_by_source_dataset(&self, source_dataset_id: &str) -> Result<Vec<Mapping>>;

    /// Record when the mapping was last synchronized. Returns `false` if
    /// there is no active mapping with that ID.
    async fn update_last_synchronized(&self, id: Uuid, at: UtcDateTime) -> Result<bool>;
}

#[async_trait]
impl MappingStore for Repository {
    async fn get(&self, id: Uuid) -> Result<Option<Mapping>> {
        Repository::get(self, id).await
    }

    async fn list_by_source_dataset(&self, source_dataset_id: &str) -> Result<Vec<Mapping>> {
        Repository::list_by_source_dataset(self, source_dataset_id, false).await
    }

    async fn update_last_synchronized(&self, id: Uuid, at: UtcDateTime) -> Result<bool> {
        Repository::update_last_synchronized(self, id, at).await
    }
}
