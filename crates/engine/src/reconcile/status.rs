use super::Reconciler;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::Serialize;
use time::UtcDateTime;
use uuid::Uuid;

/// How far a dataset's destination project has caught up with it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SyncStatus {
    pub mapping_id: Uuid,
    pub source_dataset_id: String,
    pub destination_project_id: String,
    pub last_synchronized_at: Option<UtcDateTime>,
    /// Declared number of files in the source dataset.
    pub source_total: u64,
    /// Number of tasks in the destination project.
    pub destination_total: u64,
    /// `destination_total / source_total`, or `0.0` for an empty or unknown
    /// dataset. Can exceed `1.0` when tasks were duplicated or created by
    /// hand.
    pub sync_ratio: f64,
}

impl Reconciler {
    /// Report the synchronization status of a source dataset's newest active
    /// mapping, or `None` if the dataset is not mapped at all.
    pub async fn status(&self, source_dataset_id: &str) -> Result<Option<SyncStatus>> {
        let mappings = self.mappings.list_by_source_dataset(source_dataset_id).await.or_raise(|| ErrorKind::Store)?;
        let Some(mapping) = mappings.into_iter().next() else {
            return Ok(None);
        };
        // A dataset removed from the source still has a mapping worth reporting on.
        let source_total = match self.source.dataset(source_dataset_id).await.or_raise(|| ErrorKind::Source)? {
            Some(dataset) => dataset.file_count,
            None => 0,
        };
        let destination_total = self
            .destination
            .task_count(&mapping.destination_project_id)
            .await
            .or_raise(|| ErrorKind::Destination)?;
        let sync_ratio = if source_total == 0 {
            0.0
        } else {
            destination_total as f64 / source_total as f64
        };
        Ok(Some(SyncStatus {
            mapping_id: mapping.id,
            source_dataset_id: mapping.source_dataset_id,
            destination_project_id: mapping.destination_project_id,
            last_synchronized_at: mapping.last_synchronized_at,
            source_total,
            destination_total,
            sync_ratio,
        }))
    }
}
