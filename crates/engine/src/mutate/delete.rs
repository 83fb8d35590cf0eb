use crate::index::CorrelationIndex;
use labelsync_remote::DestinationHandle;
use labelsync_remote::models::DeleteOutcome;
use std::collections::HashSet;

/// Tasks whose source item did not turn up anywhere in the scan, sorted by
/// task ID.
pub fn deletion_candidates(index: &CorrelationIndex, seen: &HashSet<String>) -> Vec<u64> {
    let mut candidates: Vec<u64> = index
        .iter()
        .filter(|(source_item_id, _)| !seen.contains(source_item_id.as_str()))
        .map(|(_, task_id)| *task_id)
        .collect();
    candidates.sort_unstable();
    candidates
}

/// Delete tasks, best-effort. Makes no request when there is nothing to
/// delete.
pub async fn delete_batch(destination: &DestinationHandle, task_ids: &[u64]) -> DeleteOutcome {
    if task_ids.is_empty() {
        return DeleteOutcome::default();
    }
    let outcome = destination.delete_tasks(task_ids).await;
    if outcome.failed > 0 {
        tracing::warn!(failed = outcome.failed, total = outcome.total, "Some tasks could not be deleted");
    }
    outcome
}
