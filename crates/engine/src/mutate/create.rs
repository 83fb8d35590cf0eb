use super::meta_keys;
use crate::classify::classify;
use crate::options::PathRewrite;
use labelsync_remote::DestinationHandle;
use labelsync_remote::models::{Metadata, SOURCE_ITEM_ID_KEY, SourceItem, TaskPayload};
use serde_json::Value;

/// Tally of one [`create_batch()`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CreateOutcome {
    pub attempted: u64,
    /// Tasks the destination confirmed as created.
    pub created: u64,
    /// Items that could not be created, even one at a time.
    pub failed: u64,
    /// Whether the batch request failed and items were retried individually.
    pub fell_back: bool,
}

/// Shape the destination task for a source item.
///
/// The payload's single data field is keyed by the item's media category and
/// holds its rewritten storage locator; the metadata carries the
/// back-reference used to correlate the task on later passes.
pub fn task_payload(item: &SourceItem, dataset_id: &str, rewrite: &PathRewrite) -> TaskPayload {
    let category = classify(&item.type_descriptor);
    let mut data = Metadata::new();
    data.insert(category.as_str().to_string(), Value::String(rewrite.apply(&item.storage_locator)));
    let mut meta = Metadata::new();
    meta.insert(SOURCE_ITEM_ID_KEY.to_string(), Value::String(item.id.clone()));
    meta.insert(meta_keys::ORIGINAL_NAME.to_string(), Value::String(item.display_name.clone()));
    meta.insert(meta_keys::FILE_SIZE.to_string(), Value::from(item.size));
    meta.insert(meta_keys::FILE_TYPE.to_string(), Value::String(item.type_descriptor.clone()));
    meta.insert(meta_keys::SOURCE_DATASET_ID.to_string(), Value::String(dataset_id.to_string()));
    TaskPayload { data, meta }
}

/// Create tasks for `items` in one batch request, falling back to one request
/// per item if the batch is refused.
///
/// The fallback runs sequentially so that a single malformed item only costs
/// itself. An empty `items` makes no requests at all.
pub async fn create_batch(
    destination: &DestinationHandle,
    project_id: &str,
    dataset_id: &str,
    items: &[SourceItem],
    rewrite: &PathRewrite,
) -> CreateOutcome {
    let mut outcome = CreateOutcome { attempted: items.len() as u64, ..Default::default() };
    if items.is_empty() {
        return outcome;
    }
    let payloads: Vec<TaskPayload> = items.iter().map(|item| task_payload(item, dataset_id, rewrite)).collect();
    match destination.create_tasks(project_id, &payloads).await {
        Ok(created) => {
            outcome.created = created;
            outcome.failed = outcome.attempted.saturating_sub(created);
            return outcome;
        },
        Err(e) => {
            tracing::warn!(project_id, items = payloads.len(), error = %*e, "Batch creation failed; creating tasks one by one");
            outcome.fell_back = true;
        },
    }
    for payload in &payloads {
        match destination.create_task(project_id, payload).await {
            Ok(()) => outcome.created += 1,
            Err(e) => {
                tracing::warn!(project_id, source_item_id = ?payload.source_item_id(), error = %*e, "Failed to create task");
                outcome.failed += 1;
            },
        }
    }
    outcome
}
