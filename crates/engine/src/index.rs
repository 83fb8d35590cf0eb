//! Reverse index from source item IDs to the destination tasks created for
//! them.

use futures::StreamExt;
use labelsync_remote::DestinationHandle;
use std::collections::HashMap;
use std::collections::hash_map;
use tracing::instrument;

/// Lookup from source item ID to destination task ID.
///
/// Built fresh at the start of every reconciliation pass and dropped at the
/// end of it; it is never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CorrelationIndex(HashMap<String, u64>);
impl CorrelationIndex {
    /// Insert a correlation. A later insert for the same source item wins.
    pub fn insert(&mut self, source_item_id: impl Into<String>, task_id: u64) -> Option<u64> {
        self.0.insert(source_item_id.into(), task_id)
    }

    pub fn get(&self, source_item_id: &str) -> Option<u64> {
        self.0.get(source_item_id).copied()
    }

    pub fn contains(&self, source_item_id: &str) -> bool {
        self.0.contains_key(source_item_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, u64> {
        self.0.iter()
    }
}
impl<S: Into<String>> FromIterator<(S, u64)> for CorrelationIndex {
    fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
        let mut index = Self::default();
        for (source_item_id, task_id) in iter {
            index.insert(source_item_id, task_id);
        }
        index
    }
}

/// The outcome of building a [`CorrelationIndex`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexResult {
    pub index: CorrelationIndex,
    /// `true` when the enumeration was cut short and the index is known to
    /// be incomplete. Items missing from a degraded index look new to the
    /// differ, so a degraded pass may create duplicate tasks.
    pub degraded: bool,
    /// Number of tasks enumerated, with or without a back-reference.
    pub tasks_seen: u64,
}

/// Enumerate every task in a destination project and index the ones that
/// back-reference a source item.
///
/// This never fails. If the enumeration breaks off (a transport error, or
/// the destination rejecting a page index mid-way) the fault is logged and
/// whatever was indexed up to that point is returned, flagged as
/// [`degraded`](IndexResult::degraded). Synchronizing with an incomplete
/// index risks duplicate tasks; not synchronizing at all is judged worse.
#[instrument(skip(destination), fields(destination = destination.name()))]
pub async fn build_index(destination: &DestinationHandle, project_id: &str, page_size: u64) -> IndexResult {
    let mut result = IndexResult::default();
    let mut tasks = destination.list_tasks(project_id, page_size);
    while let Some(task) = tasks.next().await {
        let task = match task {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(
                    project_id,
                    indexed = result.index.len(),
                    error = ?e,
                    "Task enumeration broke off; continuing with a partial index"
                );
                result.degraded = true;
                break;
            },
        };
        result.tasks_seen += 1;
        if let Some(source_item_id) = task.source_item_id()
            && let Some(previous) = result.index.insert(source_item_id, task.id)
        {
            tracing::debug!(project_id, task_id = task.id, previous, "Several tasks reference the same source item");
        }
    }
    tracing::info!(project_id, indexed = result.index.len(), tasks = result.tasks_seen, "Built correlation index");
    result
}
