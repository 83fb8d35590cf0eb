use crate::error::Error;
use serde::Serialize;
use uuid::Uuid;

/// How a reconciliation pass ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    /// The pass ran to completion. Individual creations or deletions may
    /// still have failed; see [`ReconciliationSummary::items_failed`].
    Success,
    /// The pass was cut short after it had already changed the destination.
    PartialError,
    /// The pass was cut short before it changed anything.
    Error,
}

/// Counters accumulated while a pass runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Progress {
    pub items_created: u64,
    pub items_deleted: u64,
    pub items_failed: u64,
    pub items_total: u64,
    pub index_degraded: bool,
}
impl Progress {
    fn changed_anything(&self) -> bool {
        self.items_created > 0 || self.items_deleted > 0
    }
}

/// The result of one reconciliation pass, handed back to the caller and not
/// persisted anywhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    pub mapping_id: Uuid,
    pub status: SummaryStatus,
    pub items_created: u64,
    pub items_deleted: u64,
    /// Creations that failed even one at a time, plus deletions that failed.
    pub items_failed: u64,
    /// Declared size of the source dataset when the pass started, whatever
    /// the status of its items.
    pub items_total: u64,
    /// The correlation index was incomplete, so some tasks may have been
    /// duplicated.
    pub index_degraded: bool,
    pub message: String,
}
impl ReconciliationSummary {
    pub fn is_success(&self) -> bool {
        self.status == SummaryStatus::Success
    }

    pub(crate) fn completed(mapping_id: Uuid, progress: Progress) -> Self {
        let mut message = format!(
            "Synchronization completed: {} created, {} deleted",
            progress.items_created, progress.items_deleted
        );
        if progress.items_failed > 0 {
            message.push_str(&format!(", {} failed", progress.items_failed));
        }
        if progress.index_degraded {
            message.push_str(" (existing tasks could only be partially listed)");
        }
        Self::new(mapping_id, SummaryStatus::Success, progress, message)
    }

    pub(crate) fn failed(mapping_id: Uuid, progress: Progress, error: &Error) -> Self {
        let status = if progress.changed_anything() {
            SummaryStatus::PartialError
        } else {
            SummaryStatus::Error
        };
        Self::new(mapping_id, status, progress, format!("Synchronization failed: {}", **error))
    }

    fn new(mapping_id: Uuid, status: SummaryStatus, progress: Progress, message: String) -> Self {
        Self {
            mapping_id,
            status,
            items_created: progress.items_created,
            items_deleted: progress.items_deleted,
            items_failed: progress.items_failed,
            items_total: progress.items_total,
            index_degraded: progress.index_degraded,
            message,
        }
    }
}
