//! Destination task interface.

use crate::error::Result;
use crate::models::{DeleteOutcome, DestinationTask, MediaCategory, ProjectInfo, TaskPayload};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

pub type TaskStream<'a> = Pin<Box<dyn Stream<Item = Result<DestinationTask>> + Send + 'a>>;

/// Access to the annotation service that owns projects and tasks.
///
/// The trait mirrors what the annotation service's REST API offers and
/// nothing more: enumeration, creation (batch and single), deletion (single,
/// with a best-effort batch built on top) and project management.
#[async_trait]
pub trait DestinationProvider: Send + Sync {
    /// Name of the configured provider (used for logging only).
    fn name(&self) -> &str;

    /// Stream every task in a project.
    ///
    /// The provider pages through the listing internally, requesting
    /// `page_size` tasks per round-trip. An error item means the enumeration
    /// could not continue; implementations should not yield anything after
    /// an error.
    ///
    /// # Notes
    /// - Annotation services are known to reject a page index as invalid
    ///   near the end of an enumeration when tasks are deleted concurrently.
    ///   That surfaces here as [`InvalidPage`](crate::error::ErrorKind::InvalidPage).
    fn list_tasks<'a>(&'a self, project_id: &'a str, page_size: u64) -> TaskStream<'a>;

    /// Number of tasks currently in a project.
    async fn task_count(&self, project_id: &str) -> Result<u64>;

    /// Create many tasks in one request.
    ///
    /// Returns the number of tasks the destination reports as created. The
    /// request either succeeds as a whole or fails as a whole.
    async fn create_tasks(&self, project_id: &str, tasks: &[TaskPayload]) -> Result<u64>;

    /// Create a single task.
    async fn create_task(&self, project_id: &str, task: &TaskPayload) -> Result<()>;

    /// Delete a single task.
    ///
    /// Returns `Ok(false)` if the task did not exist.
    async fn delete_task(&self, task_id: u64) -> Result<bool>;

    /// Delete many tasks, best-effort.
    ///
    /// Never fails as a whole: every task is attempted and the outcome is
    /// tallied. The default implementation deletes tasks one at a time via
    /// [`delete_task()`](Self::delete_task), counting both errors and missing
    /// tasks as failures.
    async fn delete_tasks(&self, task_ids: &[u64]) -> DeleteOutcome {
        let mut outcome = DeleteOutcome::default();
        for &task_id in task_ids {
            match self.delete_task(task_id).await {
                Ok(deleted) => outcome.record(deleted),
                Err(e) => {
                    tracing::warn!(destination = self.name(), task_id, error = %*e, "Failed to delete task");
                    outcome.record(false);
                },
            }
        }
        outcome
    }

    /// Create a project whose labelling interface suits `category`.
    async fn create_project(&self, title: &str, description: &str, category: MediaCategory) -> Result<ProjectInfo>;

    /// Delete a project and all of its tasks.
    ///
    /// Returns `Ok(false)` if the project did not exist.
    async fn delete_project(&self, project_id: &str) -> Result<bool>;
}
