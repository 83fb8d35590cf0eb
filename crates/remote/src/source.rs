//! Source listing interface.

use crate::error::Result;
use crate::models::{DatasetInfo, FilePage, ItemStatus};
use async_trait::async_trait;

/// Read-only access to the dataset-management service, the source of record
/// for files.
///
/// Implementations are plain request/response wrappers: they should not
/// retry, filter or cache. Paging decisions belong to the caller.
///
/// # Examples
///
/// ```
/// use labelsync_remote::{error::Result, source::SourceProvider};
///
/// async fn first_page_len(source: &dyn SourceProvider, dataset: &str) -> Result<usize> {
///     let page = source.list_files(dataset, 0, 50, None).await?;
///     Ok(page.items.len())
/// }
/// ```
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Name of the configured provider (used for logging only).
    fn name(&self) -> &str;

    /// Fetch descriptive information about a dataset.
    ///
    /// Returns `Ok(None)` when the dataset does not exist; errors are
    /// reserved for the request itself failing.
    async fn dataset(&self, dataset_id: &str) -> Result<Option<DatasetInfo>>;

    /// Fetch one page of a dataset's files.
    ///
    /// `page` is zero-based. When `status` is provided, the source is asked
    /// to only return items in that status; callers must not rely on the
    /// source honouring the filter.
    ///
    /// A page past the end of the listing is returned with no items rather
    /// than as an error.
    async fn list_files(
        &self,
        dataset_id: &str,
        page: u64,
        size: u64,
        status: Option<&ItemStatus>,
    ) -> Result<FilePage>;
}
