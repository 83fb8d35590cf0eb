//! In-memory source and destination providers for testing.
//!
//! Both mocks keep their state behind a [`RwLock`] so every trait method can
//! operate on `&self`, and both can be told to misbehave in the specific ways
//! real remotes do (failing pages, rejected payloads, listings that break off
//! half-way through).

use crate::destination::{DestinationProvider, TaskStream};
use crate::error::{ErrorKind, Result};
use crate::models::{
    DatasetInfo, DestinationTask, FilePage, ItemStatus, MediaCategory, Metadata, ProjectInfo, SOURCE_ITEM_ID_KEY,
    SourceItem, TaskPayload,
};
use crate::source::SourceProvider;
use async_stream::stream;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Build an eligible [`SourceItem`] with sensible defaults for tests.
///
/// # Example
///
/// ```
/// use labelsync_remote::mock::item;
///
/// let photo = item("a", "jpg");
/// assert_eq!(photo.storage_locator, "/dataset/a.jpg");
/// ```
pub fn item(id: impl Into<String>, type_descriptor: impl Into<String>) -> SourceItem {
    let id = id.into();
    let type_descriptor = type_descriptor.into();
    SourceItem {
        storage_locator: format!("/dataset/{id}.{type_descriptor}"),
        display_name: format!("{id}.{type_descriptor}"),
        size: 1024,
        status: ItemStatus::Completed,
        id,
        type_descriptor,
    }
}

struct Dataset {
    info: DatasetInfo,
    items: Vec<SourceItem>,
}

/// In-memory dataset-management service.
///
/// # Examples
///
/// ```
/// use labelsync_remote::mock::{MockSource, item};
/// use labelsync_remote::SourceProvider;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = MockSource::default().with_dataset("d1", [item("a", "jpg"), item("b", "png")]);
/// let page = source.list_files("d1", 0, 10, None).await.unwrap();
/// assert_eq!(page.items.len(), 2);
/// assert_eq!(page.total_pages, 1);
/// # Ok(())
/// # }
/// ```
pub struct MockSource {
    name: String,
    datasets: RwLock<HashMap<String, Dataset>>,
    failing_pages: RwLock<HashSet<u64>>,
    declared_total_pages: RwLock<Option<u64>>,
    page_requests: AtomicU64,
}
impl Default for MockSource {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            datasets: RwLock::new(HashMap::new()),
            failing_pages: RwLock::new(HashSet::new()),
            declared_total_pages: RwLock::new(None),
            page_requests: AtomicU64::new(0),
        }
    }
}
impl MockSource {
    /// Add a dataset with the given items. The dataset's declared file count
    /// is the number of items, whatever their status.
    pub fn with_dataset(mut self, id: impl Into<String>, items: impl IntoIterator<Item = SourceItem>) -> Self {
        let id = id.into();
        let items: Vec<_> = items.into_iter().collect();
        let info = DatasetInfo {
            id: id.clone(),
            name: format!("Dataset {id}"),
            description: None,
            kind_code: None,
            file_count: items.len() as u64,
        };
        self.datasets.get_mut().insert(id, Dataset { info, items });
        self
    }

    /// Override the dataset's descriptive information (items are kept).
    pub fn with_info(mut self, info: DatasetInfo) -> Self {
        if let Some(dataset) = self.datasets.get_mut().get_mut(&info.id) {
            dataset.info = info;
        }
        self
    }

    /// Replace the items of a dataset, simulating changes between passes.
    pub async fn set_items(&self, dataset_id: &str, items: impl IntoIterator<Item = SourceItem>) {
        if let Some(dataset) = self.datasets.write().await.get_mut(dataset_id) {
            dataset.items = items.into_iter().collect();
            dataset.info.file_count = dataset.items.len() as u64;
        }
    }

    /// Make every request for the given page index fail with a network error.
    pub async fn fail_page(&self, page: u64) {
        self.failing_pages.write().await.insert(page);
    }

    /// Declare a fixed number of total pages, regardless of the items held.
    pub async fn declare_total_pages(&self, total_pages: u64) {
        *self.declared_total_pages.write().await = Some(total_pages);
    }

    /// Number of `list_files` calls served so far.
    pub fn page_requests(&self) -> u64 {
        self.page_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceProvider for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn dataset(&self, dataset_id: &str) -> Result<Option<DatasetInfo>> {
        Ok(self.datasets.read().await.get(dataset_id).map(|d| d.info.clone()))
    }

    async fn list_files(
        &self,
        dataset_id: &str,
        page: u64,
        size: u64,
        status: Option<&ItemStatus>,
    ) -> Result<FilePage> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        if self.failing_pages.read().await.contains(&page) {
            exn::bail!(ErrorKind::Network(format!("page {page} of {dataset_id} timed out")));
        }
        if size == 0 {
            exn::bail!(ErrorKind::Rejected("page size must be positive".to_string()));
        }
        let guard = self.datasets.read().await;
        let dataset = guard.get(dataset_id).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(dataset_id.to_string())))?;
        let matching: Vec<&SourceItem> =
            dataset.items.iter().filter(|item| status.is_none_or(|status| &item.status == status)).collect();
        let total_elements = matching.len() as u64;
        let total_pages = match *self.declared_total_pages.read().await {
            Some(declared) => declared,
            None => total_elements.div_ceil(size),
        };
        let items = matching
            .into_iter()
            .skip(usize::try_from(page.saturating_mul(size)).unwrap_or(usize::MAX))
            .take(usize::try_from(size).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(FilePage { items, page, size, total_pages, total_elements })
    }
}

/// In-memory annotation service.
///
/// Task identifiers are assigned sequentially starting at 1, project
/// identifiers sequentially starting at 100.
///
/// # Examples
///
/// ```
/// use labelsync_remote::mock::MockDestination;
/// use labelsync_remote::DestinationProvider;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let destination = MockDestination::default().with_tasks("p1", ["a", "b"]);
/// assert_eq!(destination.task_count("p1").await.unwrap(), 2);
/// # Ok(())
/// # }
/// ```
pub struct MockDestination {
    name: String,
    // Task ID => (project ID, task)
    tasks: RwLock<BTreeMap<u64, (String, DestinationTask)>>,
    projects: RwLock<BTreeMap<String, ProjectInfo>>,
    next_task_id: AtomicU64,
    next_project_id: AtomicU64,
    faults: RwLock<Faults>,
    batch_create_calls: AtomicU64,
    single_create_calls: AtomicU64,
}

#[derive(Default)]
struct Faults {
    batch_create: bool,
    rejected_items: HashSet<String>,
    listing_breaks_after: Option<usize>,
    undeletable: HashSet<u64>,
    project_deletion: bool,
}

impl Default for MockDestination {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            tasks: RwLock::new(BTreeMap::new()),
            projects: RwLock::new(BTreeMap::new()),
            next_task_id: AtomicU64::new(1),
            next_project_id: AtomicU64::new(100),
            faults: RwLock::new(Faults::default()),
            batch_create_calls: AtomicU64::new(0),
            single_create_calls: AtomicU64::new(0),
        }
    }
}
impl MockDestination {
    /// Pre-populate a project with tasks back-referencing the given source
    /// item IDs.
    pub fn with_tasks(mut self, project_id: impl Into<String>, source_ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let project_id = project_id.into();
        {
            let tasks = self.tasks.get_mut();
            for source_id in source_ids {
                let mut metadata = Metadata::new();
                metadata.insert(SOURCE_ITEM_ID_KEY.to_string(), Value::String(source_id.into()));
                let id = self.next_task_id.fetch_add(1, Ordering::SeqCst);
                tasks.insert(id, (project_id.clone(), DestinationTask { id, metadata }));
            }
        }
        self.projects.get_mut().insert(
            project_id.clone(),
            ProjectInfo { title: format!("Project {project_id}"), id: project_id },
        );
        self
    }

    /// Add a task with arbitrary metadata (e.g. one created by hand in the
    /// annotation service, without a back-reference).
    pub async fn insert_task(&self, project_id: &str, metadata: Metadata) -> u64 {
        let id = self.next_task_id.fetch_add(1, Ordering::SeqCst);
        self.tasks.write().await.insert(id, (project_id.to_string(), DestinationTask { id, metadata }));
        id
    }

    /// Make every batch creation fail.
    pub async fn fail_batch_create(&self, fail: bool) {
        self.faults.write().await.batch_create = fail;
    }

    /// Reject (on both the batch and the single path) any payload that
    /// back-references one of these source items.
    pub async fn reject_items(&self, source_ids: impl IntoIterator<Item = impl Into<String>>) {
        self.faults.write().await.rejected_items.extend(source_ids.into_iter().map(Into::into));
    }

    /// Break task enumeration off with an invalid-page error after `count`
    /// tasks have been yielded.
    pub async fn break_listing_after(&self, count: usize) {
        self.faults.write().await.listing_breaks_after = Some(count);
    }

    /// Make deletion of the given task fail.
    pub async fn fail_delete(&self, task_id: u64) {
        self.faults.write().await.undeletable.insert(task_id);
    }

    /// Make project deletion fail.
    pub async fn fail_project_deletion(&self) {
        self.faults.write().await.project_deletion = true;
    }

    /// All tasks in a project, ordered by task ID.
    pub async fn tasks(&self, project_id: &str) -> Vec<DestinationTask> {
        self.tasks.read().await.values().filter(|(p, _)| p == project_id).map(|(_, task)| task.clone()).collect()
    }

    /// The set of source item IDs back-referenced by a project's tasks.
    pub async fn source_ids(&self, project_id: &str) -> BTreeSet<String> {
        self.tasks(project_id).await.iter().filter_map(DestinationTask::source_item_id).collect()
    }

    pub async fn project(&self, project_id: &str) -> Option<ProjectInfo> {
        self.projects.read().await.get(project_id).cloned()
    }

    pub fn batch_create_calls(&self) -> u64 {
        self.batch_create_calls.load(Ordering::SeqCst)
    }

    pub fn single_create_calls(&self) -> u64 {
        self.single_create_calls.load(Ordering::SeqCst)
    }

    async fn is_rejected(&self, task: &TaskPayload) -> bool {
        let faults = self.faults.read().await;
        task.source_item_id().is_some_and(|id| faults.rejected_items.contains(&id))
    }

    async fn insert_payload(&self, project_id: &str, task: &TaskPayload) -> u64 {
        self.insert_task(project_id, task.meta.clone()).await
    }
}

#[async_trait]
impl DestinationProvider for MockDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_tasks<'a>(&'a self, project_id: &'a str, page_size: u64) -> TaskStream<'a> {
        Box::pin(stream! {
            if page_size == 0 {
                yield Err(exn::Exn::from(ErrorKind::Rejected("page size must be positive".to_string())));
                return;
            }
            // Snapshot under the read lock, then drop it before yielding.
            let tasks = self.tasks(project_id).await;
            let breaks_after = self.faults.read().await.listing_breaks_after;
            for (yielded, task) in tasks.into_iter().enumerate() {
                if breaks_after.is_some_and(|limit| yielded >= limit) {
                    yield Err(exn::Exn::from(ErrorKind::InvalidPage(yielded as u64 / page_size + 1)));
                    return;
                }
                yield Ok(task);
            }
        })
    }

    async fn task_count(&self, project_id: &str) -> Result<u64> {
        Ok(self.tasks.read().await.values().filter(|(p, _)| p == project_id).count() as u64)
    }

    async fn create_tasks(&self, project_id: &str, tasks: &[TaskPayload]) -> Result<u64> {
        self.batch_create_calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.read().await.batch_create {
            exn::bail!(ErrorKind::Network("batch import timed out".to_string()));
        }
        for task in tasks {
            if self.is_rejected(task).await {
                exn::bail!(ErrorKind::Rejected(format!("{:?}", task.source_item_id())));
            }
        }
        for task in tasks {
            self.insert_payload(project_id, task).await;
        }
        Ok(tasks.len() as u64)
    }

    async fn create_task(&self, project_id: &str, task: &TaskPayload) -> Result<()> {
        self.single_create_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_rejected(task).await {
            exn::bail!(ErrorKind::Rejected(format!("{:?}", task.source_item_id())));
        }
        self.insert_payload(project_id, task).await;
        Ok(())
    }

    async fn delete_task(&self, task_id: u64) -> Result<bool> {
        if self.faults.read().await.undeletable.contains(&task_id) {
            exn::bail!(ErrorKind::Network(format!("deleting task {task_id} timed out")));
        }
        Ok(self.tasks.write().await.remove(&task_id).is_some())
    }

    async fn create_project(&self, title: &str, _description: &str, _category: MediaCategory) -> Result<ProjectInfo> {
        let id = self.next_project_id.fetch_add(1, Ordering::SeqCst).to_string();
        let project = ProjectInfo { id: id.clone(), title: title.to_string() };
        self.projects.write().await.insert(id, project.clone());
        Ok(project)
    }

    async fn delete_project(&self, project_id: &str) -> Result<bool> {
        if self.faults.read().await.project_deletion {
            exn::bail!(ErrorKind::Network(format!("deleting project {project_id} timed out")));
        }
        let existed = self.projects.write().await.remove(project_id).is_some();
        self.tasks.write().await.retain(|_, (p, _)| p != project_id);
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_source_paginates() {
        let source = MockSource::default().with_dataset("d1", ["a", "b", "c", "d", "e"].map(|id| item(id, "jpg")));
        let first = source.list_files("d1", 0, 2, None).await.unwrap();
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total_elements, 5);
        assert_eq!(first.items.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), ["a", "b"]);
        let last = source.list_files("d1", 2, 2, None).await.unwrap();
        assert_eq!(last.items.len(), 1);
        let beyond = source.list_files("d1", 3, 2, None).await.unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(source.page_requests(), 3);
    }

    #[tokio::test]
    async fn test_source_filters_by_status() {
        let mut processing = item("b", "jpg");
        processing.status = ItemStatus::Processing;
        let source = MockSource::default().with_dataset("d1", [item("a", "jpg"), processing]);
        let page = source.list_files("d1", 0, 10, Some(&ItemStatus::Completed)).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_elements, 1);
        // The declared file count ignores status.
        assert_eq!(source.dataset("d1").await.unwrap().unwrap().file_count, 2);
    }

    #[tokio::test]
    async fn test_source_failing_page() {
        let source = MockSource::default().with_dataset("d1", [item("a", "jpg")]);
        source.fail_page(0).await;
        let err = source.list_files("d1", 0, 10, None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
    }

    #[tokio::test]
    async fn test_source_unknown_dataset() {
        let source = MockSource::default();
        assert!(source.dataset("nope").await.unwrap().is_none());
        let err = source.list_files("nope", 0, 10, None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_destination_listing_breaks_off() {
        let destination = MockDestination::default().with_tasks("p1", ["a", "b", "c"]);
        destination.break_listing_after(2).await;
        let results: Vec<_> = destination.list_tasks("p1", 1).collect().await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok() && results[1].is_ok());
        assert!(matches!(&**results[2].as_ref().unwrap_err(), ErrorKind::InvalidPage(_)));
    }

    #[tokio::test]
    async fn test_destination_batch_rejection_is_all_or_nothing() {
        let destination = MockDestination::default();
        destination.reject_items(["b"]).await;
        let payloads: Vec<TaskPayload> = ["a", "b"]
            .into_iter()
            .map(|id| {
                let mut meta = Metadata::new();
                meta.insert(SOURCE_ITEM_ID_KEY.to_string(), Value::String(id.to_string()));
                TaskPayload { data: Metadata::new(), meta }
            })
            .collect();
        assert!(destination.create_tasks("p1", &payloads).await.is_err());
        assert_eq!(destination.task_count("p1").await.unwrap(), 0);
        destination.create_task("p1", &payloads[0]).await.unwrap();
        assert!(destination.create_task("p1", &payloads[1]).await.is_err());
        assert_eq!(destination.source_ids("p1").await, BTreeSet::from(["a".to_string()]));
    }

    #[tokio::test]
    async fn test_destination_default_batch_delete_tallies() {
        let destination = MockDestination::default().with_tasks("p1", ["a", "b", "c"]);
        destination.fail_delete(2).await;
        let outcome = destination.delete_tasks(&[1, 2, 3, 99]).await;
        assert_eq!(outcome.successful, 2);
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.total, 4);
        assert_eq!(destination.source_ids("p1").await, BTreeSet::from(["b".to_string()]));
    }

    #[tokio::test]
    async fn test_destination_projects() {
        let destination = MockDestination::default();
        let project = destination.create_project("Dataset d1", "", MediaCategory::Audio).await.unwrap();
        assert_eq!(project.id, "100");
        assert!(destination.project("100").await.is_some());
        assert!(destination.delete_project("100").await.unwrap());
        assert!(!destination.delete_project("100").await.unwrap());
    }
}
