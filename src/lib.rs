//! Keeps annotation projects in step with the datasets they were created
//! from.
//!
//! [`Service`] is the entry point for an embedding application: it opens the
//! mapping database named in the [`Config`], takes the source and
//! destination providers as explicit dependencies, and exposes provisioning,
//! synchronization, status and teardown.
//!
//! This crate never installs a `tracing` subscriber; that is left to the
//! application.

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
pub use labelsync_config::Config;
pub use labelsync_engine::lifecycle::TeardownTarget;
use labelsync_engine::{ReconcileOptions, Reconciler};
pub use labelsync_engine::{ReconciliationSummary, SummaryStatus, SyncStatus};
use labelsync_mapping::{Database, Repository};
pub use labelsync_mapping::{Mapping, MappingState};
use labelsync_remote::{DestinationHandle, SourceHandle};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

fn engine_error(err: labelsync_engine::error::Error) -> error::Error {
    let kind = if err.is_not_found() {
        ErrorKind::NotFound
    } else {
        ErrorKind::Engine
    };
    err.raise(kind)
}

/// Synchronization service for one source and one destination.
pub struct Service {
    database: Database,
    repository: Repository,
    source: SourceHandle,
    destination: DestinationHandle,
    reconciler: Reconciler,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl Service {
    /// Load the configuration (see [`Config::load()`]) and connect with it.
    pub async fn open(config_file: Option<&Path>, source: SourceHandle, destination: DestinationHandle) -> Result<Self> {
        let config = Config::load(config_file).or_raise(|| ErrorKind::Config)?;
        Self::connect(&config, source, destination).await
    }

    /// Open (creating if needed) the mapping database from the configuration
    /// and build a service around it.
    pub async fn connect(config: &Config, source: SourceHandle, destination: DestinationHandle) -> Result<Self> {
        let path = &config.database.path;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Database)?;
        }
        let database = Database::connect(path).await.or_raise(|| ErrorKind::Database)?;
        tracing::info!(path = %path.display(), "Opened mapping database");
        Ok(Self::new(database, config.reconcile_options(), source, destination))
    }

    pub fn new(
        database: Database,
        options: ReconcileOptions,
        source: SourceHandle,
        destination: DestinationHandle,
    ) -> Self {
        let repository = Repository::from(&database);
        let reconciler =
            Reconciler::new(source.clone(), destination.clone(), Arc::new(repository.clone()), options);
        Self {
            database,
            repository,
            source,
            destination,
            reconciler,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Run a reconciliation pass for a mapping.
    ///
    /// Only one pass per mapping may run at a time; a second concurrent
    /// request is refused with [`ErrorKind::AlreadyRunning`] rather than
    /// queued. Once a pass has started, its outcome (including failure) is in
    /// the returned summary.
    pub async fn sync(&self, mapping_id: Uuid, batch_size: Option<u64>) -> Result<ReconciliationSummary> {
        let _guard = InFlight::acquire(&self.in_flight, mapping_id)?;
        Ok(self.reconciler.reconcile(mapping_id, batch_size).await)
    }

    /// Run a reconciliation pass for every active mapping of a dataset, one
    /// after the other.
    ///
    /// Each mapping gets its own result: one that is already being
    /// synchronized elsewhere is reported as refused and the rest still run.
    pub async fn sync_dataset(&self, source_dataset_id: &str) -> Result<Vec<(Uuid, Result<ReconciliationSummary>)>> {
        let mappings = self
            .repository
            .list_by_source_dataset(source_dataset_id, false)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut results = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            results.push((mapping.id, self.sync(mapping.id, None).await));
        }
        Ok(results)
    }

    pub async fn status(&self, source_dataset_id: &str) -> Result<Option<SyncStatus>> {
        self.reconciler.status(source_dataset_id).await.map_err(engine_error)
    }

    pub async fn provision(&self, source_dataset_id: &str) -> Result<Mapping> {
        labelsync_engine::lifecycle::provision(&self.source, &self.destination, &self.repository, source_dataset_id)
            .await
            .map_err(engine_error)
    }

    pub async fn teardown(&self, target: TeardownTarget) -> Result<Mapping> {
        labelsync_engine::lifecycle::teardown(&self.destination, &self.repository, target)
            .await
            .map_err(engine_error)
    }

    /// Active mappings, newest first.
    pub async fn mappings(&self, offset: u64, limit: u64) -> Result<Vec<Mapping>> {
        self.repository.list(offset, limit).await.or_raise(|| ErrorKind::Database)
    }

    pub async fn mapping(&self, id: Uuid) -> Result<Mapping> {
        self.repository
            .get(id)
            .await
            .or_raise(|| ErrorKind::Database)?
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound))
    }

    pub async fn close(&self) {
        self.database.close().await;
    }
}

/// Marks a mapping as being synchronized for as long as it lives.
struct InFlight {
    set: Arc<Mutex<HashSet<Uuid>>>,
    mapping_id: Uuid,
}
impl InFlight {
    fn acquire(set: &Arc<Mutex<HashSet<Uuid>>>, mapping_id: Uuid) -> Result<Self> {
        // Nothing panics while holding the lock, but don't wedge every
        // mapping if something ever does.
        if !set.lock().unwrap_or_else(PoisonError::into_inner).insert(mapping_id) {
            tracing::warn!(%mapping_id, "Refusing concurrent synchronization");
            exn::bail!(ErrorKind::AlreadyRunning(mapping_id));
        }
        Ok(Self { set: Arc::clone(set), mapping_id })
    }
}
impl Drop for InFlight {
    fn drop(&mut self) {
        self.set.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.mapping_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelsync_remote::mock::{MockDestination, MockSource, item};
    use std::collections::BTreeSet;

    async fn service(source: MockSource, destination: Arc<MockDestination>) -> Service {
        let database = Database::connect_in_memory().await.unwrap();
        Service::new(database, ReconcileOptions::default(), Arc::new(source), destination)
    }

    #[tokio::test]
    async fn test_provision_sync_teardown() {
        let destination = Arc::new(MockDestination::default());
        let service =
            service(MockSource::default().with_dataset("d1", [item("a", "jpg"), item("b", "png")]), destination.clone())
                .await;

        let mapping = service.provision("d1").await.unwrap();
        let summary = service.sync(mapping.id, None).await.unwrap();
        assert_eq!(summary.status, SummaryStatus::Success);
        assert_eq!(summary.items_created, 2);
        assert_eq!(
            destination.source_ids(&mapping.destination_project_id).await,
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );

        let status = service.status("d1").await.unwrap().unwrap();
        assert_eq!(status.sync_ratio, 1.0);

        let retired = service.teardown(TeardownTarget::Mapping(mapping.id)).await.unwrap();
        assert!(!retired.is_active());
        assert!(service.status("d1").await.unwrap().is_none());
        let err = service.mapping(mapping.id).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_sync_dataset_covers_every_project() {
        let destination = Arc::new(MockDestination::default());
        let service = service(MockSource::default().with_dataset("d1", [item("a", "jpg")]), destination.clone()).await;
        let first = service.provision("d1").await.unwrap();
        let second = service.provision("d1").await.unwrap();
        let results = service.sync_dataset("d1").await.unwrap();
        assert_eq!(results.len(), 2);
        for (_, result) in &results {
            let summary = result.as_ref().unwrap();
            assert!(summary.is_success() && summary.items_created == 1);
        }
        assert_eq!(destination.tasks(&first.destination_project_id).await.len(), 1);
        assert_eq!(destination.tasks(&second.destination_project_id).await.len(), 1);
        assert_eq!(service.mappings(0, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sync_dataset_continues_past_busy_mapping() {
        let destination = Arc::new(MockDestination::default());
        let service = service(MockSource::default().with_dataset("d1", [item("a", "jpg")]), destination.clone()).await;
        let busy = service.provision("d1").await.unwrap();
        let free = service.provision("d1").await.unwrap();
        let _guard = InFlight::acquire(&service.in_flight, busy.id).unwrap();

        let results = service.sync_dataset("d1").await.unwrap();
        assert_eq!(results.len(), 2);
        let refused = &results.iter().find(|(id, _)| *id == busy.id).unwrap().1;
        assert!(matches!(&**refused.as_ref().unwrap_err(), ErrorKind::AlreadyRunning(id) if *id == busy.id));
        let summary = results.iter().find(|(id, _)| *id == free.id).unwrap().1.as_ref().unwrap();
        assert_eq!(summary.items_created, 1);
        assert!(destination.tasks(&busy.destination_project_id).await.is_empty());
        assert_eq!(destination.tasks(&free.destination_project_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_open_with_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("labelsync.yaml");
        let err = Service::open(Some(&missing), Arc::new(MockSource::default()), Arc::new(MockDestination::default()))
            .await
            .err()
            .unwrap();
        assert!(matches!(&*err, ErrorKind::Config));
    }

    #[tokio::test]
    async fn test_open_with_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("db").join("mappings.sqlite");
        let file = dir.path().join("labelsync.json");
        std::fs::write(&file, format!(r#"{{"database": {{"path": {:?}}}, "sync": {{"batch_size": 7}}}}"#, database)).unwrap();
        let service = Service::open(Some(&file), Arc::new(MockSource::default()), Arc::new(MockDestination::default()))
            .await
            .unwrap();
        assert_eq!(service.reconciler().options().batch_size, 7);
        service.close().await;
        assert!(database.is_file());
    }

    #[tokio::test]
    async fn test_not_found_errors() {
        let service = service(MockSource::default(), Arc::new(MockDestination::default())).await;
        let err = service.provision("nope").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound));
        let err = service.teardown(TeardownTarget::DestinationProject("p1".to_string())).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound));
    }

    #[test]
    fn test_one_pass_per_mapping() {
        let set = Arc::new(Mutex::new(HashSet::new()));
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let guard = InFlight::acquire(&set, a).unwrap();
        let err = InFlight::acquire(&set, a).err().unwrap();
        assert!(matches!(&*err, ErrorKind::AlreadyRunning(id) if *id == a));
        // Other mappings are unaffected.
        let _other = InFlight::acquire(&set, b).unwrap();
        drop(guard);
        InFlight::acquire(&set, a).unwrap();
    }

    #[tokio::test]
    async fn test_connect_creates_database_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database.path = dir.path().join("nested").join("mappings.sqlite");
        let service = Service::connect(
            &config,
            Arc::new(MockSource::default()),
            Arc::new(MockDestination::default()),
        )
        .await
        .unwrap();
        assert_eq!(service.mappings(0, 10).await.unwrap().len(), 0);
        service.close().await;
        assert!(config.database.path.is_file());
    }
}
