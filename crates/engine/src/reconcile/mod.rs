//! The reconciliation pass: one mapping, scanned and brought in line.

mod status;
mod summary;

pub use self::status::SyncStatus;
pub use self::summary::{ReconciliationSummary, SummaryStatus};

use self::summary::Progress;
use crate::diff::{Diff, diff};
use crate::error::{ErrorKind, Result};
use crate::index::{IndexResult, build_index};
use crate::mutate::{create_batch, delete_batch, deletion_candidates};
use crate::options::ReconcileOptions;
use crate::scan::{PageFilter, scan};
use exn::{OptionExt, ResultExt};
use futures::StreamExt;
use labelsync_mapping::MappingHandle;
use labelsync_remote::models::SourceItem;
use labelsync_remote::{DestinationHandle, SourceHandle};
use std::collections::HashSet;
use time::UtcDateTime;
use tracing::instrument;
use uuid::Uuid;

/// Runs reconciliation passes between the source and destination it was
/// built with.
///
/// A pass proceeds strictly in order: resolve the mapping and its dataset,
/// index the destination project, then for each source page diff it and
/// create what is missing before requesting the next page, and finally
/// delete tasks whose source item was never seen.
///
/// The reconciler holds no per-pass state, so passes for different mappings
/// can run concurrently on a shared instance. Passes for the *same* mapping
/// must be serialized by the caller: each builds its own index and neither
/// sees the other's creations.
#[derive(Clone)]
pub struct Reconciler {
    source: SourceHandle,
    destination: DestinationHandle,
    mappings: MappingHandle,
    options: ReconcileOptions,
}
impl Reconciler {
    pub fn new(
        source: SourceHandle,
        destination: DestinationHandle,
        mappings: MappingHandle,
        options: ReconcileOptions,
    ) -> Self {
        Self { source, destination, mappings, options }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Bring a mapping's destination project in line with its source
    /// dataset.
    ///
    /// `batch_size` overrides the configured source page size for this pass.
    ///
    /// This never returns an error: every failure is reported through the
    /// summary's status and message. Counts accumulated before a failure are
    /// kept, and the mapping's last synchronization time is only updated
    /// when the pass completes.
    #[instrument(skip(self), fields(source = self.source.name(), destination = self.destination.name()))]
    pub async fn reconcile(&self, mapping_id: Uuid, batch_size: Option<u64>) -> ReconciliationSummary {
        let mut progress = Progress::default();
        match self.run(mapping_id, batch_size, &mut progress).await {
            Ok(()) => {
                tracing::info!(
                    %mapping_id,
                    created = progress.items_created,
                    deleted = progress.items_deleted,
                    failed = progress.items_failed,
                    degraded = progress.index_degraded,
                    "Reconciliation completed"
                );
                ReconciliationSummary::completed(mapping_id, progress)
            },
            Err(e) => {
                if e.is_not_found() {
                    tracing::warn!(%mapping_id, error = %*e, "Nothing to reconcile");
                } else {
                    tracing::error!(
                        %mapping_id,
                        created = progress.items_created,
                        deleted = progress.items_deleted,
                        error = ?e,
                        "Reconciliation failed"
                    );
                }
                ReconciliationSummary::failed(mapping_id, progress, &e)
            },
        }
    }

    async fn run(&self, mapping_id: Uuid, batch_size: Option<u64>, progress: &mut Progress) -> Result<()> {
        let batch_size = batch_size.unwrap_or(self.options.batch_size);
        if batch_size == 0 {
            exn::bail!(ErrorKind::InvalidBatchSize);
        }
        let mapping = self
            .mappings
            .get(mapping_id)
            .await
            .or_raise(|| ErrorKind::Store)?
            .ok_or_raise(|| ErrorKind::MappingNotFound(mapping_id))?;
        let dataset_id = mapping.source_dataset_id.as_str();
        let project_id = mapping.destination_project_id.as_str();
        let dataset = self
            .source
            .dataset(dataset_id)
            .await
            .or_raise(|| ErrorKind::Source)?
            .ok_or_raise(|| ErrorKind::DatasetNotFound(dataset_id.to_string()))?;
        progress.items_total = dataset.file_count;
        tracing::info!(%mapping_id, dataset_id, project_id, total = dataset.file_count, "Starting reconciliation");

        let IndexResult { index, degraded, .. } =
            build_index(&self.destination, project_id, self.options.task_page_size).await;
        progress.index_degraded = degraded;

        let filter = PageFilter { page_size: batch_size, eligible_status: self.options.eligible_status.clone() };
        let mut seen: HashSet<String> = HashSet::new();
        let pages = scan(&self.source, dataset_id, &filter);
        futures::pin_mut!(pages);
        while let Some(page) = pages.next().await {
            let page = page?;
            let page_index = page.page_index;
            let Diff { to_create, already_present } = diff(page, &index);
            seen.extend(already_present);
            // The listing may shift under us; an item seen on an earlier page
            // already had its task created.
            let to_create: Vec<SourceItem> = to_create.into_iter().filter(|item| seen.insert(item.id.clone())).collect();
            let outcome = create_batch(&self.destination, project_id, dataset_id, &to_create, &self.options.path_rewrite).await;
            progress.items_created += outcome.created;
            progress.items_failed += outcome.failed;
            tracing::debug!(
                page = page_index,
                created = outcome.created,
                failed = outcome.failed,
                fell_back = outcome.fell_back,
                "Reconciled source page"
            );
        }

        let stale = deletion_candidates(&index, &seen);
        let deleted = delete_batch(&self.destination, &stale).await;
        progress.items_deleted += deleted.successful;
        progress.items_failed += deleted.failed;

        let updated = self
            .mappings
            .update_last_synchronized(mapping_id, UtcDateTime::now())
            .await
            .or_raise(|| ErrorKind::Store)?;
        if !updated {
            tracing::warn!(%mapping_id, "Mapping was removed during reconciliation");
        }
        Ok(())
    }
}
