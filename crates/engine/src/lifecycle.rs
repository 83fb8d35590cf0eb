//! Provisioning and tearing down dataset/project mappings.

use crate::classify::classify_dataset_kind;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use labelsync_mapping::{Mapping, Repository};
use labelsync_remote::{DestinationHandle, SourceHandle};
use tracing::instrument;
use uuid::Uuid;

/// Which mapping to tear down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TeardownTarget {
    Mapping(Uuid),
    DestinationProject(String),
}

/// Create a destination project for a source dataset and record the mapping.
///
/// The project is titled after the dataset and set up for the media category
/// its kind code suggests. A dataset may be provisioned more than once; each
/// call creates a new project.
///
/// If the mapping cannot be recorded, the freshly created project is deleted
/// again so that it is not left orphaned.
#[instrument(skip(source, destination, repository))]
pub async fn provision(
    source: &SourceHandle,
    destination: &DestinationHandle,
    repository: &Repository,
    dataset_id: &str,
) -> Result<Mapping> {
    let dataset = source
        .dataset(dataset_id)
        .await
        .or_raise(|| ErrorKind::Source)?
        .ok_or_raise(|| ErrorKind::DatasetNotFound(dataset_id.to_string()))?;
    let category = classify_dataset_kind(dataset.kind_code.as_deref());
    let project = destination
        .create_project(&dataset.name, dataset.description.as_deref().unwrap_or_default(), category)
        .await
        .or_raise(|| ErrorKind::Destination)?;
    tracing::info!(dataset_id, project_id = %project.id, %category, "Created destination project");
    match repository.create(dataset_id, project.id.as_str(), Some(project.title.clone())).await {
        Ok(mapping) => Ok(mapping),
        Err(e) => {
            if let Err(cleanup) = destination.delete_project(&project.id).await {
                tracing::warn!(project_id = %project.id, error = %*cleanup, "Failed to remove orphaned project");
            }
            Err(e.raise(ErrorKind::Store))
        },
    }
}

/// Remove a mapping's destination project and soft-delete the mapping.
///
/// Deleting the project is best-effort: if the destination refuses, the
/// failure is logged and the mapping is retired anyway. Returns the mapping
/// in its deleted state.
#[instrument(skip(destination, repository))]
pub async fn teardown(
    destination: &DestinationHandle,
    repository: &Repository,
    target: TeardownTarget,
) -> Result<Mapping> {
    let mapping = match &target {
        TeardownTarget::Mapping(id) => repository
            .get(*id)
            .await
            .or_raise(|| ErrorKind::Store)?
            .ok_or_raise(|| ErrorKind::MappingNotFound(*id))?,
        TeardownTarget::DestinationProject(project_id) => repository
            .get_by_destination_project(project_id)
            .await
            .or_raise(|| ErrorKind::Store)?
            .ok_or_raise(|| ErrorKind::ProjectNotMapped(project_id.clone()))?,
    };
    let project_id = mapping.destination_project_id.as_str();
    match destination.delete_project(project_id).await {
        Ok(true) => tracing::info!(project_id, "Deleted destination project"),
        Ok(false) => tracing::info!(project_id, "Destination project was already gone"),
        Err(e) => tracing::warn!(project_id, error = %*e, "Failed to delete destination project; retiring mapping anyway"),
    }
    if !repository.soft_delete(mapping.id).await.or_raise(|| ErrorKind::Store)? {
        exn::bail!(ErrorKind::MappingNotFound(mapping.id));
    }
    repository
        .get_any_state(mapping.id)
        .await
        .or_raise(|| ErrorKind::Store)?
        .ok_or_raise(|| ErrorKind::MappingNotFound(mapping.id))
}
