//! Repository for mapping entities.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{Mapping, MappingRow};
use exn::ResultExt;
use sqlx::SqlitePool;
use time::UtcDateTime;
use uuid::Uuid;

/// Repository for managing mappings in the database.
///
/// Every lookup except [`get_any_state()`](Self::get_any_state) and
/// [`list_by_source_dataset()`](Self::list_by_source_dataset) (when asked to)
/// only sees **active** mappings; soft-deleted mappings stay in the table for
/// the record but are otherwise invisible.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn rows_into_mappings(rows: Vec<MappingRow>) -> Result<Vec<Mapping>> {
        rows.into_iter().map(Mapping::try_from).collect()
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Record a new, active mapping between a source dataset and a
    /// destination project.
    ///
    /// Returns [`ErrorKind::Conflict`] if an active mapping already links the
    /// same dataset and project. Linking the same dataset to a *different*
    /// project is fine.
    pub async fn create(
        &self,
        source_dataset_id: impl Into<String>,
        destination_project_id: impl Into<String>,
        destination_project_name: Option<String>,
    ) -> Result<Mapping> {
        let source_dataset_id = source_dataset_id.into();
        let destination_project_id = destination_project_id.into();
        let id = Uuid::new_v4();
        let created_at = UtcDateTime::now();
        tracing::info!(mapping_id = %id, dataset_id = %source_dataset_id, project_id = %destination_project_id, "Creating mapping");
        let result = sqlx::query(include_str!("../queries/insert_mapping.sql"))
            .bind(id.to_string())
            .bind(&source_dataset_id)
            .bind(&destination_project_id)
            .bind(&destination_project_name)
            .bind(created_at.unix_timestamp())
            .execute(&self.pool)
            .await;
        if let Err(sqlx::Error::Database(e)) = &result
            && e.is_unique_violation()
        {
            exn::bail!(ErrorKind::Conflict(source_dataset_id, destination_project_id));
        }
        result.or_raise(|| ErrorKind::Database)?;
        Ok(Mapping {
            id,
            source_dataset_id,
            destination_project_id,
            destination_project_name,
            // The stored timestamp only has second precision.
            created_at: created_at.replace_nanosecond(0).or_raise(|| ErrorKind::InvalidData("creation date"))?,
            last_synchronized_at: None,
            state: crate::MappingState::Active,
        })
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// Get an active mapping by its ID.
    pub async fn get(&self, id: Uuid) -> Result<Option<Mapping>> {
        let row: Option<MappingRow> = sqlx::query_as(include_str!("../queries/get_active_by_id.sql"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Mapping::try_from).transpose()
    }

    /// Get a mapping by its ID, including soft-deleted mappings.
    pub async fn get_any_state(&self, id: Uuid) -> Result<Option<Mapping>> {
        let row: Option<MappingRow> = sqlx::query_as(include_str!("../queries/get_by_id_any_state.sql"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Mapping::try_from).transpose()
    }

    /// Get all mappings for a source dataset, newest first.
    ///
    /// A single dataset may legitimately be linked to several destination
    /// projects.
    pub async fn list_by_source_dataset(
        &self,
        source_dataset_id: impl AsRef<str>,
        include_deleted: bool,
    ) -> Result<Vec<Mapping>> {
        let rows: Vec<MappingRow> = sqlx::query_as(include_str!("../queries/list_by_source_dataset.sql"))
            .bind(source_dataset_id.as_ref())
            .bind(include_deleted)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Self::rows_into_mappings(rows)
    }

    /// Get the active mapping for a destination project.
    pub async fn get_by_destination_project(&self, destination_project_id: impl AsRef<str>) -> Result<Option<Mapping>> {
        let row: Option<MappingRow> = sqlx::query_as(include_str!("../queries/get_active_by_destination_project.sql"))
            .bind(destination_project_id.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Mapping::try_from).transpose()
    }

    /// List active mappings, newest first.
    pub async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Mapping>> {
        let rows: Vec<MappingRow> = sqlx::query_as(include_str!("../queries/list_active.sql"))
            .bind(i64::try_from(limit).or_raise(|| ErrorKind::InvalidData("limit"))?)
            .bind(i64::try_from(offset).or_raise(|| ErrorKind::InvalidData("offset"))?)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Self::rows_into_mappings(rows)
    }

    /// Count active mappings.
    pub async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(include_str!("../queries/count_active.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("count"))
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Record when the mapping was last synchronized.
    ///
    /// Returns `false` if there is no active mapping with that ID.
    pub async fn update_last_synchronized(&self, id: Uuid, at: UtcDateTime) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/update_last_synchronized.sql"))
            .bind(id.to_string())
            .bind(at.unix_timestamp())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Soft-delete a mapping.
    ///
    /// Returns `false` if there is no active mapping with that ID (including
    /// when it has already been deleted).
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/soft_delete.sql"))
            .bind(id.to_string())
            .bind(UtcDateTime::now().unix_timestamp())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(mapping_id = %id, "Soft-deleted mapping");
        } else {
            tracing::warn!(mapping_id = %id, "Mapping does not exist or is already deleted");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MappingState;

    async fn repository() -> Repository {
        let db = Database::connect_in_memory().await.unwrap();
        Repository::from(&db)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = repository().await;
        let created = repo.create("d1", "42", Some("Street signs".to_string())).await.unwrap();
        let fetched = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(fetched.is_active());
        assert_eq!(fetched.last_synchronized_at, None);
    }

    #[tokio::test]
    async fn test_get_unknown() {
        let repo = repository().await;
        assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_active_pair_is_unique() {
        let repo = repository().await;
        repo.create("d1", "42", None).await.unwrap();
        let err = repo.create("d1", "42", None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Conflict(dataset, project) if dataset == "d1" && project == "42"));
    }

    #[tokio::test]
    async fn test_dataset_fans_out_to_several_projects() {
        let repo = repository().await;
        repo.create("d1", "42", None).await.unwrap();
        repo.create("d1", "43", None).await.unwrap();
        let mappings = repo.list_by_source_dataset("d1", false).await.unwrap();
        assert_eq!(mappings.len(), 2);
        // Newest first.
        assert_eq!(mappings[0].destination_project_id, "43");
    }

    #[tokio::test]
    async fn test_soft_delete_hides_mapping() {
        let repo = repository().await;
        let mapping = repo.create("d1", "42", None).await.unwrap();
        assert!(repo.soft_delete(mapping.id).await.unwrap());
        assert!(repo.get(mapping.id).await.unwrap().is_none());
        assert!(repo.get_by_destination_project("42").await.unwrap().is_none());
        assert!(repo.list_by_source_dataset("d1", false).await.unwrap().is_empty());
        assert_eq!(repo.list_by_source_dataset("d1", true).await.unwrap().len(), 1);
        let deleted = repo.get_any_state(mapping.id).await.unwrap().unwrap();
        assert!(matches!(deleted.state, MappingState::Deleted(_)));
        // Second deletion is a no-op.
        assert!(!repo.soft_delete(mapping.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_pair_can_be_relinked_after_soft_delete() {
        let repo = repository().await;
        let first = repo.create("d1", "42", None).await.unwrap();
        repo.soft_delete(first.id).await.unwrap();
        let second = repo.create("d1", "42", None).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(repo.get_by_destination_project("42").await.unwrap().unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_update_last_synchronized() {
        let repo = repository().await;
        let mapping = repo.create("d1", "42", None).await.unwrap();
        let at = UtcDateTime::from_unix_timestamp(1_760_000_000).unwrap();
        assert!(repo.update_last_synchronized(mapping.id, at).await.unwrap());
        assert_eq!(repo.get(mapping.id).await.unwrap().unwrap().last_synchronized_at, Some(at));
        repo.soft_delete(mapping.id).await.unwrap();
        assert!(!repo.update_last_synchronized(mapping.id, at).await.unwrap());
        assert!(!repo.update_last_synchronized(Uuid::new_v4(), at).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let repo = repository().await;
        for project in ["1", "2", "3"] {
            repo.create("d1", project, None).await.unwrap();
        }
        let deleted = repo.create("d2", "4", None).await.unwrap();
        repo.soft_delete(deleted.id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 3);
        let page = repo.list(1, 10).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].destination_project_id, "2");
        assert_eq!(repo.list(0, 1).await.unwrap().len(), 1);
    }
}
