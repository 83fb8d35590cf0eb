//! Connection pool for the mapping store.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

// The store is touched twice per reconciliation pass; a handful of
// connections covers several passes running side by side.
const MAX_CONNECTIONS: u32 = 4;
// Concurrent passes for different mappings may each want to record their
// completion at the same moment.
const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);

/// Handle to the mapping database.
///
/// Cloning is cheap and shares the underlying pool. Migrations are applied
/// before a `Database` is handed out, so every handle sees the current
/// schema.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the mapping database stored at `path`, creating the file if it
    /// does not exist yet. The parent directory must already exist.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = Self::connect_options().filename(path.as_ref()).create_if_missing(true);
        Self::open(SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS), options).await
    }

    /// Open a private, empty in-memory database.
    ///
    /// Not gated behind `#[cfg(test)]`: other crates use it in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        // Every connection to ":memory:" gets its own database, and the
        // database disappears with its connection. Keep exactly one, forever.
        let pool = SqlitePoolOptions::new().min_connections(1).max_connections(1).idle_timeout(None).max_lifetime(None);
        Self::open(pool, Self::connect_options().filename(":memory:")).await
    }

    async fn open(pool: SqlitePoolOptions, options: SqliteConnectOptions) -> Result<Self> {
        let pool = pool
            // Runs on every new connection, not just the first.
            .after_connect(|conn, meta| Box::pin(async move { Self::session_pragmas(conn, meta).await }))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    fn connect_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT)
    }

    /// PRAGMAs that `SqliteConnectOptions` has no setter for.
    async fn session_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query("PRAGMA temp_store = MEMORY;").execute(conn).await?;
        Ok(())
    }

    #[instrument("applying mapping store migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for outstanding queries, then close every connection. Handles
    /// (and repositories) sharing this pool are unusable afterwards.
    pub async fn close(&self) {
        if let Err(e) = sqlx::query("PRAGMA optimize").execute(&self.pool).await {
            tracing::debug!(error = %e, "Could not optimize mapping database before closing");
        }
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory() {
        let db = Database::connect_in_memory().await.unwrap();
        let (tables,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'mappings'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(tables, 1);
        db.close().await;
        assert!(db.pool().is_closed());
    }

    #[tokio::test]
    async fn test_in_memory_databases_are_private() {
        let first = Database::connect_in_memory().await.unwrap();
        let second = Database::connect_in_memory().await.unwrap();
        crate::Repository::from(&first).create("d1", "p1", None).await.unwrap();
        assert_eq!(crate::Repository::from(&second).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_to_file_creates_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.sqlite");
        let db = Database::connect(&path).await.unwrap();
        assert!(path.exists());
        let (foreign_keys,): (i64,) = sqlx::query_as("PRAGMA foreign_keys").fetch_one(db.pool()).await.unwrap();
        assert_eq!(foreign_keys, 1);
        let (journal_mode,): (String,) = sqlx::query_as("PRAGMA journal_mode").fetch_one(db.pool()).await.unwrap();
        assert_eq!(journal_mode, "wal");
        db.close().await;
    }
}
