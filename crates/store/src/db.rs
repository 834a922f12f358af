//! Database connection management.

use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// The reader's database has a single writer: us, while it is mounted.
const MAX_CONNECTIONS: u32 = 1;

/// Connection to the reader's database.
///
/// Open it once per sync run and [`close`](Self::close) it at the end; the
/// database lives on removable media and should be left consistent before
/// the device is ejected.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(Self { pool })
    }

    /// Connect to an existing reader database.
    ///
    /// The file is never created: the schema belongs to the reader's
    /// firmware, and a missing file means the device root is wrong.
    #[instrument(level = "debug")]
    pub async fn connect(path: &Path) -> Result<Self> {
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let options = Self::base_options().filename(path).create_if_missing(false);
        Self::new(options).await
    }

    /// Connect to an in-memory database holding an empty `content` table
    /// (useful for testing).
    ///
    /// Note: do NOT apply `#[cfg(test)]` so that other crates can also use
    /// this in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        let db = Self::new(options).await?;
        sqlx::raw_sql(include_str!("../queries/create_content_table.sql"))
            .execute(&db.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(db)
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // Keep the firmware's rollback journal; a WAL file left behind on
            // the device is not something the reader expects to find.
            .journal_mode(SqliteJournalMode::Delete)
            // The device can be unplugged at any moment.
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(Duration::from_millis(1500))
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection. The instance should not be used afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory() {
        let db = Database::connect_in_memory().await.unwrap();
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM content").fetch_one(db.pool()).await.unwrap();
        assert_eq!(row.0, 0);
        db.close().await;
        assert!(db.pool().is_closed());
    }

    #[tokio::test]
    async fn test_connect_never_creates() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(".kobo/KoboReader.sqlite");
        let err = Database::connect(&path).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_connect_existing_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("KoboReader.sqlite");
        let options = SqliteConnectOptions::new().filename(&path).create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        sqlx::raw_sql(include_str!("../queries/create_content_table.sql")).execute(&pool).await.unwrap();
        pool.close().await;

        let db = Database::connect(&path).await.unwrap();
        let row: (String,) = sqlx::query_as("PRAGMA journal_mode").fetch_one(db.pool()).await.unwrap();
        assert_eq!(row.0, "delete");
        db.close().await;
    }
}
