//! Lookup and update of book rows in the reader's `content` table.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{CatalogRecord, ContentRow, ReadStatus, RecordMetadata};
use exn::ResultExt;
use sqlx::SqlitePool;

/// `ContentType` of a top-level book row (chapters and other entries use
/// other values).
pub const CONTENT_TYPE_BOOK: i64 = 6;

/// Repository over the reader's book rows.
///
/// The reader creates and deletes rows as it indexes its storage; this
/// repository only ever finds and updates them.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), dry_run: false }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    ///
    /// In dry-run mode lookups hit the database but updates are skipped (and
    /// reported as successful).
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    /// Find a book row by its content identifier.
    ///
    /// `None` means the reader has not indexed the book yet.
    pub async fn find(&self, content_id: impl AsRef<str>) -> Result<Option<CatalogRecord>> {
        let row: Option<ContentRow> = sqlx::query_as(include_str!("../queries/find_content.sql"))
            .bind(content_id.as_ref())
            .bind(CONTENT_TYPE_BOOK)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(CatalogRecord::try_from).transpose()
    }

    /// Overwrite a book row's metadata and, if given, its read status.
    ///
    /// The write is committed before returning. Returns `false` if no row
    /// matched.
    pub async fn update(
        &self,
        content_id: impl AsRef<str>,
        metadata: &RecordMetadata,
        status: Option<ReadStatus>,
    ) -> Result<bool> {
        if self.dry_run {
            return Ok(true);
        }
        let query = match status {
            Some(_) => include_str!("../queries/update_metadata_and_status.sql"),
            None => include_str!("../queries/update_metadata.sql"),
        };
        let mut query = sqlx::query(query)
            .bind(metadata.title.as_deref())
            .bind(metadata.subtitle.as_deref())
            .bind(metadata.attribution.as_deref())
            .bind(metadata.description.as_deref())
            .bind(metadata.series.as_deref())
            .bind(metadata.series_number.as_deref())
            .bind(metadata.series_number_float)
            .bind(metadata.series_id.as_deref());
        if let Some(status) = status {
            query = query.bind(status.code());
        }
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let result = query
            .bind(content_id.as_ref())
            .bind(CONTENT_TYPE_BOOK)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT_ID: &str = "file:///mnt/onboard/abs-library/lib_1/Author/Title/Title.epub";

    async fn seeded() -> (Database, Repository) {
        let db = Database::connect_in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO content (ContentID, ContentType, Title, Attribution, ReadStatus) VALUES (?, '6', 'Old Title', 'Author', 1)",
        )
        .bind(CONTENT_ID)
        .execute(db.pool())
        .await
        .unwrap();
        // Same key but not a book row: never matched.
        sqlx::query("INSERT INTO content (ContentID, ContentType, Title) VALUES (?, '9', 'Chapter')")
            .bind(format!("{CONTENT_ID}#chapter1"))
            .execute(db.pool())
            .await
            .unwrap();
        let repo = Repository::from(&db);
        (db, repo)
    }

    fn metadata(title: &str) -> RecordMetadata {
        RecordMetadata {
            title: Some(title.to_string()),
            attribution: Some("Author".to_string()),
            series: Some("Series".to_string()),
            series_number: Some("2.5".to_string()),
            series_number_float: Some(2.5),
            series_id: Some("ser_1".to_string()),
            ..RecordMetadata::default()
        }
    }

    #[tokio::test]
    async fn test_find() {
        let (db, repo) = seeded().await;
        let record = repo.find(CONTENT_ID).await.unwrap().unwrap();
        assert_eq!(record.content_id, CONTENT_ID);
        assert_eq!(record.metadata.title.as_deref(), Some("Old Title"));
        assert_eq!(record.metadata.subtitle, None);
        assert_eq!(record.read_status, ReadStatus::InProgress);
        db.close().await;
    }

    #[tokio::test]
    async fn test_find_missing() {
        let (db, repo) = seeded().await;
        assert!(repo.find("file:///mnt/onboard/abs-library/lib_1/Other/Other.epub").await.unwrap().is_none());
        assert!(repo.find(format!("{CONTENT_ID}#chapter1")).await.unwrap().is_none());
        db.close().await;
    }

    #[tokio::test]
    async fn test_update_metadata_only() {
        let (db, repo) = seeded().await;
        assert!(repo.update(CONTENT_ID, &metadata("New Title"), None).await.unwrap());
        let record = repo.find(CONTENT_ID).await.unwrap().unwrap();
        assert_eq!(record.metadata, metadata("New Title"));
        assert_eq!(record.read_status, ReadStatus::InProgress);
        db.close().await;
    }

    #[tokio::test]
    async fn test_update_metadata_and_status() {
        let (db, repo) = seeded().await;
        assert!(repo.update(CONTENT_ID, &metadata("Old Title"), Some(ReadStatus::Finished)).await.unwrap());
        let record = repo.find(CONTENT_ID).await.unwrap().unwrap();
        assert_eq!(record.read_status, ReadStatus::Finished);
        let code: (i64,) = sqlx::query_as("SELECT ReadStatus FROM content WHERE ContentID = ?")
            .bind(CONTENT_ID)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(code.0, 2);
        db.close().await;
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let (db, repo) = seeded().await;
        assert!(!repo.update("file:///nowhere.epub", &metadata("x"), None).await.unwrap());
        db.close().await;
    }

    #[tokio::test]
    async fn test_dry_run_does_not_write() {
        let (db, _) = seeded().await;
        let repo = Repository::new(db.pool().clone(), true);
        assert!(repo.update(CONTENT_ID, &metadata("New Title"), Some(ReadStatus::Finished)).await.unwrap());
        let record = repo.find(CONTENT_ID).await.unwrap().unwrap();
        assert_eq!(record.metadata.title.as_deref(), Some("Old Title"));
        assert_eq!(record.read_status, ReadStatus::InProgress);
        db.close().await;
    }
}
