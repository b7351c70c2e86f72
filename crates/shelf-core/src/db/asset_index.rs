//! Asset metadata index implementation

use crate::error::{Error, Result};
use crate::models::{AssetId, AssetRecord, StorageTier};
use libsql::{params, Connection};

/// Name of the legacy single-table format predating the metadata/payload split.
const LEGACY_TABLE: &str = "saved_books";

/// Trait for asset metadata index operations (async)
#[allow(async_fn_in_trait)]
pub trait AssetIndex {
    /// List all records in insertion order
    async fn list(&self) -> Result<Vec<AssetRecord>>;

    /// Insert a record, or replace the existing record with the same id
    /// without changing its position
    async fn upsert(&self, record: &AssetRecord) -> Result<()>;

    /// Find a record by id
    async fn find_by_id(&self, id: &AssetId) -> Result<Option<AssetRecord>>;

    /// Remove a record by id; removing a missing id is not an error
    async fn remove(&self, id: &AssetId) -> Result<()>;

    /// Copy the legacy single-table format into the current format, then
    /// drop the legacy table
    ///
    /// Runs only when the current index is empty and legacy data exists.
    /// Returns the number of migrated records.
    async fn migrate_legacy_format(&self) -> Result<usize>;
}

/// libSQL implementation of `AssetIndex`
pub struct LibSqlAssetIndex<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlAssetIndex<'a> {
    /// Create a new index with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_record(row: &libsql::Row) -> Result<AssetRecord> {
        let id: String = row.get(0)?;
        let tier: String = row.get(4)?;
        Ok(AssetRecord {
            id: AssetId::new(id)?,
            display_name: row.get(1)?,
            author: row.get::<Option<String>>(2)?,
            saved_at: row.get(3)?,
            storage_tier: tier.parse::<StorageTier>()?,
            size_bytes: row.get(5)?,
        })
    }

    async fn is_empty(&self) -> Result<bool> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM asset_records", ())
            .await?;
        let count: i64 = rows
            .next()
            .await?
            .map_or(Ok(0), |row| row.get(0))?;
        Ok(count == 0)
    }

    async fn legacy_table_exists(&self) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
                [LEGACY_TABLE],
            )
            .await?;
        let exists = rows
            .next()
            .await?
            .map_or(Ok(0), |row| row.get::<i32>(0))?;
        Ok(exists != 0)
    }
}

impl AssetIndex for LibSqlAssetIndex<'_> {
    async fn list(&self) -> Result<Vec<AssetRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, display_name, author, saved_at, storage_tier, size_bytes
                 FROM asset_records
                 ORDER BY rowid ASC",
                (),
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::parse_record(&row)?);
        }

        Ok(records)
    }

    async fn upsert(&self, record: &AssetRecord) -> Result<()> {
        // UPDATE-then-INSERT keeps the rowid (and list position) of an
        // existing record; INSERT OR REPLACE would move it to the end
        let updated = self
            .conn
            .execute(
                "UPDATE asset_records
                 SET display_name = ?, author = ?, saved_at = ?, storage_tier = ?, size_bytes = ?
                 WHERE id = ?",
                params![
                    record.display_name.clone(),
                    record.author.clone(),
                    record.saved_at,
                    record.storage_tier.as_str(),
                    record.size_bytes,
                    record.id.as_str()
                ],
            )
            .await?;

        if updated == 0 {
            self.conn
                .execute(
                    "INSERT INTO asset_records
                     (id, display_name, author, saved_at, storage_tier, size_bytes)
                     VALUES (?, ?, ?, ?, ?, ?)",
                    params![
                        record.id.as_str(),
                        record.display_name.clone(),
                        record.author.clone(),
                        record.saved_at,
                        record.storage_tier.as_str(),
                        record.size_bytes
                    ],
                )
                .await?;
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &AssetId) -> Result<Option<AssetRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, display_name, author, saved_at, storage_tier, size_bytes
                 FROM asset_records WHERE id = ?",
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, id: &AssetId) -> Result<()> {
        self.conn
            .execute("DELETE FROM asset_records WHERE id = ?", [id.as_str()])
            .await?;
        Ok(())
    }

    async fn migrate_legacy_format(&self) -> Result<usize> {
        if !self.legacy_table_exists().await? {
            return Ok(0);
        }
        if !self.is_empty().await? {
            tracing::warn!(
                "Legacy table '{LEGACY_TABLE}' present but current index is not empty; skipping migration"
            );
            return Ok(0);
        }

        let mut rows = self
            .conn
            .query(
                &format!("SELECT id, title, author, saved_at, pdf_data FROM {LEGACY_TABLE}"),
                (),
            )
            .await?;

        let mut migrated = 0usize;
        while let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            let title: String = row.get(1)?;
            let author: Option<String> = row.get(2)?;
            let saved_at: i64 = row.get(3)?;
            let payload: Vec<u8> = row.get(4)?;
            let size_bytes = i64::try_from(payload.len())
                .map_err(|_| Error::Database("Legacy payload exceeds i64 size".to_string()))?;

            // Legacy rows always embedded their payload, so they land on
            // the inline tier
            self.conn
                .execute(
                    "INSERT INTO asset_records
                     (id, display_name, author, saved_at, storage_tier, size_bytes)
                     VALUES (?, ?, ?, ?, ?, ?)",
                    params![
                        id.clone(),
                        title,
                        author,
                        saved_at,
                        StorageTier::Inline.as_str(),
                        size_bytes
                    ],
                )
                .await?;
            self.conn
                .execute(
                    "INSERT OR REPLACE INTO inline_payloads (id, payload) VALUES (?, ?)",
                    params![id, payload],
                )
                .await?;

            migrated += 1;
        }

        self.conn
            .execute(&format!("DROP TABLE {LEGACY_TABLE}"), ())
            .await?;

        tracing::info!("Migrated {migrated} records from legacy format");
        Ok(migrated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn record(id: &str, name: &str) -> AssetRecord {
        AssetRecord::new(
            AssetId::new(id).unwrap(),
            name,
            None,
            StorageTier::Inline,
            128,
        )
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_and_find() {
        let db = setup().await;
        let index = LibSqlAssetIndex::new(db.connection());

        let rec = record("book-1", "First Book");
        index.upsert(&rec).await.unwrap();

        let found = index.find_by_id(&rec.id).await.unwrap().unwrap();
        assert_eq!(found, rec);

        let missing = AssetId::new("book-404").unwrap();
        assert!(index.find_by_id(&missing).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_preserves_insertion_order() {
        let db = setup().await;
        let index = LibSqlAssetIndex::new(db.connection());

        index.upsert(&record("book-b", "B")).await.unwrap();
        index.upsert(&record("book-a", "A")).await.unwrap();
        index.upsert(&record("book-c", "C")).await.unwrap();

        let listed = index.list().await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["book-b", "book-a", "book-c"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_replaces_in_place() {
        let db = setup().await;
        let index = LibSqlAssetIndex::new(db.connection());

        index.upsert(&record("book-1", "Old Title")).await.unwrap();
        index.upsert(&record("book-2", "Other")).await.unwrap();

        let mut replacement = record("book-1", "New Title");
        replacement.storage_tier = StorageTier::BlobStore;
        index.upsert(&replacement).await.unwrap();

        let listed = index.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id.as_str(), "book-1");
        assert_eq!(listed[0].display_name, "New Title");
        assert_eq!(listed[0].storage_tier, StorageTier::BlobStore);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remove_is_idempotent() {
        let db = setup().await;
        let index = LibSqlAssetIndex::new(db.connection());

        let rec = record("book-1", "Book");
        index.upsert(&rec).await.unwrap();

        index.remove(&rec.id).await.unwrap();
        index.remove(&rec.id).await.unwrap();

        assert!(index.find_by_id(&rec.id).await.unwrap().is_none());
    }

    async fn seed_legacy_table(db: &Database) {
        db.connection()
            .execute(
                "CREATE TABLE saved_books (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    author TEXT,
                    saved_at INTEGER NOT NULL,
                    pdf_data BLOB NOT NULL
                )",
                (),
            )
            .await
            .unwrap();
        db.connection()
            .execute(
                "INSERT INTO saved_books (id, title, author, saved_at, pdf_data)
                 VALUES (?, ?, ?, ?, ?)",
                params!["legacy-1", "Legacy One", "Author", 1000i64, vec![1u8, 2, 3]],
            )
            .await
            .unwrap();
        db.connection()
            .execute(
                "INSERT INTO saved_books (id, title, author, saved_at, pdf_data)
                 VALUES (?, ?, ?, ?, ?)",
                params!["legacy-2", "Legacy Two", Option::<String>::None, 2000i64, vec![4u8, 5]],
            )
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_legacy_migration_runs_once() {
        let db = setup().await;
        seed_legacy_table(&db).await;

        let index = LibSqlAssetIndex::new(db.connection());

        let migrated = index.migrate_legacy_format().await.unwrap();
        assert_eq!(migrated, 2);

        // Second call sees no legacy table and does nothing
        let migrated_again = index.migrate_legacy_format().await.unwrap();
        assert_eq!(migrated_again, 0);

        let listed = index.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id.as_str(), "legacy-1");
        assert_eq!(listed[0].storage_tier, StorageTier::Inline);
        assert_eq!(listed[0].size_bytes, 3);
        assert_eq!(listed[1].author, None);

        // Legacy table must be gone
        let mut rows = db
            .connection()
            .query(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='saved_books')",
                (),
            )
            .await
            .unwrap();
        let exists = rows.next().await.unwrap().unwrap().get::<i32>(0).unwrap();
        assert_eq!(exists, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_legacy_migration_skipped_when_index_populated() {
        let db = setup().await;
        seed_legacy_table(&db).await;

        let index = LibSqlAssetIndex::new(db.connection());
        index.upsert(&record("book-1", "Existing")).await.unwrap();

        let migrated = index.migrate_legacy_format().await.unwrap();
        assert_eq!(migrated, 0);
        assert_eq!(index.list().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_legacy_migration_without_legacy_table() {
        let db = setup().await;
        let index = LibSqlAssetIndex::new(db.connection());

        assert_eq!(index.migrate_legacy_format().await.unwrap(), 0);
    }
}
