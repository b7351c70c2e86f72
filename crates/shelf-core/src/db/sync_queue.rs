//! Persisted sync queue storage implementation

use crate::error::Result;
use crate::models::{EntityType, Operation, SyncQueueEntry};
use libsql::{params, Connection};

/// Trait for pending-mutation queue storage (async)
#[allow(async_fn_in_trait)]
pub trait SyncQueueStore {
    /// Append an entry to the queue
    async fn push(&self, entry: &SyncQueueEntry) -> Result<()>;

    /// List all entries in FIFO enqueue order
    async fn list_fifo(&self) -> Result<Vec<SyncQueueEntry>>;

    /// Delete an entry after its remote write was confirmed
    async fn delete(&self, entry_id: &str) -> Result<()>;

    /// Count queued entries
    async fn len(&self) -> Result<usize>;
}

/// libSQL implementation of `SyncQueueStore`
pub struct LibSqlSyncQueueStore<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSyncQueueStore<'a> {
    /// Create a new store with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_entry(row: &libsql::Row) -> Result<SyncQueueEntry> {
        let entity: String = row.get(1)?;
        let operation: String = row.get(2)?;
        let payload: String = row.get(3)?;
        Ok(SyncQueueEntry {
            entry_id: row.get(0)?,
            entity_type: entity.parse::<EntityType>()?,
            operation: operation.parse::<Operation>()?,
            payload: serde_json::from_str(&payload)?,
            enqueued_at: row.get(4)?,
        })
    }
}

impl SyncQueueStore for LibSqlSyncQueueStore<'_> {
    async fn push(&self, entry: &SyncQueueEntry) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_queue (entry_id, entity_type, operation, payload, enqueued_at)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    entry.entry_id.clone(),
                    entry.entity_type.as_str(),
                    entry.operation.as_str(),
                    serde_json::to_string(&entry.payload)?,
                    entry.enqueued_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn list_fifo(&self) -> Result<Vec<SyncQueueEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT entry_id, entity_type, operation, payload, enqueued_at
                 FROM sync_queue
                 ORDER BY rowid ASC",
                (),
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::parse_entry(&row)?);
        }

        Ok(entries)
    }

    async fn delete(&self, entry_id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM sync_queue WHERE entry_id = ?", [entry_id])
            .await?;
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let mut rows = self.conn.query("SELECT COUNT(*) FROM sync_queue", ()).await?;
        let count: i64 = rows.next().await?.map_or(Ok(0), |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
