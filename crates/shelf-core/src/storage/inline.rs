//! Inline payload tier backed by the local metadata database.

use libsql::{params, Connection};

use crate::error::Result;
use crate::models::AssetId;

/// Payload rows stored alongside the metadata in the local database.
///
/// This tier is always available: it shares the database the index lives in,
/// so a cache with no usable blob directory still functions.
#[derive(Clone)]
pub struct InlinePayloadStore {
    conn: Connection,
}

impl InlinePayloadStore {
    /// Create a store over the given connection.
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Write payload bytes for an asset, replacing any previous payload.
    pub async fn put(&self, id: &AssetId, bytes: &[u8]) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO inline_payloads (id, payload) VALUES (?, ?)",
                params![id.as_str(), bytes.to_vec()],
            )
            .await?;
        Ok(())
    }

    /// Read payload bytes for an asset, `None` when absent.
    pub async fn get(&self, id: &AssetId) -> Result<Option<Vec<u8>>> {
        let mut rows = self
            .conn
            .query(
                "SELECT payload FROM inline_payloads WHERE id = ?",
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<Vec<u8>>(0)?)),
            None => Ok(None),
        }
    }

    /// Delete an asset's payload; deleting a missing payload is not an error.
    pub async fn delete(&self, id: &AssetId) -> Result<()> {
        self.conn
            .execute("DELETE FROM inline_payloads WHERE id = ?", [id.as_str()])
            .await?;
        Ok(())
    }
}
