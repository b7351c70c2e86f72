//! Offline mutation queue with FIFO remote replay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use crate::db::{Database, LibSqlSyncQueueStore, SyncQueueStore};
use crate::error::Result;
use crate::models::{EntityType, Operation, SyncQueueEntry};
use crate::remote::RemoteDocumentStore;

/// Summary of one completed drain pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries confirmed remotely and removed from the queue.
    pub replayed: usize,
    /// Entries still queued after the pass.
    pub remaining: usize,
    /// Failure that stopped the pass, when one did.
    pub failure: Option<String>,
}

/// Outcome of a drain request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// A pass ran to completion or to its first failure.
    Drained(DrainReport),
    /// Another drain was already in flight; nothing was replayed.
    AlreadySyncing,
}

/// Local-first mutation queue.
///
/// Enqueue always succeeds locally; entries leave the queue only after a
/// confirmed remote write. Replay is strict FIFO and stops at the first
/// failure so a later mutation can never land before an earlier one.
pub struct SyncQueue {
    db: Arc<Database>,
    drain_guard: Mutex<()>,
    syncing: AtomicBool,
}

impl SyncQueue {
    /// Create a queue over an opened database.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            drain_guard: Mutex::new(()),
            syncing: AtomicBool::new(false),
        }
    }

    /// Record a local mutation for later replay.
    pub async fn enqueue(
        &self,
        entity_type: EntityType,
        operation: Operation,
        payload: JsonValue,
    ) -> Result<SyncQueueEntry> {
        let entry = SyncQueueEntry::new(entity_type, operation, payload);
        let store = LibSqlSyncQueueStore::new(self.db.connection());
        store.push(&entry).await?;
        tracing::debug!(
            "Enqueued {} {} as {}",
            entry.operation,
            entry.entity_type,
            entry.entry_id
        );
        Ok(entry)
    }

    /// Number of mutations awaiting replay.
    pub async fn pending(&self) -> Result<usize> {
        let store = LibSqlSyncQueueStore::new(self.db.connection());
        store.len().await
    }

    /// All queued mutations in FIFO order.
    pub async fn pending_entries(&self) -> Result<Vec<SyncQueueEntry>> {
        let store = LibSqlSyncQueueStore::new(self.db.connection());
        store.list_fifo().await
    }

    /// Whether a drain pass is currently running.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    /// Replay queued mutations against the remote store.
    ///
    /// At most one drain runs at a time; overlapping calls return
    /// [`DrainOutcome::AlreadySyncing`] rather than risking reordered or
    /// duplicated remote writes.
    pub async fn drain<R: RemoteDocumentStore>(&self, remote: &R) -> Result<DrainOutcome> {
        let Ok(_guard) = self.drain_guard.try_lock() else {
            return Ok(DrainOutcome::AlreadySyncing);
        };

        self.syncing.store(true, Ordering::SeqCst);
        let report = self.drain_locked(remote).await;
        self.syncing.store(false, Ordering::SeqCst);

        report.map(DrainOutcome::Drained)
    }

    async fn drain_locked<R: RemoteDocumentStore>(&self, remote: &R) -> Result<DrainReport> {
        let store = LibSqlSyncQueueStore::new(self.db.connection());
        let entries = store.list_fifo().await?;
        let total = entries.len();

        let mut replayed = 0usize;
        let mut failure = None;

        for entry in entries {
            let result = match entry.operation {
                Operation::Create => remote.create(entry.entity_type, &entry.payload).await,
                Operation::Update => remote.update(entry.entity_type, &entry.payload).await,
                Operation::Delete => remote.delete(entry.entity_type, &entry.payload).await,
            };

            match result {
                Ok(()) => {
                    // Confirmed remotely; only now may the entry leave the queue
                    store.delete(&entry.entry_id).await?;
                    replayed += 1;
                }
                Err(error) => {
                    // Stop the pass: replaying later entries first would
                    // reorder mutations for the same entity
                    tracing::warn!(
                        "Replay of {} {} failed: {error}; stopping drain pass",
                        entry.operation,
                        entry.entity_type
                    );
                    failure = Some(error.to_string());
                    break;
                }
            }
        }

        if replayed > 0 {
            tracing::info!("Drained {replayed}/{total} pending mutations");
        }

        Ok(DrainReport {
            replayed,
            remaining: total - replayed,
            failure,
        })
    }
}
