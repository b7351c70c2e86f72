//! Shared shelf service wrapper used across clients.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::watch;

use crate::cache::{CacheCoordinator, SaveOutcome};
use crate::config::ShelfConfig;
use crate::db::Database;
use crate::error::Result;
use crate::models::{
    AssetId, AssetRecord, EntityType, Operation, RemoteAsset, SavedAsset, SyncQueueEntry,
};
use crate::remote::{PayloadFetcher, RemoteDocumentStore};
use crate::state::SyncState;
use crate::storage::{BinaryAssetStore, FsBlobStore, InlinePayloadStore};
use crate::sync::{ConnectivityMonitor, DrainOutcome, SyncQueue};

/// Process-wide persistence service handed to the UI layer.
///
/// One instance exists per profile; every piece of shared state (index,
/// tiers, queue, connectivity) is constructed here once and injected, rather
/// than reached through ambient globals.
pub struct ShelfService<F> {
    coordinator: Arc<CacheCoordinator<F>>,
    queue: Arc<SyncQueue>,
    monitor: ConnectivityMonitor,
    connectivity: watch::Sender<bool>,
}

impl<F: PayloadFetcher> ShelfService<F> {
    /// Open the service over a configured profile directory.
    ///
    /// Probes the blob backend once; a profile where the blob directory
    /// cannot be created still opens, with every payload kept inline.
    pub async fn open(config: &ShelfConfig, fetcher: F) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let db = Arc::new(Database::open(config.db_path()).await?);
        let blob = FsBlobStore::probe(config.blob_root());
        if blob.is_none() {
            tracing::warn!("Running inline-only: blob directory is unavailable");
        }

        Ok(Self::assemble(db, blob, fetcher))
    }

    /// Open an in-memory, inline-only service (primarily for tests).
    pub async fn open_in_memory(fetcher: F) -> Result<Self> {
        let db = Arc::new(Database::open_in_memory().await?);
        Ok(Self::assemble(db, None, fetcher))
    }

    fn assemble(db: Arc<Database>, blob: Option<FsBlobStore>, fetcher: F) -> Self {
        let inline = InlinePayloadStore::new(db.connection().clone());
        let store = BinaryAssetStore::new(inline, blob);
        let coordinator = Arc::new(CacheCoordinator::new(Arc::clone(&db), store, fetcher));
        let queue = Arc::new(SyncQueue::new(db));
        let (connectivity, monitor) = ConnectivityMonitor::channel(true);

        Self {
            coordinator,
            queue,
            monitor,
            connectivity,
        }
    }

    /// Save a remote asset into the local cache.
    pub async fn save_asset(&self, asset: &RemoteAsset) -> Result<SaveOutcome> {
        self.coordinator.save_asset(asset).await
    }

    /// Load a cached asset with its payload.
    pub async fn load_asset(&self, id: &AssetId) -> Result<Option<SavedAsset>> {
        self.coordinator.load_asset(id).await
    }

    /// List cached asset records in insertion order.
    pub async fn list_saved_assets(&self) -> Result<Vec<AssetRecord>> {
        self.coordinator.list_saved_assets().await
    }

    /// Remove a cached asset; succeeds whether or not it existed.
    pub async fn remove_asset(&self, id: &AssetId) -> Result<()> {
        self.coordinator.remove_asset(id).await
    }

    /// Record a local mutation for later remote replay.
    pub async fn enqueue_mutation(
        &self,
        entity_type: EntityType,
        operation: Operation,
        payload: JsonValue,
    ) -> Result<SyncQueueEntry> {
        self.queue.enqueue(entity_type, operation, payload).await
    }

    /// Number of mutations awaiting replay.
    pub async fn pending_mutations(&self) -> Result<usize> {
        self.queue.pending().await
    }

    /// Replay queued mutations against the remote store.
    pub async fn drain<R: RemoteDocumentStore>(&self, remote: &R) -> Result<DrainOutcome> {
        self.queue.drain(remote).await
    }

    /// Queue handle for spawning the connectivity drain loop.
    #[must_use]
    pub fn queue(&self) -> Arc<SyncQueue> {
        Arc::clone(&self.queue)
    }

    /// Connectivity monitor handle.
    #[must_use]
    pub fn connectivity_monitor(&self) -> ConnectivityMonitor {
        self.monitor.clone()
    }

    /// Push a connectivity transition from the host runtime.
    pub fn set_online(&self, online: bool) {
        self.connectivity.send_replace(online);
    }

    /// Current connectivity state (display only).
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    /// Whether a drain pass is currently running (display only).
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.queue.is_syncing()
    }

    /// Combined display state.
    #[must_use]
    pub fn sync_state(&self) -> SyncState {
        SyncState::from_runtime(self.is_online(), self.is_syncing())
    }

    /// Whether the dedicated blob tier is usable in this runtime.
    #[must_use]
    pub fn blob_tier_available(&self) -> bool {
        self.coordinator.blob_tier_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    struct FixedFetcher {
        bytes: Vec<u8>,
    }

    impl PayloadFetcher for FixedFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(self.bytes.clone())
        }
    }

    struct DownFetcher;

    impl PayloadFetcher for DownFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Err(Error::Fetch(format!("Fetch failed with HTTP 502: {url}")))
        }
    }

    fn asset(id: &str) -> RemoteAsset {
        RemoteAsset {
            id: AssetId::new(id).unwrap(),
            display_name: "A Book".to_string(),
            author: None,
            url: format!("https://cdn/{id}.pdf"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_on_disk_and_round_trip() {
        let tmp = tempdir().unwrap();
        let config = ShelfConfig::new(tmp.path().join("profile"));
        let service = ShelfService::open(
            &config,
            FixedFetcher {
                bytes: b"payload".to_vec(),
            },
        )
        .await
        .unwrap();

        assert!(service.blob_tier_available());

        let book = asset("book-1");
        service.save_asset(&book).await.unwrap();

        let loaded = service.load_asset(&book.id).await.unwrap().unwrap();
        assert_eq!(loaded.payload, b"payload");
        assert_eq!(service.list_saved_assets().await.unwrap().len(), 1);

        service.remove_asset(&book.id).await.unwrap();
        assert!(service.load_asset(&book.id).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn in_memory_service_is_inline_only() {
        let service = ShelfService::open_in_memory(FixedFetcher {
            bytes: b"x".to_vec(),
        })
        .await
        .unwrap();

        assert!(!service.blob_tier_available());
        service.save_asset(&asset("book-1")).await.unwrap();
        assert_eq!(service.list_saved_assets().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn save_failure_surfaces_reason() {
        let service = ShelfService::open_in_memory(DownFetcher).await.unwrap();

        let outcome = service.save_asset(&asset("book-1")).await.unwrap();
        let SaveOutcome::Failed { reason } = outcome else {
            panic!("expected Failed, got {outcome:?}");
        };
        assert!(reason.contains("502"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn connectivity_state_is_exposed() {
        let service = ShelfService::open_in_memory(FixedFetcher { bytes: vec![] })
            .await
            .unwrap();

        assert!(service.is_online());
        assert_eq!(service.sync_state(), SyncState::Synced);

        service.set_online(false);
        assert!(!service.is_online());
        assert_eq!(service.sync_state(), SyncState::Offline);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn mutations_enqueue_and_drain_through_facade() {
        #[derive(Clone, Default)]
        struct OkRemote {
            count: Arc<std::sync::Mutex<usize>>,
        }

        impl RemoteDocumentStore for OkRemote {
            async fn create(&self, _e: EntityType, _p: &JsonValue) -> Result<()> {
                *self.count.lock().unwrap() += 1;
                Ok(())
            }
            async fn update(&self, _e: EntityType, _p: &JsonValue) -> Result<()> {
                *self.count.lock().unwrap() += 1;
                Ok(())
            }
            async fn delete(&self, _e: EntityType, _p: &JsonValue) -> Result<()> {
                *self.count.lock().unwrap() += 1;
                Ok(())
            }
        }

        let service = ShelfService::open_in_memory(FixedFetcher { bytes: vec![] })
            .await
            .unwrap();

        service
            .enqueue_mutation(
                EntityType::Score,
                Operation::Create,
                serde_json::json!({"id": "s1"}),
            )
            .await
            .unwrap();
        assert_eq!(service.pending_mutations().await.unwrap(), 1);

        let remote = OkRemote::default();
        let DrainOutcome::Drained(report) = service.drain(&remote).await.unwrap() else {
            panic!("expected a drain pass");
        };
        assert_eq!(report.replayed, 1);
        assert_eq!(service.pending_mutations().await.unwrap(), 0);
        assert_eq!(*remote.count.lock().unwrap(), 1);
    }
}
