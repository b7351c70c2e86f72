//! Cache coordinator over the metadata index and the two-tier store.
//!
//! The index and the payload tiers are updated as separate storage calls, so
//! every multi-step operation runs under a per-id lock: two concurrent saves
//! for one new id must not both pass the duplicate check and produce two
//! divergent tier assignments.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OnceCell, OwnedMutexGuard};

use crate::db::{AssetIndex, Database, LibSqlAssetIndex};
use crate::error::Result;
use crate::models::{AssetId, AssetRecord, RemoteAsset, SavedAsset, StorageTier};
use crate::remote::PayloadFetcher;
use crate::storage::BinaryAssetStore;

const METADATA_RETRY_ATTEMPTS: u32 = 3;
const METADATA_RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// Outcome of a save request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Payload and metadata were written; both tiers are consistent.
    Saved {
        /// Tier the payload landed on.
        tier: StorageTier,
    },
    /// The id is already cached. A designed no-op, not an error; callers
    /// surface it as an informational notice.
    AlreadySaved,
    /// Nothing usable was written; the reason is caller-visible and the
    /// operation can be retried.
    Failed {
        /// Underlying failure message.
        reason: String,
    },
}

/// Per-id async locks serializing cache operations.
struct AssetLockMap {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AssetLockMap {
    fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    async fn acquire(&self, id: &AssetId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(id.as_str().to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Orchestrates the metadata index and the binary store as one logical cache.
pub struct CacheCoordinator<F> {
    db: Arc<Database>,
    store: BinaryAssetStore,
    fetcher: F,
    locks: AssetLockMap,
    legacy_migration: OnceCell<()>,
}

impl<F: PayloadFetcher> CacheCoordinator<F> {
    /// Create a coordinator over an opened database and store.
    #[must_use]
    pub fn new(db: Arc<Database>, store: BinaryAssetStore, fetcher: F) -> Self {
        Self {
            db,
            store,
            fetcher,
            locks: AssetLockMap::new(),
            legacy_migration: OnceCell::new(),
        }
    }

    /// Save a remote asset into the local cache.
    ///
    /// A fetch failure leaves both tiers untouched. When the payload write
    /// succeeds but the metadata write keeps failing after retries, the
    /// payload is deleted again so no orphan remains.
    pub async fn save_asset(&self, asset: &RemoteAsset) -> Result<SaveOutcome> {
        self.ensure_legacy_migrated().await?;

        if asset.display_name.trim().is_empty() {
            return Ok(SaveOutcome::Failed {
                reason: "Asset display_name cannot be empty".to_string(),
            });
        }

        let _guard = self.locks.acquire(&asset.id).await;
        let index = LibSqlAssetIndex::new(self.db.connection());

        if index.find_by_id(&asset.id).await?.is_some() {
            return Ok(SaveOutcome::AlreadySaved);
        }

        let bytes = match self.fetcher.fetch(&asset.url).await {
            Ok(bytes) => bytes,
            Err(error) => {
                return Ok(SaveOutcome::Failed {
                    reason: error.to_string(),
                });
            }
        };

        let tier = match self.store.put(&asset.id, &bytes).await {
            Ok(tier) => tier,
            Err(error) => {
                return Ok(SaveOutcome::Failed {
                    reason: error.to_string(),
                });
            }
        };

        let size_bytes = i64::try_from(bytes.len()).unwrap_or(i64::MAX);
        let record = match AssetRecord::new(
            asset.id.clone(),
            &asset.display_name,
            asset.author.clone(),
            tier,
            size_bytes,
        ) {
            Ok(record) => record,
            Err(error) => {
                self.cleanup_payload(&asset.id, tier).await;
                return Ok(SaveOutcome::Failed {
                    reason: error.to_string(),
                });
            }
        };

        match self.upsert_with_retry(&index, &record).await {
            Ok(()) => Ok(SaveOutcome::Saved { tier }),
            Err(error) => {
                self.cleanup_payload(&asset.id, tier).await;
                Ok(SaveOutcome::Failed {
                    reason: error.to_string(),
                })
            }
        }
    }

    /// Load a cached asset with its payload bytes.
    ///
    /// A record whose tier holds no payload reads as absent; it is logged as
    /// a consistency fault since it indicates a previous partial failure,
    /// not a never-saved id.
    pub async fn load_asset(&self, id: &AssetId) -> Result<Option<SavedAsset>> {
        self.ensure_legacy_migrated().await?;

        let _guard = self.locks.acquire(id).await;
        let index = LibSqlAssetIndex::new(self.db.connection());

        let Some(record) = index.find_by_id(id).await? else {
            return Ok(None);
        };

        match self.store.get(id, record.storage_tier).await? {
            Some(payload) => Ok(Some(SavedAsset { record, payload })),
            None => {
                tracing::warn!(
                    "Consistency fault: record for {id} points at empty {} tier",
                    record.storage_tier
                );
                Ok(None)
            }
        }
    }

    /// Remove a cached asset.
    ///
    /// Metadata goes first, then the payload. Removal is idempotent and
    /// succeeds even when the asset never existed; a failed payload cleanup
    /// is logged, not surfaced.
    pub async fn remove_asset(&self, id: &AssetId) -> Result<()> {
        self.ensure_legacy_migrated().await?;

        let _guard = self.locks.acquire(id).await;
        let index = LibSqlAssetIndex::new(self.db.connection());

        let record = index.find_by_id(id).await?;
        index.remove(id).await?;

        let cleanup = match record {
            Some(record) => self.store.delete(id, record.storage_tier).await,
            // No record left to name the tier; clear both
            None => self.store.delete_everywhere(id).await,
        };
        if let Err(error) = cleanup {
            tracing::warn!("Payload cleanup for {id} failed: {error}");
        }

        Ok(())
    }

    /// List cached asset records in insertion order.
    pub async fn list_saved_assets(&self) -> Result<Vec<AssetRecord>> {
        self.ensure_legacy_migrated().await?;

        let index = LibSqlAssetIndex::new(self.db.connection());
        index.list().await
    }

    /// Whether the dedicated blob tier is usable in this runtime.
    #[must_use]
    pub const fn blob_tier_available(&self) -> bool {
        self.store.blob_tier_available()
    }

    async fn ensure_legacy_migrated(&self) -> Result<()> {
        self.legacy_migration
            .get_or_try_init(|| async {
                let index = LibSqlAssetIndex::new(self.db.connection());
                index.migrate_legacy_format().await?;
                Ok::<(), crate::error::Error>(())
            })
            .await?;
        Ok(())
    }

    async fn upsert_with_retry(
        &self,
        index: &LibSqlAssetIndex<'_>,
        record: &AssetRecord,
    ) -> Result<()> {
        let mut delay = METADATA_RETRY_BASE_DELAY;
        let mut attempt = 1;
        loop {
            match index.upsert(record).await {
                Ok(()) => return Ok(()),
                Err(error) if attempt < METADATA_RETRY_ATTEMPTS => {
                    tracing::warn!(
                        "Metadata write for {} failed (attempt {attempt}): {error}; retrying",
                        record.id
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn cleanup_payload(&self, id: &AssetId, tier: StorageTier) {
        if let Err(error) = self.store.delete(id, tier).await {
            tracing::warn!("Orphaned payload cleanup for {id} failed: {error}");
        }
    }
}
