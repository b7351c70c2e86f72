//! Two-tier binary asset store.

use crate::error::Result;
use crate::models::{AssetId, StorageTier};

use super::blob_store::FsBlobStore;
use super::inline::InlinePayloadStore;

/// Payloads at or below this size stay on the inline tier.
pub const INLINE_PAYLOAD_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Two-tier store for asset payload bytes.
///
/// The blob backend is probed once at construction; a store built without
/// one keeps every payload inline rather than failing writes.
#[derive(Clone)]
pub struct BinaryAssetStore {
    inline: InlinePayloadStore,
    blob: Option<FsBlobStore>,
}

impl BinaryAssetStore {
    /// Create a store over the inline tier and an optional blob backend.
    #[must_use]
    pub const fn new(inline: InlinePayloadStore, blob: Option<FsBlobStore>) -> Self {
        Self { inline, blob }
    }

    /// Whether the dedicated blob backend is usable in this runtime.
    #[must_use]
    pub const fn blob_tier_available(&self) -> bool {
        self.blob.is_some()
    }

    /// Write payload bytes, selecting the tier by size.
    ///
    /// Payloads over [`INLINE_PAYLOAD_MAX_BYTES`] go to the blob tier when
    /// one is available; everything else stays inline. Returns the tier the
    /// bytes landed on, which the caller must record on the asset's metadata.
    pub async fn put(&self, id: &AssetId, bytes: &[u8]) -> Result<StorageTier> {
        let size = bytes.len() as u64;

        if size > INLINE_PAYLOAD_MAX_BYTES {
            if let Some(blob) = &self.blob {
                blob.put(id, bytes).await?;
                return Ok(StorageTier::BlobStore);
            }
            tracing::warn!(
                "Blob tier unavailable; storing {size}-byte payload for {id} inline"
            );
        }

        self.inline.put(id, bytes).await?;
        Ok(StorageTier::Inline)
    }

    /// Read payload bytes from the named tier only.
    ///
    /// No fallback to the other tier: a record pointing at an empty tier is
    /// a consistency fault the caller surfaces, not something to paper over
    /// with possibly-stale bytes from elsewhere.
    pub async fn get(&self, id: &AssetId, tier: StorageTier) -> Result<Option<Vec<u8>>> {
        match tier {
            StorageTier::Inline => self.inline.get(id).await,
            StorageTier::BlobStore => match &self.blob {
                Some(blob) => blob.get(id).await,
                None => Ok(None),
            },
        }
    }

    /// Delete payload bytes from the named tier; idempotent.
    pub async fn delete(&self, id: &AssetId, tier: StorageTier) -> Result<()> {
        match tier {
            StorageTier::Inline => self.inline.delete(id).await,
            StorageTier::BlobStore => match &self.blob {
                Some(blob) => blob.delete(id).await,
                None => Ok(()),
            },
        }
    }

    /// Delete payload bytes from every tier; used when no metadata record
    /// remains to name the tier.
    pub async fn delete_everywhere(&self, id: &AssetId) -> Result<()> {
        self.inline.delete(id).await?;
        if let Some(blob) = &self.blob {
            blob.delete(id).await?;
        }
        Ok(())
    }
}
