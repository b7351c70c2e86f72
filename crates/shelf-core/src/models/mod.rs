//! Data models for Shelf

mod asset;
mod sync_entry;

pub use asset::{AssetId, AssetRecord, RemoteAsset, SavedAsset, StorageTier};
pub use sync_entry::{EntityType, Operation, SyncQueueEntry};
