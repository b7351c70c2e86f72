//! Database layer for Shelf

mod asset_index;
mod connection;
mod migrations;
mod sync_queue;

pub use asset_index::{AssetIndex, LibSqlAssetIndex};
pub use connection::Database;
pub use sync_queue::{LibSqlSyncQueueStore, SyncQueueStore};
