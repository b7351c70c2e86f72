//! Storage tiers for asset payload bytes.

mod asset_store;
mod blob_store;
mod inline;

pub use asset_store::{BinaryAssetStore, INLINE_PAYLOAD_MAX_BYTES};
pub use blob_store::FsBlobStore;
pub use inline::InlinePayloadStore;
