//! Cached asset models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Opaque stable identifier for a cached asset.
///
/// Ids come from the remote catalog and are immutable once a record is
/// created; the cache never mints its own asset ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Create an asset id from a remote catalog identifier.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(Error::InvalidInput("Asset id cannot be empty".to_string()));
        }
        Ok(Self(id))
    }

    /// Get the string representation of this ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Physical tier holding an asset's payload bytes.
///
/// A record's tier field is the single source of truth for where the payload
/// lives; reads never fall back to the other tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageTier {
    /// Payload stored inside the local metadata database.
    Inline,
    /// Payload stored in the dedicated blob directory.
    BlobStore,
}

impl StorageTier {
    /// Stable string form used in the database and serialized records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "INLINE",
            Self::BlobStore => "BLOB_STORE",
        }
    }
}

impl FromStr for StorageTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "INLINE" => Ok(Self::Inline),
            "BLOB_STORE" => Ok(Self::BlobStore),
            other => Err(Error::InvalidInput(format!("Unknown storage tier: {other}"))),
        }
    }
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata describing one cached binary asset.
///
/// Exactly one record exists per id at any time. The payload itself lives in
/// whichever tier `storage_tier` names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Remote catalog identifier.
    pub id: AssetId,
    /// Human-readable title.
    pub display_name: String,
    /// Author, when the remote metadata table knew one.
    pub author: Option<String>,
    /// Save timestamp (Unix ms).
    pub saved_at: i64,
    /// Tier holding the payload bytes.
    pub storage_tier: StorageTier,
    /// Payload size in bytes.
    pub size_bytes: i64,
}

impl AssetRecord {
    /// Build a record for a freshly saved payload.
    pub fn new(
        id: AssetId,
        display_name: impl Into<String>,
        author: Option<String>,
        storage_tier: StorageTier,
        size_bytes: i64,
    ) -> Result<Self> {
        let display_name = display_name.into().trim().to_string();
        if display_name.is_empty() {
            return Err(Error::InvalidInput(
                "Asset display_name cannot be empty".to_string(),
            ));
        }
        if size_bytes < 0 {
            return Err(Error::InvalidInput(
                "Asset size_bytes cannot be negative".to_string(),
            ));
        }

        Ok(Self {
            id,
            display_name,
            author: crate::util::normalize_text_option(author),
            saved_at: crate::util::unix_timestamp_ms(),
            storage_tier,
            size_bytes,
        })
    }
}

/// Descriptor for an asset to be saved from the remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAsset {
    /// Remote catalog identifier.
    pub id: AssetId,
    /// Human-readable title.
    pub display_name: String,
    /// Author, when known.
    pub author: Option<String>,
    /// HTTP URL the payload bytes are fetched from.
    pub url: String,
}

/// A cached asset reassembled from metadata and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAsset {
    /// The metadata record.
    pub record: AssetRecord,
    /// The payload bytes, read from the record's tier.
    pub payload: Vec<u8>,
}
