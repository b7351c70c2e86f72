//! Runtime configuration for the shelf cache.
//!
//! Values are safe-to-ship local paths and public endpoints; no secret
//! credentials live here.

use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

const ENV_DATA_DIR: &str = "SHELF_DATA_DIR";
const ENV_API_BASE_URL: &str = "SHELF_API_BASE_URL";
const ENV_BLOB_DIR: &str = "SHELF_BLOB_DIR";

/// Process-wide cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfConfig {
    /// Directory holding the local database (and the default blob root).
    pub data_dir: PathBuf,
    /// Base URL of the shelf API, when remote features are configured.
    pub api_base_url: Option<String>,
    /// Override for the blob directory; defaults to `<data_dir>/blobs`.
    pub blob_dir: Option<PathBuf>,
}

impl ShelfConfig {
    /// Build a local-only configuration rooted at a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            api_base_url: None,
            blob_dir: None,
        }
    }

    /// Load configuration from environment variables, falling back to the
    /// given data directory when `SHELF_DATA_DIR` is unset.
    pub fn from_env(default_data_dir: impl Into<PathBuf>) -> Result<Self> {
        parse_config(default_data_dir.into(), |key| env::var(key).ok())
    }

    /// Path of the local database file.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("shelf.db")
    }

    /// Root of the blob directory.
    #[must_use]
    pub fn blob_root(&self) -> PathBuf {
        self.blob_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("blobs"))
    }
}

fn parse_config(
    default_data_dir: PathBuf,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ShelfConfig> {
    let data_dir = normalize_text_option(lookup(ENV_DATA_DIR))
        .map_or(default_data_dir, PathBuf::from);

    let api_base_url = match normalize_text_option(lookup(ENV_API_BASE_URL)) {
        Some(url) if is_http_url(&url) => Some(url.trim_end_matches('/').to_string()),
        Some(_) => {
            return Err(Error::InvalidInput(format!(
                "{ENV_API_BASE_URL} must include http:// or https://"
            )));
        }
        None => None,
    };

    let blob_dir = normalize_text_option(lookup(ENV_BLOB_DIR)).map(PathBuf::from);

    Ok(ShelfConfig {
        data_dir,
        api_base_url,
        blob_dir,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_from_map(map: &HashMap<&str, &str>) -> Result<ShelfConfig> {
        parse_config(PathBuf::from("/default"), |key| {
            map.get(key).map(|value| (*value).to_string())
        })
    }

    #[test]
    fn parse_config_uses_defaults_when_env_is_empty() {
        let config = parse_from_map(&HashMap::new()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/default"));
        assert_eq!(config.api_base_url, None);
        assert_eq!(config.blob_root(), PathBuf::from("/default/blobs"));
        assert_eq!(config.db_path(), PathBuf::from("/default/shelf.db"));
    }

    #[test]
    fn parse_config_reads_overrides() {
        let mut map = HashMap::new();
        map.insert(ENV_DATA_DIR, "/profile/shelf");
        map.insert(ENV_API_BASE_URL, "https://api.example.com/");
        map.insert(ENV_BLOB_DIR, "/bulk/blobs");

        let config = parse_from_map(&map).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/profile/shelf"));
        assert_eq!(config.api_base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.blob_root(), PathBuf::from("/bulk/blobs"));
    }

    #[test]
    fn parse_config_rejects_invalid_api_url() {
        let mut map = HashMap::new();
        map.insert(ENV_API_BASE_URL, "api.example.com");

        let err = parse_from_map(&map).unwrap_err();
        match err {
            Error::InvalidInput(message) => assert!(message.contains(ENV_API_BASE_URL)),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
