//! Remote catalog client.
//!
//! Read-only view of the remote object catalog plus the optional metadata
//! table. The cache never mutates either.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{AssetId, RemoteAsset};
use crate::util::{compact_text, is_http_url};

/// Sort key for catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Name,
    CreatedAt,
}

impl SortBy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Pagination and ordering options for catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub limit: usize,
    pub offset: usize,
    pub sort_by: SortBy,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            sort_by: SortBy::Name,
        }
    }
}

/// One object in the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Object name (filename in the remote store).
    pub name: String,
    /// Stable catalog identifier.
    pub id: String,
    /// Creation timestamp (Unix ms).
    pub created_at: i64,
    /// Object size in bytes.
    pub size: i64,
}

/// Optional per-file metadata from the remote metadata table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMeta {
    pub title: String,
    pub author: Option<String>,
}

/// Read-only remote catalog operations.
#[allow(async_fn_in_trait)]
pub trait RemoteCatalog {
    /// List catalog entries under a name prefix.
    async fn list(&self, prefix: &str, options: ListOptions) -> Result<Vec<CatalogEntry>>;

    /// Public URL serving an object's bytes.
    fn public_url(&self, name: &str) -> String;

    /// Look up optional metadata for a filename.
    ///
    /// Returns `None` when the metadata table does not exist or has no row
    /// for the filename; the cache degrades to filename-derived titles.
    async fn find_book_meta(&self, filename: &str) -> Result<Option<BookMeta>>;
}

/// HTTP client for the shelf catalog API.
#[derive(Debug, Clone)]
pub struct ShelfApiCatalog {
    base_url: String,
    client: reqwest::Client,
}

impl ShelfApiCatalog {
    /// Builds a client for an explicit API base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into().as_str())?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|error| Error::Fetch(format!("Failed to construct HTTP client: {error}")))?;
        Ok(Self { base_url, client })
    }

    /// Returns the base URL this client was configured with.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl RemoteCatalog for ShelfApiCatalog {
    async fn list(&self, prefix: &str, options: ListOptions) -> Result<Vec<CatalogEntry>> {
        let url = format!(
            "{}/v1/catalog?prefix={}&limit={}&offset={}&sort_by={}",
            self.base_url,
            urlencoding::encode(prefix),
            options.limit,
            options.offset,
            options.sort_by.as_str()
        );

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| Error::Fetch(format!("Catalog request failed: {error}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Fetch(format!(
                "Catalog request failed with HTTP {status}: {}",
                compact_text(&body)
            )));
        }

        response
            .json::<Vec<CatalogEntry>>()
            .await
            .map_err(|error| Error::Fetch(format!("Failed to parse catalog response: {error}")))
    }

    fn public_url(&self, name: &str) -> String {
        format!(
            "{}/v1/objects/{}",
            self.base_url,
            urlencoding::encode(name)
        )
    }

    async fn find_book_meta(&self, filename: &str) -> Result<Option<BookMeta>> {
        let url = format!(
            "{}/v1/books?filename={}",
            self.base_url,
            urlencoding::encode(filename)
        );

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| Error::Fetch(format!("Metadata request failed: {error}")))?;

        // The metadata table is optional; a missing table or row reads as no
        // metadata rather than a failure
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Fetch(format!(
                "Metadata request failed with HTTP {status}: {}",
                compact_text(&body)
            )));
        }

        response
            .json::<Option<BookMeta>>()
            .await
            .map_err(|error| Error::Fetch(format!("Failed to parse metadata response: {error}")))
    }
}

/// Build a save descriptor for a catalog entry.
///
/// Resolves title/author through the optional metadata table, degrading to a
/// filename-derived title when the table is absent or the lookup fails.
pub async fn describe_remote_asset(
    catalog: &impl RemoteCatalog,
    entry: &CatalogEntry,
) -> Result<RemoteAsset> {
    let meta = match catalog.find_book_meta(&entry.name).await {
        Ok(meta) => meta,
        Err(error) => {
            tracing::warn!(
                "Metadata lookup failed for '{}', falling back to filename: {error}",
                entry.name
            );
            None
        }
    };

    let (display_name, author) = match meta {
        Some(meta) => (meta.title, meta.author),
        None => (display_name_from_filename(&entry.name), None),
    };

    Ok(RemoteAsset {
        id: AssetId::new(entry.id.clone())?,
        display_name,
        author,
        url: catalog.public_url(&entry.name),
    })
}

/// Derive a human-readable title from an object filename.
fn display_name_from_filename(name: &str) -> String {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let cleaned = stem
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if cleaned.is_empty() {
        name.to_string()
    } else {
        cleaned
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let base = raw.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        return Err(Error::InvalidInput(
            "API base URL must not be empty".to_string(),
        ));
    }
    if !is_http_url(&base) {
        return Err(Error::InvalidInput(
            "API base URL must include http:// or https://".to_string(),
        ));
    }
    Ok(base)
}
