//! Remote payload byte fetch.

use crate::error::{Error, Result};
use crate::util::compact_text;

/// Fetches asset payload bytes from a URL.
///
/// A non-2xx status is a fetch failure, not a payload.
#[allow(async_fn_in_trait)]
pub trait PayloadFetcher {
    /// Fetch the full payload at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP implementation of `PayloadFetcher`.
#[derive(Debug, Clone)]
pub struct HttpPayloadFetcher {
    client: reqwest::Client,
}

impl HttpPayloadFetcher {
    /// Build a fetcher with a default HTTP client.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|error| Error::Fetch(format!("Failed to construct HTTP client: {error}")))?;
        Ok(Self { client })
    }
}

impl PayloadFetcher for HttpPayloadFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| Error::Fetch(format!("Request failed for {url}: {error}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Fetch(format!(
                "Fetch failed with HTTP {status}: {}",
                compact_text(&body)
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|error| Error::Fetch(format!("Failed to read payload bytes: {error}")))?;
        Ok(bytes.to_vec())
    }
}
