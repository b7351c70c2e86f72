//! Remote document store used for mutation replay.

use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::models::EntityType;
use crate::util::{compact_text, is_http_url};

/// Remote document store the sync queue replays mutations against.
#[allow(async_fn_in_trait)]
pub trait RemoteDocumentStore {
    /// Create a document in the entity's collection.
    async fn create(&self, entity: EntityType, payload: &JsonValue) -> Result<()>;

    /// Update a document in the entity's collection.
    async fn update(&self, entity: EntityType, payload: &JsonValue) -> Result<()>;

    /// Delete a document from the entity's collection.
    async fn delete(&self, entity: EntityType, payload: &JsonValue) -> Result<()>;
}

/// HTTP implementation of `RemoteDocumentStore`.
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDocumentStore {
    /// Builds a store client for an explicit API base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() || !is_http_url(&base_url) {
            return Err(Error::InvalidInput(
                "Document store base URL must include http:// or https://".to_string(),
            ));
        }
        let client = reqwest::Client::builder().build().map_err(|error| {
            Error::RemoteSync(format!("Failed to construct HTTP client: {error}"))
        })?;
        Ok(Self { base_url, client })
    }

    fn document_id(payload: &JsonValue) -> Result<&str> {
        payload
            .get("id")
            .and_then(JsonValue::as_str)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                Error::InvalidInput("Mutation payload is missing an 'id' field".to_string())
            })
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<()> {
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::RemoteSync(format!(
            "{what} failed with HTTP {status}: {}",
            compact_text(&body)
        )))
    }
}

impl RemoteDocumentStore for HttpDocumentStore {
    async fn create(&self, entity: EntityType, payload: &JsonValue) -> Result<()> {
        let url = format!("{}/v1/{}", self.base_url, entity.collection());
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|error| Error::RemoteSync(format!("Create request failed: {error}")))?;
        Self::check(response, "Create").await
    }

    async fn update(&self, entity: EntityType, payload: &JsonValue) -> Result<()> {
        let id = Self::document_id(payload)?;
        let url = format!(
            "{}/v1/{}/{}",
            self.base_url,
            entity.collection(),
            urlencoding::encode(id)
        );
        let response = self
            .client
            .put(url)
            .json(payload)
            .send()
            .await
            .map_err(|error| Error::RemoteSync(format!("Update request failed: {error}")))?;
        Self::check(response, "Update").await
    }

    async fn delete(&self, entity: EntityType, payload: &JsonValue) -> Result<()> {
        let id = Self::document_id(payload)?;
        let url = format!(
            "{}/v1/{}/{}",
            self.base_url,
            entity.collection(),
            urlencoding::encode(id)
        );
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|error| Error::RemoteSync(format!("Delete request failed: {error}")))?;
        Self::check(response, "Delete").await
    }
}
