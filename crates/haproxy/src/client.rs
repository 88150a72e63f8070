//! Data Plane API client for runtime map entries.
//!
//! Every entry is read and written through
//! `services/haproxy/runtime/maps_entries`. Mutations pass `force_sync=true`
//! so the change is persisted to the map file as well as the runtime.

use std::sync::Arc;

use async_trait::async_trait;
use mapsync_reconciler::{ActualStateStore, Entry, EntrySet, StoreError};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::DataplaneConfig;
use crate::error::Result;

const MAPS_ENTRIES_PATH: &str = "services/haproxy/runtime/maps_entries";
const ACCEPT: &str = "application/json; charset=utf-8";

/// Error body returned by the Data Plane API.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Client for the HAProxy Data Plane API.
#[derive(Debug, Clone)]
pub struct DataplaneClient {
    /// Configuration for the client.
    config: Arc<DataplaneConfig>,
    /// Root of the versioned API.
    base_url: Url,
    /// HTTP client.
    http_client: reqwest::Client,
}

impl DataplaneClient {
    /// Create a new client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_config(DataplaneConfig::default())
    }

    /// Create a new client with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not form a valid URL or the HTTP
    /// client cannot be built.
    pub fn with_config(config: DataplaneConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url())?;
        let http_client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            config: Arc::new(config),
            base_url,
            http_client,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &DataplaneConfig {
        &self.config
    }

    /// Build the URL of the entries collection, or of one entry when `key`
    /// is given. The key is percent-encoded as a single path segment.
    fn entries_url(
        &self,
        table: &str,
        key: Option<&str>,
        force_sync: bool,
    ) -> std::result::Result<Url, StoreError> {
        let mut url = self
            .base_url
            .join(MAPS_ENTRIES_PATH)
            .map_err(|e| StoreError::transport(format!("invalid API URL: {e}")))?;

        if let Some(key) = key {
            url.path_segments_mut()
                .map_err(|()| StoreError::transport("API URL cannot carry a path"))?
                .push(key);
        }

        url.query_pairs_mut().append_pair("map", table);
        if force_sync {
            url.query_pairs_mut().append_pair("force_sync", "true");
        }

        Ok(url)
    }

    /// Send one request and decode its body.
    ///
    /// Returns `None` for `204 No Content`.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Entry>,
        resource: &str,
    ) -> std::result::Result<Option<T>, StoreError> {
        debug!(%method, %url, "Calling Data Plane API");

        let mut request = self
            .http_client
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(reqwest::header::ACCEPT, ACCEPT);
        if let Some(entry) = body {
            request = request.json(entry);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(resource));
        }

        if status.as_u16() >= 300 {
            let bytes = response.bytes().await.unwrap_or_default();
            let message = serde_json::from_slice::<ErrorResponse>(&bytes).map_or_else(
                |_| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                },
                |e| e.message,
            );
            return Err(StoreError::status(status.as_u16(), message));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::invalid_payload(e.to_string()))
    }

    async fn mutate(
        &self,
        method: Method,
        table: &str,
        entry: &Entry,
        by_key: bool,
    ) -> std::result::Result<Entry, StoreError> {
        let key = by_key.then_some(entry.key.as_str());
        let url = self.entries_url(table, key, true)?;
        let body = (method != Method::DELETE).then_some(entry);
        let resource = format!("entry '{}' in map '{table}'", entry.key);

        let echoed = self.execute::<Entry>(method, url, body, &resource).await?;
        Ok(echoed.unwrap_or_else(|| entry.clone()))
    }
}

fn transport_error(error: reqwest::Error) -> StoreError {
    if error.is_timeout() {
        StoreError::transport(format!("request timed out: {error}"))
    } else {
        StoreError::transport(error.to_string())
    }
}

#[async_trait]
impl ActualStateStore for DataplaneClient {
    async fn list(&self, table: &str) -> std::result::Result<EntrySet, StoreError> {
        let url = self.entries_url(table, None, false)?;
        let resource = format!("map '{table}'");
        let entries = self
            .execute::<EntrySet>(Method::GET, url, None, &resource)
            .await?;
        Ok(entries.unwrap_or_default())
    }

    async fn create(&self, table: &str, entry: &Entry) -> std::result::Result<Entry, StoreError> {
        self.mutate(Method::POST, table, entry, false).await
    }

    async fn update(&self, table: &str, entry: &Entry) -> std::result::Result<Entry, StoreError> {
        self.mutate(Method::PUT, table, entry, true).await
    }

    async fn delete(&self, table: &str, entry: &Entry) -> std::result::Result<Entry, StoreError> {
        self.mutate(Method::DELETE, table, entry, true).await
    }
}
