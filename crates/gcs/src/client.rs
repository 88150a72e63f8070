//! Storage JSON API reader for entry manifests.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use mapsync_reconciler::{DesiredStateReader, SourceError, SourceObject};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::GcsConfig;
use crate::credentials::TokenSource;
use crate::error::Result;

/// One page of `objects.list`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    name: String,
    content_type: Option<String>,
}

/// Position of a listing between pages.
#[derive(Debug)]
enum Cursor {
    Start,
    Next(String),
    Done,
}

type Page = stream::Iter<std::vec::IntoIter<std::result::Result<SourceObject, SourceError>>>;

/// Reader over a Cloud Storage compatible JSON API.
#[derive(Debug)]
pub struct GcsClient {
    base_url: Url,
    http_client: reqwest::Client,
    tokens: TokenSource,
}

impl GcsClient {
    /// Create a reader for the public endpoint without credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_config(GcsConfig::default())
    }

    /// Create a reader with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn with_config(config: GcsConfig) -> Result<Self> {
        let base_url = Url::parse(&config.endpoint)?;
        let http_client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let tokens = TokenSource::new(config.credentials, http_client.clone());

        Ok(Self {
            base_url,
            http_client,
            tokens,
        })
    }

    /// `{endpoint}/storage/v1/b/{bucket}/o[/{object}]`, each name encoded
    /// as one path segment.
    fn objects_url(&self, bucket: &str, object: Option<&str>) -> std::result::Result<Url, String> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| "storage endpoint cannot carry a path".to_string())?;
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "b", bucket, "o"]);
            if let Some(object) = object {
                segments.push(object);
            }
        }
        Ok(url)
    }

    async fn get(&self, url: Url) -> std::result::Result<reqwest::Response, String> {
        let mut request = self.http_client.get(url);
        if let Some(token) = self.tokens.token().await.map_err(|e| e.to_string())? {
            request = request.bearer_auth(token);
        }
        request.send().await.map_err(|e| e.to_string())
    }

    async fn next_page(
        &self,
        bucket: &str,
        cursor: Cursor,
    ) -> std::result::Result<Option<(Page, Cursor)>, SourceError> {
        let page_token = match cursor {
            Cursor::Done => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
        };

        let mut url = self
            .objects_url(bucket, None)
            .map_err(|e| SourceError::list(bucket, e))?;
        if let Some(token) = &page_token {
            url.query_pairs_mut().append_pair("pageToken", token);
        }

        debug!(bucket, page_token = ?page_token, "Listing objects");
        let response = self
            .get(url)
            .await
            .map_err(|e| SourceError::list(bucket, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::list(
                bucket,
                format!("storage API returned {status}"),
            ));
        }

        let page: ObjectList = response
            .json()
            .await
            .map_err(|e| SourceError::list(bucket, e.to_string()))?;

        let next = page.next_page_token.map_or(Cursor::Done, Cursor::Next);
        let objects: Vec<_> = page
            .items
            .into_iter()
            .map(|o| Ok(SourceObject::new(o.name, o.content_type.as_deref())))
            .collect();

        Ok(Some((stream::iter(objects), next)))
    }
}

#[async_trait]
impl DesiredStateReader for GcsClient {
    fn list<'a>(
        &'a self,
        source_id: &'a str,
    ) -> BoxStream<'a, std::result::Result<SourceObject, SourceError>> {
        stream::try_unfold(Cursor::Start, move |cursor| {
            self.next_page(source_id, cursor)
        })
        .try_flatten()
        .boxed()
    }

    async fn fetch(&self, source_id: &str, name: &str) -> std::result::Result<Vec<u8>, SourceError> {
        let mut url = self
            .objects_url(source_id, Some(name))
            .map_err(|e| SourceError::fetch(source_id, name, e))?;
        url.query_pairs_mut().append_pair("alt", "media");

        debug!(bucket = source_id, object = name, "Downloading object");
        let response = self
            .get(url)
            .await
            .map_err(|e| SourceError::fetch(source_id, name, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::fetch(source_id, name, "object not found"));
        }
        if !status.is_success() {
            return Err(SourceError::fetch(
                source_id,
                name,
                format!("storage API returned {status}"),
            ));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| SourceError::fetch(source_id, name, e.to_string()))
    }
}
