//! Desired-state sources and aggregation of their resources.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::types::{EntrySet, SourceObject, SourceSelector};

/// Read access to the collections holding entry manifests.
#[async_trait]
pub trait DesiredStateReader: Send + Sync {
    /// List the resources of a collection.
    ///
    /// The stream is lazy and finite; calling `list` again restarts it.
    fn list<'a>(&'a self, source_id: &'a str) -> BoxStream<'a, Result<SourceObject, SourceError>>;

    /// Download the raw body of one resource.
    async fn fetch(&self, source_id: &str, name: &str) -> Result<Vec<u8>, SourceError>;
}

/// Decode a manifest body into an entry set.
///
/// # Errors
///
/// Returns [`SourceError::Format`] when the body is not a JSON array of entries.
pub fn parse_manifest(name: &str, body: &[u8]) -> Result<EntrySet, SourceError> {
    serde_json::from_slice(body).map_err(|e| SourceError::format(name, e.to_string()))
}

/// Whether a declared content type is one of `accepted`, ignoring parameters.
pub fn is_recognized(content_type: Option<&str>, accepted: &[String]) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .is_some_and(|essence| accepted.iter().any(|a| a.eq_ignore_ascii_case(essence)))
}

/// Resolve a selector into the concatenated entries of every selected resource.
///
/// A wildcard selector fetches every listed resource whose content type is
/// in `json_content_types`, in listing order. No duplicate-key check is made
/// here; the combined set is validated by the caller.
///
/// # Errors
///
/// Returns the first listing, download or parse failure.
pub async fn resolve_desired_set(
    reader: &dyn DesiredStateReader,
    selector: &SourceSelector,
    json_content_types: &[String],
) -> Result<EntrySet, SourceError> {
    if !selector.is_wildcard() {
        info!(source = %selector.source, name = %selector.name, "Fetching manifest");
        let body = reader.fetch(&selector.source, &selector.name).await?;
        return parse_manifest(&selector.name, &body);
    }

    info!(source = %selector.source, "Fetching every JSON manifest of source");
    let mut objects = reader.list(&selector.source);
    let mut combined = EntrySet::new();

    while let Some(object) = objects.try_next().await? {
        if !is_recognized(object.content_type.as_deref(), json_content_types) {
            debug!(name = %object.name, content_type = ?object.content_type, "Skipping non-JSON resource");
            continue;
        }
        let body = reader.fetch(&selector.source, &object.name).await?;
        let entries = parse_manifest(&object.name, &body)?;
        info!(name = %object.name, entries = entries.len(), "Manifest downloaded");
        combined.extend(entries);
    }

    Ok(combined)
}

/// In-memory source for tests and local runs.
///
/// Resources are listed in name order, like an object store listing.
#[derive(Default)]
pub struct InMemorySource {
    sources: RwLock<BTreeMap<String, BTreeMap<String, (Option<String>, Vec<u8>)>>>,
}

impl InMemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a resource with an explicit content type.
    pub async fn put(
        &self,
        source_id: &str,
        name: &str,
        content_type: Option<&str>,
        body: impl Into<Vec<u8>>,
    ) {
        self.sources
            .write()
            .await
            .entry(source_id.to_owned())
            .or_default()
            .insert(name.to_owned(), (content_type.map(str::to_owned), body.into()));
    }

    /// Store a JSON manifest.
    pub async fn put_json(&self, source_id: &str, name: &str, entries: &EntrySet) {
        let body = serde_json::to_vec(entries).unwrap_or_default();
        self.put(source_id, name, Some("application/json"), body)
            .await;
    }
}

#[async_trait]
impl DesiredStateReader for InMemorySource {
    fn list<'a>(&'a self, source_id: &'a str) -> BoxStream<'a, Result<SourceObject, SourceError>> {
        stream::once(async move {
            let sources = self.sources.read().await;
            let objects: Vec<Result<SourceObject, SourceError>> = match sources.get(source_id) {
                Some(objects) => objects
                    .iter()
                    .map(|(name, (ct, _))| Ok(SourceObject::new(name.clone(), ct.as_deref())))
                    .collect(),
                None => vec![Err(SourceError::list(source_id, "source does not exist"))],
            };
            stream::iter(objects)
        })
        .flatten()
        .boxed()
    }

    async fn fetch(&self, source_id: &str, name: &str) -> Result<Vec<u8>, SourceError> {
        self.sources
            .read()
            .await
            .get(source_id)
            .and_then(|objects| objects.get(name))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| SourceError::fetch(source_id, name, "object does not exist"))
    }
}
