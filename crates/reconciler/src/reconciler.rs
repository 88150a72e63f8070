//! Reconciler implementation.
//!
//! A run owns no state beyond its own stack: it fetches both snapshots,
//! computes the diff and applies it one entry at a time.
//!
//! # Concurrency
//!
//! Runs against the same table are not mutually excluded. Two racing runs
//! each read their own `actual` snapshot, so their interleaved writes can
//! leave a table matching neither desired state. Deployments must keep a
//! single writer per table.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::diff::diff;
use crate::error::{Error, Result};
use crate::metrics::{MetricsSink, NoopMetrics, RunStatus};
use crate::source::{DesiredStateReader, resolve_desired_set};
use crate::store::ActualStateStore;
use crate::types::{
    APPLY_ORDER, ApplyFailure, DiffResult, Entry, EntrySet, Operation, SyncReport, SyncRequest,
};
use crate::validate::validate_unique_keys;

/// Configuration for the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Content types a wildcard selector picks up.
    pub json_content_types: Vec<String>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            json_content_types: vec!["application/json".to_string()],
        }
    }
}

/// Reconciles live tables against manifests.
pub struct Reconciler {
    reader: Arc<dyn DesiredStateReader>,
    store: Arc<dyn ActualStateStore>,
    metrics: Arc<dyn MetricsSink>,
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(
        reader: Arc<dyn DesiredStateReader>,
        store: Arc<dyn ActualStateStore>,
        metrics: Arc<dyn MetricsSink>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            reader,
            store,
            metrics,
            config,
        }
    }

    /// Run one synchronization.
    ///
    /// The request is validated before any counter moves. From then on every
    /// failure is counted as an `error` transition for the table.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for an empty request field or duplicate keys
    /// - [`Error::Source`] when the desired state cannot be resolved
    /// - [`Error::Store`] when the live table cannot be read
    /// - [`Error::Apply`] when an entry call fails, with the partial report
    pub async fn synchronize(&self, request: &SyncRequest) -> Result<SyncReport> {
        request.validate()?;

        let table = request.table.as_str();
        self.metrics.synchronization(table, RunStatus::Processed);

        let outcome = self.run(request).await;
        match &outcome {
            Ok(report) => {
                info!(%report, "Synchronization success");
                self.metrics.synchronization(table, RunStatus::Success);
            }
            Err(e) => {
                warn!(table, error = %e, "Synchronization failed");
                self.metrics.synchronization(table, RunStatus::Error);
            }
        }
        outcome
    }

    async fn run(&self, request: &SyncRequest) -> Result<SyncReport> {
        let table = request.table.as_str();
        let desired = self.resolve_desired_set(request).await?;
        let actual = self.store.list(table).await?;

        info!(
            table,
            desired = desired.len(),
            actual = actual.len(),
            "Starting reconciliation"
        );

        let changes = diff(&desired, &actual);
        debug!(
            create = changes.to_create.len(),
            delete = changes.to_delete.len(),
            update = changes.to_update.len(),
            unchanged = changes.unchanged,
            "Computed diff"
        );

        let report = self.apply(table, &changes).await;
        if report.is_success() {
            Ok(report)
        } else {
            Err(Error::Apply(Box::new(report)))
        }
    }

    /// Resolve and validate the desired entries of a request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Source`] on listing, download or parse failures and
    /// [`Error::Validation`] when the combined set repeats a key.
    pub async fn resolve_desired_set(&self, request: &SyncRequest) -> Result<EntrySet> {
        let desired = resolve_desired_set(
            self.reader.as_ref(),
            &request.selector,
            &self.config.json_content_types,
        )
        .await?;
        validate_unique_keys(&desired)?;
        Ok(desired)
    }

    /// Apply a diff to a table.
    ///
    /// Phases run in [`APPLY_ORDER`], entries in diff order. The first failing
    /// call aborts the whole run; calls made before it stay applied.
    pub async fn apply(&self, table: &str, changes: &DiffResult) -> SyncReport {
        let mut report = SyncReport::new(table);

        for operation in APPLY_ORDER {
            for entry in changes.entries(operation) {
                debug!(table, %operation, key = %entry.key, "Applying entry");

                match self.call(operation, table, entry).await {
                    Ok(_) => {
                        report.record(operation);
                        self.metrics.entry(table, operation);
                    }
                    Err(error) => {
                        warn!(table, %operation, key = %entry.key, %error, "Entry call failed");
                        report.failure = Some(ApplyFailure {
                            operation,
                            key: entry.key.clone(),
                            error,
                        });
                        return report;
                    }
                }
            }
        }

        report
    }

    async fn call(
        &self,
        operation: Operation,
        table: &str,
        entry: &Entry,
    ) -> std::result::Result<Entry, crate::error::StoreError> {
        match operation {
            Operation::Create => self.store.create(table, entry).await,
            Operation::Delete => self.store.delete(table, entry).await,
            Operation::Update => self.store.update(table, entry).await,
        }
    }

    /// Read the live contents of a table, e.g. to bootstrap a manifest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty table name and
    /// [`Error::Store`] when the table cannot be read.
    pub async fn export(&self, table: &str) -> Result<EntrySet> {
        if table.trim().is_empty() {
            return Err(crate::error::ValidationError::EmptyField { field: "map_name" }.into());
        }

        self.metrics.export(table, RunStatus::Processed);
        match self.store.list(table).await {
            Ok(entries) => {
                self.metrics.export(table, RunStatus::Success);
                Ok(entries)
            }
            Err(e) => {
                warn!(table, error = %e, "Export failed");
                self.metrics.export(table, RunStatus::Error);
                Err(e.into())
            }
        }
    }

    /// Get the configuration.
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

/// Builder for Reconciler.
pub struct ReconcilerBuilder {
    reader: Option<Arc<dyn DesiredStateReader>>,
    store: Option<Arc<dyn ActualStateStore>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    config: ReconcilerConfig,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            reader: None,
            store: None,
            metrics: None,
            config: ReconcilerConfig::default(),
        }
    }

    /// Set the desired-state reader.
    #[must_use]
    pub fn with_reader(mut self, reader: Arc<dyn DesiredStateReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Set the live table store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ActualStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the reader or the store is
    /// missing, or when no content type is accepted.
    pub fn build(self) -> Result<Reconciler> {
        let reader = self
            .reader
            .ok_or_else(|| Error::invalid_config("desired-state reader is required"))?;
        let store = self
            .store
            .ok_or_else(|| Error::invalid_config("actual-state store is required"))?;
        if self.config.json_content_types.is_empty() {
            return Err(Error::invalid_config(
                "at least one JSON content type must be accepted",
            ));
        }
        let metrics = self.metrics.unwrap_or_else(|| Arc::new(NoopMetrics));

        Ok(Reconciler::new(reader, store, metrics, self.config))
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::error::{StoreError, ValidationError};
    use crate::metrics::RecordingMetrics;
    use crate::source::InMemorySource;
    use crate::store::InMemoryTableStore;
    use crate::types::SourceSelector;

    fn set(entries: &[(&str, &str)]) -> EntrySet {
        entries.iter().map(|(k, v)| Entry::new(*k, *v)).collect()
    }

    fn pairs(set: &EntrySet) -> Vec<(String, String)> {
        set.iter()
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    struct Fixture {
        source: Arc<InMemorySource>,
        store: Arc<InMemoryTableStore>,
        metrics: Arc<RecordingMetrics>,
        reconciler: Reconciler,
    }

    async fn setup(desired: &[(&str, &str)], actual: &[(&str, &str)]) -> Fixture {
        let source = Arc::new(InMemorySource::new());
        source.put_json("bucket", "hosts.json", &set(desired)).await;
        let store = Arc::new(InMemoryTableStore::new());
        store.add_table("hosts", set(actual)).await;
        let metrics = Arc::new(RecordingMetrics::new());

        let reconciler = ReconcilerBuilder::new()
            .with_reader(source.clone())
            .with_store(store.clone())
            .with_metrics(metrics.clone())
            .build()
            .expect("reconciler should build");

        Fixture {
            source,
            store,
            metrics,
            reconciler,
        }
    }

    fn request() -> SyncRequest {
        SyncRequest::new("hosts", SourceSelector::named("bucket", "hosts.json"))
    }

    #[tokio::test]
    async fn test_synchronize_mixed() {
        let fx = setup(&[("a", "1"), ("b", "2")], &[("b", "3"), ("c", "4")]).await;

        let report = fx.reconciler.synchronize(&request()).await.unwrap();

        assert_eq!((report.created, report.deleted, report.updated), (1, 1, 1));
        let live = fx.store.snapshot("hosts").await.unwrap();
        let mut live = pairs(&live);
        live.sort();
        assert_eq!(
            live,
            vec![("a".into(), "1".into()), ("b".into(), "2".into())]
        );

        assert_eq!(fx.metrics.runs("hosts", RunStatus::Processed), 1);
        assert_eq!(fx.metrics.runs("hosts", RunStatus::Success), 1);
        assert_eq!(fx.metrics.runs("hosts", RunStatus::Error), 0);
        assert_eq!(fx.metrics.entries("hosts", Operation::Create), 1);
        assert_eq!(fx.metrics.entries("hosts", Operation::Delete), 1);
        assert_eq!(fx.metrics.entries("hosts", Operation::Update), 1);
    }

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let fx = setup(&[("a", "1"), ("b", "2")], &[("b", "3"), ("c", "4")]).await;

        fx.reconciler.synchronize(&request()).await.unwrap();
        let second = fx.reconciler.synchronize(&request()).await.unwrap();

        assert_eq!(second.total_applied(), 0);
        assert_eq!(fx.metrics.runs("hosts", RunStatus::Success), 2);
    }

    #[tokio::test]
    async fn test_empty_table_name_is_rejected_before_metrics() {
        let fx = setup(&[], &[]).await;
        let request = SyncRequest::new("", SourceSelector::named("bucket", "hosts.json"));

        let err = fx.reconciler.synchronize(&request).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Validation(ValidationError::EmptyField { field: "map_name" })
        ));
        assert_eq!(fx.metrics.runs("", RunStatus::Processed), 0);
    }

    #[tokio::test]
    async fn test_duplicate_keys_abort_before_store_calls() {
        let fx = setup(&[("x", "1"), ("x", "2")], &[("y", "1")]).await;

        let err = fx.reconciler.synchronize(&request()).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Validation(ValidationError::DuplicateKey { ref key }) if key == "x"
        ));
        assert_eq!(pairs(&fx.store.snapshot("hosts").await.unwrap()).len(), 1);
        assert_eq!(fx.metrics.runs("hosts", RunStatus::Error), 1);
    }

    #[tokio::test]
    async fn test_wildcard_cross_resource_duplicate_is_rejected() {
        let fx = setup(&[("a", "1")], &[]).await;
        fx.source
            .put_json("bucket", "more.json", &set(&[("a", "2")]))
            .await;
        let request = SyncRequest::new("hosts", SourceSelector::all("bucket"));

        let err = fx.reconciler.synchronize(&request).await.unwrap_err();

        assert!(err.is_client_error());
        assert_eq!(fx.store.snapshot("hosts").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_source_failure_makes_no_store_calls() {
        let fx = setup(&[], &[("a", "1")]).await;
        let request = SyncRequest::new("hosts", SourceSelector::named("bucket", "missing.json"));

        let err = fx.reconciler.synchronize(&request).await.unwrap_err();

        assert!(matches!(err, Error::Source(_)));
        assert_eq!(fx.store.snapshot("hosts").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_table_is_not_found() {
        let fx = setup(&[("a", "1")], &[]).await;
        let request = SyncRequest::new("unknown", SourceSelector::named("bucket", "hosts.json"));

        let err = fx.reconciler.synchronize(&request).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(fx.metrics.runs("unknown", RunStatus::Error), 1);
    }

    #[tokio::test]
    async fn test_apply_reports_failure_with_partial_counts() {
        let fx = setup(&[], &[]).await;
        let changes = DiffResult {
            to_create: set(&[("a", "1")]),
            to_delete: set(&[("ghost", "1")]),
            to_update: set(&[("b", "2")]),
            unchanged: 0,
        };

        let report = fx.reconciler.apply("hosts", &changes).await;

        assert_eq!(report.created, 1);
        assert_eq!(report.deleted, 0);
        assert_eq!(report.updated, 0);
        let failure = report.failure.expect("delete of a missing key should fail");
        assert_eq!(failure.operation, Operation::Delete);
        assert_eq!(failure.key, "ghost");
        assert!(matches!(failure.error, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_export() {
        let fx = setup(&[], &[("a", "1")]).await;

        let entries = fx.reconciler.export("hosts").await.unwrap();
        assert_eq!(entries.keys().collect::<Vec<_>>(), vec!["a"]);
        assert!(entries.get("a").and_then(|e| e.id.as_ref()).is_some());
        assert_eq!(fx.metrics.exports("hosts", RunStatus::Success), 1);

        assert!(fx.reconciler.export("nope").await.is_err());
        assert_eq!(fx.metrics.exports("nope", RunStatus::Error), 1);
        assert!(fx.reconciler.export("").await.unwrap_err().is_client_error());
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let result = ReconcilerBuilder::new().build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));

        let result = ReconcilerBuilder::new()
            .with_reader(Arc::new(InMemorySource::new()))
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_builder_rejects_empty_content_types() {
        let result = ReconcilerBuilder::new()
            .with_reader(Arc::new(InMemorySource::new()))
            .with_store(Arc::new(InMemoryTableStore::new()))
            .with_config(ReconcilerConfig {
                json_content_types: vec![],
            })
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }
}
