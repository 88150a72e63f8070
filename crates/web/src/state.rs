//! Shared handler state.

use std::sync::Arc;

use mapsync_reconciler::{
    ActualStateStore, DesiredStateReader, Reconciler, ReconcilerBuilder, ReconcilerConfig,
};

use crate::metrics::PrometheusMetrics;

/// State shared by every route.
#[derive(Clone)]
pub struct AppState {
    /// Runs synchronizations and exports.
    pub reconciler: Arc<Reconciler>,
    /// Counters exposed on `/metrics`.
    pub metrics: Arc<PrometheusMetrics>,
}

impl AppState {
    /// Wire a reconciler that reports into a fresh Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns [`mapsync_reconciler::Error::InvalidConfig`] when the
    /// reconciler configuration is rejected.
    pub fn new(
        reader: Arc<dyn DesiredStateReader>,
        store: Arc<dyn ActualStateStore>,
        config: ReconcilerConfig,
    ) -> mapsync_reconciler::Result<Self> {
        let metrics = Arc::new(PrometheusMetrics::new());
        let reconciler = ReconcilerBuilder::new()
            .with_reader(reader)
            .with_store(store)
            .with_metrics(metrics.clone())
            .with_config(config)
            .build()?;

        Ok(Self {
            reconciler: Arc::new(reconciler),
            metrics,
        })
    }
}
