//! Prometheus counters for synchronization runs.
//!
//! Each [`PrometheusMetrics`] owns its recorder instead of installing a
//! global one, so several servers (or tests) can live in one process.

use mapsync_reconciler::{MetricsSink, Operation, RunStatus};
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

/// Synchronization runs by `status` and `map_name`.
pub const SYNCHRONIZATION_TOTAL: &str = "mapsyncproxy_synchronization_total";

/// Applied map entries by `status` and `map_name`.
pub const MAP_ENTRIES_TOTAL: &str = "mapsyncproxy_haproxy_mapentries_total";

/// Manifest generations by `status` and `map_name`.
pub const GENERATE_TOTAL: &str = "mapsyncproxy_generate_total";

/// [`MetricsSink`] backed by a Prometheus recorder.
pub struct PrometheusMetrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl PrometheusMetrics {
    /// Create a recorder with the counters described.
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe_counter!(
                SYNCHRONIZATION_TOTAL,
                "How many synchronizations processed, partitioned by status and map_name."
            );
            describe_counter!(
                MAP_ENTRIES_TOTAL,
                "How many map entries processed, partitioned by status and map_name."
            );
            describe_counter!(
                GENERATE_TOTAL,
                "How many manifest generations processed, partitioned by status and map_name."
            );
        });

        Self { recorder, handle }
    }

    /// Render every counter in the Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    fn increment(&self, name: &'static str, status: &'static str, table: &str) {
        metrics::with_local_recorder(&self.recorder, || {
            counter!(name, "status" => status, "map_name" => table.to_owned()).increment(1);
        });
    }
}

impl Default for PrometheusMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for PrometheusMetrics {
    fn synchronization(&self, table: &str, status: RunStatus) {
        self.increment(SYNCHRONIZATION_TOTAL, status.as_str(), table);
    }

    fn entry(&self, table: &str, operation: Operation) {
        self.increment(MAP_ENTRIES_TOTAL, operation.outcome(), table);
    }

    fn export(&self, table: &str, status: RunStatus) {
        self.increment(GENERATE_TOTAL, status.as_str(), table);
    }
}
