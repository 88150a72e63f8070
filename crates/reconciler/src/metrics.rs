//! Counters emitted by the reconciler.
//!
//! The reconciler reports through an injected [`MetricsSink`] rather than a
//! process-wide registry, so runs can be observed without a metrics backend.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::types::Operation;

/// Lifecycle transition of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RunStatus {
    Processed,
    Success,
    Error,
}

impl RunStatus {
    /// Label value used by counters.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer of reconciliation outcomes. Counters only.
pub trait MetricsSink: Send + Sync {
    /// One synchronization run changed state.
    fn synchronization(&self, table: &str, status: RunStatus);

    /// One entry call succeeded.
    fn entry(&self, table: &str, operation: Operation);

    /// One export of a live table changed state.
    fn export(&self, _table: &str, _status: RunStatus) {}
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn synchronization(&self, _table: &str, _status: RunStatus) {}

    fn entry(&self, _table: &str, _operation: Operation) {}
}

/// Sink that keeps counts in memory, for tests.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    runs: Mutex<BTreeMap<(String, RunStatus), u64>>,
    entries: Mutex<BTreeMap<(String, &'static str), u64>>,
    exports: Mutex<BTreeMap<(String, RunStatus), u64>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of run transitions for a table.
    pub fn runs(&self, table: &str, status: RunStatus) -> u64 {
        read(&self.runs, &(table.to_owned(), status))
    }

    /// Count of successful entry calls for a table.
    pub fn entries(&self, table: &str, operation: Operation) -> u64 {
        read(&self.entries, &(table.to_owned(), operation.outcome()))
    }

    /// Count of export transitions for a table.
    pub fn exports(&self, table: &str, status: RunStatus) -> u64 {
        read(&self.exports, &(table.to_owned(), status))
    }
}

fn read<K: Ord>(counters: &Mutex<BTreeMap<K, u64>>, key: &K) -> u64 {
    counters
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(key)
        .copied()
        .unwrap_or(0)
}

fn bump<K: Ord>(counters: &Mutex<BTreeMap<K, u64>>, key: K) {
    let mut c = counters.lock().unwrap_or_else(PoisonError::into_inner);
    let count = c.entry(key).or_insert(0);
    *count = count.saturating_add(1);
}

impl MetricsSink for RecordingMetrics {
    fn synchronization(&self, table: &str, status: RunStatus) {
        bump(&self.runs, (table.to_owned(), status));
    }

    fn entry(&self, table: &str, operation: Operation) {
        bump(&self.entries, (table.to_owned(), operation.outcome()));
    }

    fn export(&self, table: &str, status: RunStatus) {
        bump(&self.exports, (table.to_owned(), status));
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[test]
    fn test_recording_metrics() {
        let metrics = RecordingMetrics::new();
        metrics.synchronization("hosts", RunStatus::Processed);
        metrics.synchronization("hosts", RunStatus::Processed);
        metrics.entry("hosts", Operation::Create);

        assert_eq!(metrics.runs("hosts", RunStatus::Processed), 2);
        assert_eq!(metrics.runs("hosts", RunStatus::Success), 0);
        assert_eq!(metrics.entries("hosts", Operation::Create), 1);
        assert_eq!(metrics.entries("other", Operation::Create), 0);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(RunStatus::Processed.to_string(), "processed");
        assert_eq!(RunStatus::Error.as_str(), "error");
    }

    #[test]
    fn test_counts_survive_poisoned_lock() {
        let metrics = RecordingMetrics::new();
        metrics.synchronization("hosts", RunStatus::Processed);

        let poisoned = catch_unwind(AssertUnwindSafe(|| {
            let _guard = metrics.runs.lock().unwrap();
            panic!("writer died holding the lock");
        }));
        assert!(poisoned.is_err());
        assert!(metrics.runs.is_poisoned());

        metrics.synchronization("hosts", RunStatus::Processed);
        assert_eq!(metrics.runs("hosts", RunStatus::Processed), 2);
    }
}
