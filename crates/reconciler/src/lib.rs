//! Desired-state reconciliation of HAProxy runtime map entries.
//!
//! A synchronization run converges a live runtime map (the *actual* state)
//! towards entry manifests kept in an object store (the *desired* state):
//!
//! - **Resolve**: fetch one manifest, or every JSON manifest of a bucket
//! - **Validate**: reject requests with empty fields or duplicate keys
//! - **Diff**: partition keys into create, delete, update and unchanged
//! - **Apply**: issue single-entry calls, creates then deletes then updates
//!
//! The first failing entry call aborts the run. Calls made before it stay
//! applied; the returned [`SyncReport`] says how far the run got.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mapsync_reconciler::{
//!     InMemorySource, InMemoryTableStore, ReconcilerBuilder, SourceSelector, SyncRequest,
//! };
//!
//! #[tokio::main]
//! async fn main() -> mapsync_reconciler::Result<()> {
//!     let reconciler = ReconcilerBuilder::new()
//!         .with_reader(Arc::new(InMemorySource::new()))
//!         .with_store(Arc::new(InMemoryTableStore::new()))
//!         .build()?;
//!
//!     let request = SyncRequest::new("hosts", SourceSelector::all("maps-bucket"));
//!     let report = reconciler.synchronize(&request).await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

pub mod diff;
pub mod error;
pub mod metrics;
pub mod reconciler;
pub mod source;
pub mod store;
pub mod types;
pub mod validate;

// Re-export main types
pub use diff::diff;
pub use error::{Error, Result, SourceError, StoreError, ValidationError};
pub use metrics::{MetricsSink, NoopMetrics, RecordingMetrics, RunStatus};
pub use reconciler::{Reconciler, ReconcilerBuilder, ReconcilerConfig};
pub use source::{DesiredStateReader, InMemorySource, is_recognized, parse_manifest, resolve_desired_set};
pub use store::{ActualStateStore, InMemoryTableStore};
pub use types::{
    APPLY_ORDER, ApplyFailure, DiffResult, Entry, EntrySet, Operation, SourceObject,
    SourceSelector, SyncReport, SyncRequest, WILDCARD,
};
pub use validate::validate_unique_keys;
