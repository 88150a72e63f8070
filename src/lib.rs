//! # mapsyncproxy
//!
//! Keeps HAProxy runtime maps in line with JSON manifests stored in Cloud
//! Storage. The binary wires the workspace crates together:
//!
//! - [`mapsync_reconciler`]: diff and apply logic
//! - [`mapsync_gcs`]: desired state from Cloud Storage
//! - [`mapsync_haproxy`]: actual state through the Data Plane API
//! - [`mapsync_web`]: HTTP API, probes and metrics

pub mod app;
pub mod cli;

pub use app::{AppConfig, build_state};
pub use cli::{Cli, Commands};
