//! HAProxy Data Plane API client.
//!
//! [`DataplaneClient`] implements
//! [`ActualStateStore`](mapsync_reconciler::ActualStateStore) over the
//! runtime map entries endpoints, one HTTP call per entry.
//!
//! ## Example
//!
//! ```ignore
//! use mapsync_haproxy::{DataplaneClient, DataplaneConfig};
//! use mapsync_reconciler::ActualStateStore;
//!
//! let client = DataplaneClient::with_config(DataplaneConfig::with_host("10.0.0.7:5555"))?;
//! let entries = client.list("hosts").await?;
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::DataplaneClient;
pub use config::{DataplaneConfig, parse_bool};
pub use error::{Error, Result};
