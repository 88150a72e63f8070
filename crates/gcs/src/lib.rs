//! Cloud Storage reader for entry manifests.
//!
//! [`GcsClient`] implements
//! [`DesiredStateReader`](mapsync_reconciler::DesiredStateReader) on top of
//! the Storage JSON API. Listings are paged lazily; a page is only requested
//! once the previous one has been consumed.

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;

pub use client::GcsClient;
pub use config::{Credentials, DEFAULT_ENDPOINT, GcsConfig, METADATA_TOKEN_URL};
pub use credentials::TokenSource;
pub use error::{Error, Result};
