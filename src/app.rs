//! Configuration and wiring of the production collaborators.

use std::sync::Arc;

use anyhow::{Context, Result};
use mapsync_gcs::{GcsClient, GcsConfig};
use mapsync_haproxy::{DataplaneClient, DataplaneConfig};
use mapsync_reconciler::ReconcilerConfig;
use mapsync_web::{AppState, ServerConfig};
use tracing::info;

/// Everything read from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub dataplane: DataplaneConfig,
    pub gcs: GcsConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration through a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable that could not be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            dataplane: DataplaneConfig::from_lookup(&lookup)
                .context("Invalid Data Plane configuration")?,
            gcs: GcsConfig::from_lookup(&lookup),
            server: ServerConfig::from_lookup(&lookup).context("Invalid server configuration")?,
        })
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

/// Build the handler state: Cloud Storage as desired state, the Data Plane
/// API as actual state.
///
/// # Errors
///
/// Returns an error if either HTTP client cannot be built.
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let dataplane = DataplaneClient::with_config(config.dataplane.clone())
        .context("Failed to create Data Plane client")?;
    let gcs = GcsClient::with_config(config.gcs.clone())
        .context("Failed to create Cloud Storage client")?;

    info!(
        dataplane = %config.dataplane.base_url(),
        storage = %config.gcs.endpoint,
        "Collaborators initialized"
    );

    AppState::new(Arc::new(gcs), Arc::new(dataplane), ReconcilerConfig::default())
        .context("Failed to build reconciler")
}
