//! Error types for the Data Plane client.

use thiserror::Error;

/// Result type for client setup.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring the client.
///
/// Request failures are reported as
/// [`StoreError`](mapsync_reconciler::StoreError) so the reconciler can
/// classify them.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// URL parse error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// HTTP client could not be built.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a config error.
    pub fn config_error(reason: impl Into<String>) -> Self {
        Self::ConfigError {
            reason: reason.into(),
        }
    }
}
