//! Error types for the storage reader.

use thiserror::Error;

/// Result type for storage reader operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring the reader or obtaining credentials.
///
/// Listing and download failures are reported as
/// [`SourceError`](mapsync_reconciler::SourceError).
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// An access token could not be obtained.
    #[error("failed to obtain access token: {reason}")]
    Token { reason: String },

    /// URL parse error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// HTTP error from reqwest.
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

    /// Create a token error.
    pub fn token(reason: impl Into<String>) -> Self {
        Self::Token {
            reason: reason.into(),
        }
    }
}
