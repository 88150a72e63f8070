//! Configuration for the storage reader.

use std::time::Duration;

/// Default public endpoint of the JSON API.
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Token endpoint of the GCE metadata server.
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// How requests are authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    /// No `Authorization` header, for public buckets and emulators.
    #[default]
    Anonymous,
    /// A fixed bearer token.
    Static(String),
    /// Tokens fetched from a metadata server and cached until expiry.
    MetadataServer {
        /// Token endpoint.
        token_url: String,
    },
}

impl Credentials {
    /// Tokens from the GCE metadata server.
    pub fn metadata_server() -> Self {
        Self::MetadataServer {
            token_url: METADATA_TOKEN_URL.to_string(),
        }
    }
}

/// Settings for the storage reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsConfig {
    /// Base URL of the JSON API.
    pub endpoint: String,
    /// Authentication mode.
    pub credentials: Credentials,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for GcsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials: Credentials::Anonymous,
            timeout: default_timeout(),
        }
    }
}

impl GcsConfig {
    /// Create a config for a custom endpoint, e.g. an emulator.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration through a variable lookup, e.g. `std::env::var`.
    ///
    /// A static token wins over the metadata server.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = lookup("MAPSYNCPROXY_GCS_ENDPOINT") {
            config.endpoint = endpoint;
        }

        let metadata = lookup("MAPSYNCPROXY_GCS_METADATA").is_some_and(|v| is_enabled(&v));
        config.credentials = match lookup("MAPSYNCPROXY_GCS_TOKEN") {
            Some(token) if !token.trim().is_empty() => Credentials::Static(token),
            _ if metadata => Credentials::metadata_server(),
            _ => Credentials::Anonymous,
        };

        config
    }
}

fn is_enabled(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

const fn default_timeout() -> Duration {
    Duration::from_secs(60)
}
