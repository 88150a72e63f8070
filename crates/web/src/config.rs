//! HTTP server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

/// Invalid server settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `API_PORT` is not a TCP port.
    #[error("API_PORT must be a port number, got '{value}'")]
    InvalidPort { value: String },
}

/// Web server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port to listen on, on every interface.
    pub port: u16,
    /// Time allowed for in-flight requests once shutdown starts.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            shutdown_timeout: Duration::from_secs(15),
        }
    }
}

impl ServerConfig {
    /// Set the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Address to bind to.
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    /// Load configuration through a variable lookup, e.g. `std::env::var`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPort`] when `API_PORT` is set but is not
    /// a port number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup("API_PORT").filter(|p| !p.trim().is_empty()) {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort { value: port })?;
        }

        Ok(config)
    }
}
