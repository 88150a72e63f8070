//! Configuration for the Data Plane client.

use std::time::Duration;

use crate::error::{Error, Result};

/// Connection settings for the HAProxy Data Plane API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataplaneConfig {
    /// Basic auth user.
    pub username: String,
    /// Basic auth password.
    pub password: String,
    /// `host:port` of the Data Plane API.
    pub host: String,
    /// Use plain HTTP instead of HTTPS.
    pub insecure: bool,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for DataplaneConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "adminpwd".to_string(),
            host: "127.0.0.1:5555".to_string(),
            insecure: true,
            timeout: default_timeout(),
        }
    }
}

impl DataplaneConfig {
    /// Create a config for a host with default credentials.
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Set the credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Switch between HTTP and HTTPS.
    #[must_use]
    pub const fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Root of the versioned API, e.g. `http://127.0.0.1:5555/v2/`.
    pub fn base_url(&self) -> String {
        let scheme = if self.insecure { "http" } else { "https" };
        format!("{scheme}://{}/v2/", self.host.trim_end_matches('/'))
    }

    /// Load configuration through a variable lookup, e.g. `std::env::var`.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] when `MAPSYNCPROXY_DATAPLANE_INSECURE`
    /// is not a boolean.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(username) = lookup("MAPSYNCPROXY_DATAPLANE_USERNAME") {
            config.username = username;
        }

        if let Some(password) = lookup("MAPSYNCPROXY_DATAPLANE_PASSWORD") {
            config.password = password;
        }

        if let Some(host) = lookup("MAPSYNCPROXY_DATAPLANE_HOST") {
            config.host = host;
        }

        if let Some(insecure) = lookup("MAPSYNCPROXY_DATAPLANE_INSECURE") {
            config.insecure = parse_bool("MAPSYNCPROXY_DATAPLANE_INSECURE", &insecure)?;
        }

        Ok(config)
    }
}

/// Parse a boolean flag the way shell users write them.
///
/// # Errors
///
/// Returns [`Error::ConfigError`] naming `name` for anything else.
pub fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::config_error(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

const fn default_timeout() -> Duration {
    Duration::from_secs(300) // 5 minutes
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = DataplaneConfig::default();
        assert_eq!(config.username, "admin");
        assert_eq!(config.host, "127.0.0.1:5555");
        assert!(config.insecure);
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.base_url(), "http://127.0.0.1:5555/v2/");
    }

    #[test]
    fn test_secure_base_url() {
        let config = DataplaneConfig::with_host("lb.internal:5555/").insecure(false);
        assert_eq!(config.base_url(), "https://lb.internal:5555/v2/");
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = DataplaneConfig::from_lookup(lookup(&[
            ("MAPSYNCPROXY_DATAPLANE_USERNAME", "ops"),
            ("MAPSYNCPROXY_DATAPLANE_HOST", "10.0.0.7:5555"),
            ("MAPSYNCPROXY_DATAPLANE_INSECURE", "false"),
        ]));

        assert!(config.is_ok());
        let config = config.ok();
        assert_eq!(config.as_ref().map(|c| c.username.as_str()), Some("ops"));
        assert_eq!(config.as_ref().map(|c| c.password.as_str()), Some("adminpwd"));
        assert_eq!(config.as_ref().map(|c| c.insecure), Some(false));
    }

    #[test]
    fn test_from_lookup_rejects_bad_bool() {
        let result =
            DataplaneConfig::from_lookup(lookup(&[("MAPSYNCPROXY_DATAPLANE_INSECURE", "maybe")]));
        assert!(matches!(result, Err(Error::ConfigError { .. })));
    }
}
