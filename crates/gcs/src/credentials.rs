//! Bearer tokens for storage requests.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::Credentials;
use crate::error::{Error, Result};

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Hands out the bearer token for the configured credentials.
#[derive(Debug)]
pub struct TokenSource {
    credentials: Credentials,
    http_client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    /// Create a token source sharing the reader's HTTP client.
    pub fn new(credentials: Credentials, http_client: reqwest::Client) -> Self {
        Self {
            credentials,
            http_client,
            cached: Mutex::new(None),
        }
    }

    /// Current token, or `None` for anonymous access.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] when the metadata server cannot be reached or
    /// answers with something other than a token.
    pub async fn token(&self) -> Result<Option<String>> {
        match &self.credentials {
            Credentials::Anonymous => Ok(None),
            Credentials::Static(token) => Ok(Some(token.clone())),
            Credentials::MetadataServer { token_url } => {
                self.metadata_token(token_url).await.map(Some)
            }
        }
    }

    async fn metadata_token(&self, token_url: &str) -> Result<String> {
        // Held across the refresh: one request per expiry.
        let mut cached = self.cached.lock().await;

        if let Some(current) = cached.as_ref().filter(|c| Instant::now() < c.refresh_at) {
            return Ok(current.token.clone());
        }

        debug!(%token_url, "Refreshing access token");
        let response = self
            .http_client
            .get(token_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| Error::token(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::token(format!(
                "metadata server returned {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::token(e.to_string()))?;

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            token: body.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        Ok(body.access_token)
    }
}
