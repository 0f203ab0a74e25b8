//! Overlay network controller API client.

use crate::api::MembersApi;
use crate::http;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use synk_core::{Result, SynkError};
use tracing::debug;

/// The controller management API base URL
const DEFAULT_BASE_URL: &str = "https://api.zerotier.com/api/v1";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the overlay network controller's management API
#[derive(Clone)]
pub struct CentralClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    token: String,
    base_url: String,
    timeout: Duration,
}

impl CentralClient {
    /// Create a new client with the given API token using default settings
    pub fn new(token: impl Into<String>) -> Result<Self> {
        CentralClientBuilder::new(token).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(token: impl Into<String>) -> CentralClientBuilder {
        CentralClientBuilder::new(token)
    }

    /// Access network member endpoints
    #[must_use]
    pub const fn members(&self) -> MembersApi<'_> {
        MembersApi::new(self)
    }

    /// The configured base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Perform an authenticated GET request
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = http::join_url(&self.inner.base_url, path)?;
        debug!(url = %url, "GET request");

        let response = self
            .inner
            .http
            .get(url)
            .bearer_auth(&self.inner.token)
            .send()
            .await
            .map_err(|e| http::transport_error(&e, self.inner.timeout.as_secs()))?;

        http::handle_response(response).await
    }
}

/// Builder for configuring a [`CentralClient`]
pub struct CentralClientBuilder {
    token: String,
    base_url: String,
    timeout: Duration,
    user_agent: String,
}

impl CentralClientBuilder {
    /// Create a new builder with the given API token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("synk/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the base URL (useful for testing)
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<CentralClient> {
        if self.token.trim().is_empty() {
            return Err(SynkError::Config("API token must not be empty".into()));
        }

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| SynkError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(CentralClient {
            inner: Arc::new(ClientInner {
                http,
                token: self.token,
                base_url: self.base_url,
                timeout: self.timeout,
            }),
        })
    }
}
