//! Local coordinator client.

use crate::http;
use reqwest::Client as HttpClient;
use std::net::IpAddr;
use std::time::Duration;
use synk_core::{LocalAnnouncement, NodeConfig, Result, SynkError};
use tracing::debug;

/// Path of the coordinator's node configuration endpoint
const NODE_CONFIG_PATH: &str = "/api/config/node";

/// Client for the sync coordinator: announces this host and looks up peers
#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl CoordinatorClient {
    /// Create a client for the coordinator at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        // fail at startup rather than on the first push
        http::join_url(&base_url, NODE_CONFIG_PATH)?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent(format!("synk/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SynkError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    /// POST this host's address and destination to the coordinator
    pub async fn announce(&self, announcement: &LocalAnnouncement) -> Result<()> {
        let url = http::join_url(&self.base_url, NODE_CONFIG_PATH)?;
        debug!(url = %url, hostname = %announcement.hostname, "POST announcement");

        let response = self
            .http
            .post(url)
            .json(announcement)
            .send()
            .await
            .map_err(|e| http::transport_error(&e, self.timeout.as_secs()))?;

        http::handle_empty_response(response).await
    }

    /// GET the configuration a peer announced, keyed by its overlay address
    pub async fn node_config(&self, ip: IpAddr) -> Result<NodeConfig> {
        let mut url = http::join_url(&self.base_url, NODE_CONFIG_PATH)?;
        url.query_pairs_mut().append_pair("ip", &ip.to_string());
        debug!(url = %url, "GET node config");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| http::transport_error(&e, self.timeout.as_secs()))?;

        http::handle_response(response).await
    }
}
