//! Coordinator sink: best-effort announcement of the local host.

use async_trait::async_trait;
use synk_client::CoordinatorClient;
use synk_core::{LocalAnnouncement, Result};
use tracing::{debug, warn};

use crate::config::DaemonConfig;

/// Receives this host's announcement whenever it shows up in the member list.
#[async_trait]
pub trait CoordinatorSink: Send + Sync {
    /// Push the announcement. Failures are logged, never returned.
    async fn announce(&self, announcement: &LocalAnnouncement);
}

/// Sink used when no coordinator is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCoordinator;

#[async_trait]
impl CoordinatorSink for DisabledCoordinator {
    async fn announce(&self, announcement: &LocalAnnouncement) {
        debug!(hostname = %announcement.hostname, "no coordinator configured, not announcing");
    }
}

/// Sink that POSTs to the coordinator's HTTP endpoint.
pub struct HttpCoordinatorSink {
    client: CoordinatorClient,
}

impl HttpCoordinatorSink {
    /// Wrap an existing client
    pub const fn new(client: CoordinatorClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CoordinatorSink for HttpCoordinatorSink {
    async fn announce(&self, announcement: &LocalAnnouncement) {
        match self.client.announce(announcement).await {
            Ok(()) => debug!(
                hostname = %announcement.hostname,
                address = %announcement.address,
                "announced local node to coordinator"
            ),
            Err(e) => warn!(
                hostname = %announcement.hostname,
                error = %e,
                "coordinator announcement failed"
            ),
        }
    }
}

/// Pick the sink the configuration asks for.
pub fn sink_from_config(config: &DaemonConfig) -> Result<Box<dyn CoordinatorSink>> {
    match &config.coordinator.url {
        Some(url) => {
            let client = CoordinatorClient::new(url.clone(), config.coordinator_timeout())?;
            Ok(Box::new(HttpCoordinatorSink::new(client)))
        }
        None => Ok(Box::new(DisabledCoordinator)),
    }
}

#[async_trait]
impl<T: CoordinatorSink + ?Sized> CoordinatorSink for Box<T> {
    async fn announce(&self, announcement: &LocalAnnouncement) {
        (**self).announce(announcement).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn announcement() -> LocalAnnouncement {
        LocalAnnouncement {
            address: "192.168.192.4".parse().unwrap(),
            hostname: "node-a".into(),
            principal: "synk".into(),
            remote_path: "/shared".into(),
        }
    }

    #[tokio::test]
    async fn test_http_sink_posts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/config/node"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = DaemonConfig::default();
        config.coordinator.url = Some(server.uri());
        let sink = sink_from_config(&config).unwrap();
        sink.announce(&announcement()).await;
    }

    #[tokio::test]
    async fn test_http_sink_swallows_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = CoordinatorClient::new(server.uri(), Duration::from_secs(2)).unwrap();
        HttpCoordinatorSink::new(client).announce(&announcement()).await;
    }

    #[tokio::test]
    async fn test_disabled_when_unconfigured() {
        let sink = sink_from_config(&DaemonConfig::default()).unwrap();
        sink.announce(&announcement()).await;
    }
}
