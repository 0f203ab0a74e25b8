//! Membership source adapter.
//!
//! Turns the overlay controller's member list into normalized [`Member`]s.
//! Failures never reach the caller: they are logged and reported as an
//! empty list, which the scheduler reads as "no update this cycle".

use async_trait::async_trait;
use std::time::Duration;
use synk_client::CentralClient;
use synk_core::{Member, Result};
use tracing::{debug, warn};

use crate::config::DaemonConfig;

/// Anything that can list the current overlay members.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// Current members; empty when the source could not be read.
    async fn fetch_members(&self) -> Vec<Member>;
}

/// Membership read from the overlay controller's management API.
pub struct CentralMembershipSource {
    client: CentralClient,
    network_id: String,
    remote_path: String,
}

impl CentralMembershipSource {
    /// Build the adapter from validated configuration.
    pub fn from_config(config: &DaemonConfig) -> Result<Self> {
        let client = CentralClient::builder(config.api_token.clone())
            .base_url(config.api_url.clone())
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::new(client, config.network_id.clone(), config.remote_path()))
    }

    /// Wrap an existing client
    pub fn new(
        client: CentralClient,
        network_id: impl Into<String>,
        remote_path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            network_id: network_id.into(),
            remote_path: remote_path.into(),
        }
    }

    /// Fetch members, surfacing the error instead of swallowing it.
    pub async fn try_fetch(&self) -> Result<Vec<Member>> {
        self.client
            .members()
            .list_normalized(&self.network_id, Some(&self.remote_path))
            .await
    }
}

#[async_trait]
impl MembershipSource for CentralMembershipSource {
    async fn fetch_members(&self) -> Vec<Member> {
        match self.try_fetch().await {
            Ok(members) => {
                debug!(network = %self.network_id, count = members.len(), "fetched members");
                members
            }
            Err(e) => {
                warn!(
                    network = %self.network_id,
                    kind = %e.kind(),
                    error = %e,
                    "membership fetch failed, skipping update this cycle"
                );
                Vec::new()
            }
        }
    }
}
