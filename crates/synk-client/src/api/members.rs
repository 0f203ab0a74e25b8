//! Network member endpoints.

use crate::CentralClient;
use synk_core::{ControllerMember, Member, Result};

/// Network member endpoints
pub struct MembersApi<'a> {
    client: &'a CentralClient,
}

impl<'a> MembersApi<'a> {
    pub(crate) const fn new(client: &'a CentralClient) -> Self {
        Self { client }
    }

    /// List every member of a network as the controller reports it
    pub async fn list(&self, network_id: &str) -> Result<Vec<ControllerMember>> {
        self.client
            .get(&format!("/network/{network_id}/member"))
            .await
    }

    /// List members normalized for the registry.
    ///
    /// Deauthorized and unnamed members are dropped; each member gets
    /// `remote_path` as its destination directory.
    pub async fn list_normalized(
        &self,
        network_id: &str,
        remote_path: Option<&str>,
    ) -> Result<Vec<Member>> {
        let members = self.list(network_id).await?;
        Ok(members
            .iter()
            .filter_map(|m| m.normalize(remote_path))
            .collect())
    }
}
