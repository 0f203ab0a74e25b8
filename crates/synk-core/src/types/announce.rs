use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Body pushed to the local coordinator when this host shows up in the
/// overlay member list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAnnouncement {
    /// This host's overlay address
    pub address: IpAddr,

    /// This host's name as the overlay controller reports it
    pub hostname: String,

    /// Account peers should use when mirroring into this host
    pub principal: String,

    /// Where peers should place the shared directory contents
    pub remote_path: String,
}

/// A peer's own announcement as the coordinator hands it back.
///
/// Every field is optional; whatever is missing falls back to the registry
/// entry and the local mirror settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Address to mirror to, if the coordinator knows a better one
    #[serde(default, alias = "address")]
    pub ip: Option<IpAddr>,

    /// Remote login for the mirror tool
    #[serde(default, alias = "principal")]
    pub username: Option<String>,

    /// Destination directory on the peer
    #[serde(default)]
    pub remote_path: Option<String>,
}
