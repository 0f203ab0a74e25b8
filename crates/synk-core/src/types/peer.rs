use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::Member;

/// Freshness of a registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    /// Seen within the staleness threshold
    Fresh,
    /// Never seen, or last seen longer ago than the threshold
    Stale,
}

impl std::fmt::Display for PeerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fresh => write!(f, "fresh"),
            Self::Stale => write!(f, "stale"),
        }
    }
}

/// A peer storage node tracked by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerNode {
    /// Unique key within the registry
    pub hostname: String,

    /// Overlay address; `None` until the controller assigns one
    #[serde(default)]
    pub address: Option<IpAddr>,

    /// Last time the membership source saw this node
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,

    /// Destination directory on the node
    pub remote_path: String,
}

impl PeerNode {
    /// Create a never-seen node with no address
    pub fn new(hostname: impl Into<String>, remote_path: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            address: None,
            last_seen: None,
            remote_path: remote_path.into(),
        }
    }

    /// Build a node from its first observation.
    ///
    /// `default_remote_path` is used when the member carries none.
    #[must_use]
    pub fn from_member(member: &Member, default_remote_path: &str) -> Self {
        Self {
            hostname: member.hostname.clone(),
            address: member.address,
            last_seen: member.last_seen,
            remote_path: member
                .remote_path
                .clone()
                .unwrap_or_else(|| default_remote_path.to_string()),
        }
    }

    /// Age of the last sighting at `now`
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_seen.map(|seen| now - seen)
    }

    /// Derive freshness against `threshold`.
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>, threshold: Duration) -> PeerStatus {
        match self.age(now) {
            Some(age) if age <= threshold => PeerStatus::Fresh,
            _ => PeerStatus::Stale,
        }
    }

    /// Merge a later observation into this node.
    ///
    /// Only a strictly newer `last_seen` is accepted; address and remote path
    /// ride along with it. Returns true if anything changed.
    pub fn merge(&mut self, member: &Member) -> bool {
        let Some(incoming) = member.last_seen else {
            return false;
        };
        if self.last_seen.is_some_and(|current| incoming <= current) {
            return false;
        }

        self.last_seen = Some(incoming);
        if member.address.is_some() {
            self.address = member.address;
        }
        if let Some(path) = &member.remote_path {
            self.remote_path.clone_from(path);
        }
        true
    }
}
