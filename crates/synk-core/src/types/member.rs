use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// A member of the overlay network, normalized from the controller's view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Member name; the registry key
    pub hostname: String,

    /// First assigned overlay address, if the controller has assigned one
    #[serde(default)]
    pub address: Option<IpAddr>,

    /// When the controller last heard from this member
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,

    /// Destination directory on this member
    #[serde(default)]
    pub remote_path: Option<String>,
}

impl Member {
    /// Create a member with only a hostname
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            address: None,
            last_seen: None,
            remote_path: None,
        }
    }

    /// Set the overlay address
    #[must_use]
    pub const fn with_address(mut self, address: IpAddr) -> Self {
        self.address = Some(address);
        self
    }

    /// Set the last-seen timestamp
    #[must_use]
    pub const fn with_last_seen(mut self, last_seen: DateTime<Utc>) -> Self {
        self.last_seen = Some(last_seen);
        self
    }

    /// Set the destination directory
    #[must_use]
    pub fn with_remote_path(mut self, path: impl Into<String>) -> Self {
        self.remote_path = Some(path.into());
        self
    }
}

/// A network member exactly as the overlay controller's management API
/// returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerMember {
    /// Controller-side member id (`<network>-<node>`)
    #[serde(default)]
    pub id: Option<String>,

    /// Ten-hex-digit node address
    #[serde(default)]
    pub node_id: Option<String>,

    /// Name assigned in the controller UI
    #[serde(default)]
    pub name: Option<String>,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// Last contact with the controller (epoch milliseconds)
    #[serde(default)]
    pub last_seen: Option<i64>,

    /// Last time the member was online (epoch milliseconds)
    #[serde(default)]
    pub last_online: Option<i64>,

    /// Public address the member connects from
    #[serde(default)]
    pub physical_address: Option<String>,

    /// Network membership configuration
    #[serde(default)]
    pub config: MemberConfig,
}

/// The `config` object of a controller member
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberConfig {
    /// Whether the member is allowed on the network
    #[serde(default)]
    pub authorized: Option<bool>,

    /// Overlay addresses assigned to the member
    #[serde(default)]
    pub ip_assignments: Vec<String>,
}

impl ControllerMember {
    /// Name used as the registry key: `name`, else `nodeId`, else `id`.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        [&self.name, &self.node_id, &self.id]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .find(|s| !s.is_empty())
    }

    /// First parseable overlay address, with any CIDR suffix stripped.
    #[must_use]
    pub fn overlay_address(&self) -> Option<IpAddr> {
        self.config
            .ip_assignments
            .iter()
            .filter_map(|ip| ip.split('/').next())
            .find_map(|ip| ip.trim().parse().ok())
    }

    /// The newer of `lastSeen` and `lastOnline`. Zero means "never".
    #[must_use]
    pub fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        [self.last_seen, self.last_online]
            .into_iter()
            .flatten()
            .filter(|ms| *ms > 0)
            .max()
            .and_then(DateTime::from_timestamp_millis)
    }

    /// Returns false only when the controller explicitly deauthorized the member
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        self.config.authorized.unwrap_or(true)
    }

    /// Normalize into a [`Member`].
    ///
    /// Returns `None` for deauthorized members and members with no usable name.
    #[must_use]
    pub fn normalize(&self, remote_path: Option<&str>) -> Option<Member> {
        if !self.is_authorized() {
            return None;
        }
        let hostname = self.hostname()?;

        Some(Member {
            hostname: hostname.to_string(),
            address: self.overlay_address(),
            last_seen: self.last_seen_at(),
            remote_path: remote_path.map(String::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ControllerMember {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_normalize_full_member() {
        let member = parse(
            r#"{
                "id": "17d709436c9787ee-a1b2c3d4e5",
                "nodeId": "a1b2c3d4e5",
                "name": "node-b",
                "lastSeen": 1700000000000,
                "physicalAddress": "203.0.113.7",
                "config": {"authorized": true, "ipAssignments": ["192.168.192.58"]}
            }"#,
        );

        let normalized = member.normalize(Some("/shared")).unwrap();
        assert_eq!(normalized.hostname, "node-b");
        assert_eq!(normalized.address, Some("192.168.192.58".parse().unwrap()));
        assert_eq!(
            normalized.last_seen,
            DateTime::from_timestamp_millis(1_700_000_000_000)
        );
        assert_eq!(normalized.remote_path.as_deref(), Some("/shared"));
    }

    #[test]
    fn test_hostname_falls_back_to_node_id() {
        let member = parse(r#"{"id": "net-abc", "nodeId": "abc", "name": "  "}"#);
        assert_eq!(member.hostname(), Some("abc"));

        let member = parse(r#"{"id": "net-abc"}"#);
        assert_eq!(member.hostname(), Some("net-abc"));

        let member = parse("{}");
        assert!(member.normalize(None).is_none());
    }

    #[test]
    fn test_overlay_address_strips_cidr_and_skips_garbage() {
        let member = parse(r#"{"config": {"ipAssignments": ["not-an-ip", "10.147.17.9/24"]}}"#);
        assert_eq!(member.overlay_address(), Some("10.147.17.9".parse().unwrap()));

        let member = parse(r#"{"config": {"ipAssignments": []}}"#);
        assert_eq!(member.overlay_address(), None);
    }

    #[test]
    fn test_last_seen_prefers_newer_and_ignores_zero() {
        let member = parse(r#"{"lastSeen": 1000, "lastOnline": 5000}"#);
        assert_eq!(member.last_seen_at(), DateTime::from_timestamp_millis(5000));

        let member = parse(r#"{"lastSeen": 0}"#);
        assert_eq!(member.last_seen_at(), None);
    }

    #[test]
    fn test_deauthorized_member_is_dropped() {
        let member = parse(r#"{"name": "node-x", "config": {"authorized": false}}"#);
        assert!(member.normalize(None).is_none());

        // absent flag counts as authorized
        let member = parse(r#"{"name": "node-y"}"#);
        assert!(member.normalize(None).is_some());
    }
}
