//! Daemon configuration.
//!
//! Built once at startup from a TOML file, environment overrides and
//! (in the binary) command-line overrides, then validated and shared by
//! reference with every component.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use synk_core::{Result, SynkError};

/// Registry file name, kept from earlier releases so existing state is picked up
pub const REGISTRY_FILE_NAME: &str = "multi_node_sync.json";

/// Configuration for a synk node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Overlay network identifier (16 hex digits).
    #[serde(default)]
    pub network_id: String,

    /// Management API token.
    #[serde(default)]
    pub api_token: String,

    /// Management API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Local directory mirrored to every peer.
    #[serde(default)]
    pub shared_directory: PathBuf,

    /// Destination directory on peers (default: same as `shared_directory`).
    #[serde(default)]
    pub remote_path: Option<String>,

    /// Registry file (default: platform data dir).
    #[serde(default)]
    pub registry_path: Option<PathBuf>,

    /// This host's name on the overlay (default: system hostname).
    #[serde(default)]
    pub local_hostname: Option<String>,

    /// Seconds between sweeps.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Seconds after which an unseen peer is evicted.
    #[serde(default = "default_staleness_threshold")]
    pub staleness_threshold_secs: u64,

    /// Seconds to wait after a failed cycle.
    #[serde(default = "default_failure_backoff")]
    pub failure_backoff_secs: u64,

    /// Coordinator announcement settings.
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// External mirror tool settings.
    #[serde(default)]
    pub mirror: MirrorConfig,
}

/// Where and how to announce this host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Coordinator base URL; announcements are disabled when unset.
    #[serde(default)]
    pub url: Option<String>,

    /// Account peers use to reach this host (default: `$USER`).
    #[serde(default)]
    pub principal: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_coordinator_timeout")]
    pub timeout_secs: u64,
}

/// External mirror tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Program to run.
    #[serde(default = "default_mirror_command")]
    pub command: String,

    /// Arguments placed before the source and destination.
    #[serde(default = "default_mirror_args")]
    pub args: Vec<String>,

    /// Remote login; destination becomes `user@address:path` when set.
    #[serde(default)]
    pub ssh_user: Option<String>,

    /// Per-invocation time budget in seconds.
    #[serde(default = "default_mirror_timeout")]
    pub timeout_secs: u64,

    /// Maximum invocations in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            network_id: String::new(),
            api_token: String::new(),
            api_url: default_api_url(),
            shared_directory: PathBuf::new(),
            remote_path: None,
            registry_path: None,
            local_hostname: None,
            sync_interval_secs: default_sync_interval(),
            staleness_threshold_secs: default_staleness_threshold(),
            failure_backoff_secs: default_failure_backoff(),
            coordinator: CoordinatorConfig::default(),
            mirror: MirrorConfig::default(),
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            command: default_mirror_command(),
            args: default_mirror_args(),
            ssh_user: None,
            timeout_secs: default_mirror_timeout(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl DaemonConfig {
    /// Default config file location: `<config dir>/synk/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("synk").join("config.toml"))
    }

    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)
                .map_err(|e| SynkError::Config(format!("{}: {e}", path.display())))
        } else {
            Ok(Self::default())
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` as the environment.
    ///
    /// For each setting the first non-empty variable wins.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(k))
                .find(|v| !v.trim().is_empty())
        };

        if let Some(v) = get(&["SYNK_NETWORK_ID", "ZEROTIER_NETWORK_ID", "NETWORK_ID"]) {
            self.network_id = v;
        }
        if let Some(v) = get(&["SYNK_API_TOKEN", "ZEROTIER_API_TOKEN"]) {
            self.api_token = v;
        }
        if let Some(v) = get(&["SYNK_API_URL"]) {
            self.api_url = v;
        }
        if let Some(v) = get(&["SYNK_SHARED_DIR", "SHARED_DIR"]) {
            self.shared_directory = PathBuf::from(v);
        }
        if let Some(v) = get(&["SYNK_REMOTE_PATH"]) {
            self.remote_path = Some(v);
        }
        if let Some(v) = get(&["SYNK_REGISTRY_PATH"]) {
            self.registry_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get(&["SYNK_HOSTNAME"]) {
            self.local_hostname = Some(v);
        }
        if let Some(v) = get(&["SYNK_SYNC_INTERVAL", "SYNC_INTERVAL"]) {
            self.sync_interval_secs = parse_secs("SYNC_INTERVAL", &v)?;
        }
        if let Some(v) = get(&["SYNK_STALENESS_THRESHOLD"]) {
            self.staleness_threshold_secs = parse_secs("SYNK_STALENESS_THRESHOLD", &v)?;
        }
        if let Some(v) = get(&["SYNK_COORDINATOR_URL"]) {
            self.coordinator.url = Some(v);
        }
        if let Some(v) = get(&["SYNK_PRINCIPAL"]) {
            self.coordinator.principal = Some(v);
        }

        Ok(())
    }

    /// Check everything the daemon needs before it starts.
    pub fn validate(&self) -> Result<()> {
        if self.network_id.trim().is_empty() {
            return Err(SynkError::Config("network_id is required".into()));
        }
        if self.api_token.trim().is_empty() {
            return Err(SynkError::Config("api_token is required".into()));
        }
        if self.shared_directory.as_os_str().is_empty() {
            return Err(SynkError::Config("shared_directory is required".into()));
        }
        if !self.shared_directory.is_dir() {
            return Err(SynkError::MissingSharedDirectory(self.shared_directory.clone()));
        }
        for (name, value) in [
            ("sync_interval_secs", self.sync_interval_secs),
            ("staleness_threshold_secs", self.staleness_threshold_secs),
            ("failure_backoff_secs", self.failure_backoff_secs),
            ("mirror.timeout_secs", self.mirror.timeout_secs),
        ] {
            if value == 0 {
                return Err(SynkError::Config(format!("{name} must be greater than zero")));
            }
        }
        if threshold_from_secs(self.staleness_threshold_secs).is_none() {
            return Err(SynkError::Config(format!(
                "staleness_threshold_secs {} is out of range",
                self.staleness_threshold_secs
            )));
        }
        if self.mirror.max_concurrent == 0 {
            return Err(SynkError::Config(
                "mirror.max_concurrent must be greater than zero".into(),
            ));
        }
        if self.mirror.command.trim().is_empty() {
            return Err(SynkError::Config("mirror.command is required".into()));
        }
        Ok(())
    }

    /// Copy safe to print: the API token is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let token = &self.api_token;
        copy.api_token = if token.is_empty() {
            String::new()
        } else if token.len() > 8 && token.is_ascii() {
            format!("{}...{}", &token[..4], &token[token.len() - 4..])
        } else {
            "****".to_string()
        };
        copy
    }

    /// Time between sweeps
    #[must_use]
    pub const fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    /// Delay after a failed cycle
    #[must_use]
    pub const fn failure_backoff(&self) -> Duration {
        Duration::from_secs(self.failure_backoff_secs)
    }

    /// Maximum age of a peer's last sighting, saturating at the largest
    /// representable duration.
    #[must_use]
    pub fn staleness_threshold(&self) -> chrono::Duration {
        threshold_from_secs(self.staleness_threshold_secs).unwrap_or(chrono::Duration::MAX)
    }

    /// Request budget for coordinator calls (at least one second)
    #[must_use]
    pub fn coordinator_timeout(&self) -> Duration {
        Duration::from_secs(self.coordinator.timeout_secs.max(1))
    }

    /// Per-invocation mirror budget
    #[must_use]
    pub const fn mirror_timeout(&self) -> Duration {
        Duration::from_secs(self.mirror.timeout_secs)
    }

    /// Destination directory on peers
    #[must_use]
    pub fn remote_path(&self) -> String {
        self.remote_path
            .clone()
            .unwrap_or_else(|| self.shared_directory.display().to_string())
    }

    /// Registry file location
    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.registry_path.clone().unwrap_or_else(|| {
            dirs::data_dir().map_or_else(
                || PathBuf::from(REGISTRY_FILE_NAME),
                |d| d.join("synk").join(REGISTRY_FILE_NAME),
            )
        })
    }

    /// This host's name on the overlay
    #[must_use]
    pub fn local_hostname(&self) -> String {
        self.local_hostname.clone().unwrap_or_else(|| {
            hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| String::from("localhost"))
        })
    }

    /// Account announced to the coordinator
    #[must_use]
    pub fn principal(&self) -> String {
        self.coordinator
            .principal
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| String::from("synk"))
    }
}

fn threshold_from_secs(secs: u64) -> Option<chrono::Duration> {
    i64::try_from(secs).ok().and_then(chrono::Duration::try_seconds)
}

fn parse_secs(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| SynkError::Config(format!("{name}={value}: {e}")))
}

// Default value functions for serde.
fn default_api_url() -> String {
    String::from("https://api.zerotier.com/api/v1")
}

const fn default_sync_interval() -> u64 {
    300
}

const fn default_staleness_threshold() -> u64 {
    600
}

const fn default_failure_backoff() -> u64 {
    30
}

const fn default_coordinator_timeout() -> u64 {
    10
}

fn default_mirror_command() -> String {
    String::from("rsync")
}

fn default_mirror_args() -> Vec<String> {
    vec![String::from("-az")]
}

const fn default_mirror_timeout() -> u64 {
    600
}

const fn default_max_concurrent() -> usize {
    1
}
