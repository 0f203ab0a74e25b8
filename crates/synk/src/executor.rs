//! Directory sync executor.
//!
//! Runs the external mirror tool once per node with the shared directory's
//! *contents* (trailing slash) as source and `[user@]address:path/` as
//! destination. Exit status 0 is success; anything else, including a spawn
//! error or a timeout, is a failure scoped to that node alone.
//!
//! With a coordinator configured, each peer's login and path come from what
//! that peer announced there. A failed lookup fails that node without running
//! the tool. Without one, the registry entry and `ssh_user` are used.

use futures_util::stream::{self, StreamExt};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use synk_client::CoordinatorClient;
use synk_core::{PeerNode, Result, SyncAttemptResult, SynkError};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::DaemonConfig;

/// Longest slice of tool output kept in an error message.
const MAX_DIAGNOSTIC_LEN: usize = 2048;

/// Invokes the mirror tool for each node.
#[derive(Debug, Clone)]
pub struct SyncExecutor {
    command: String,
    args: Vec<String>,
    source: PathBuf,
    ssh_user: Option<String>,
    timeout: Duration,
    max_concurrent: usize,
    coordinator: Option<CoordinatorClient>,
}

impl SyncExecutor {
    /// Executor running `command` with `source` as the local directory.
    pub fn new(command: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            source: source.into(),
            ssh_user: None,
            timeout: Duration::from_secs(600),
            max_concurrent: 1,
            coordinator: None,
        }
    }

    /// Build from validated configuration.
    pub fn from_config(config: &DaemonConfig) -> Result<Self> {
        let coordinator = config
            .coordinator
            .url
            .as_ref()
            .map(|url| CoordinatorClient::new(url.clone(), config.coordinator_timeout()))
            .transpose()?;

        Ok(
            Self::new(config.mirror.command.clone(), config.shared_directory.clone())
                .args(config.mirror.args.clone())
                .ssh_user(config.mirror.ssh_user.clone())
                .timeout(config.mirror_timeout())
                .max_concurrent(config.mirror.max_concurrent)
                .coordinator(coordinator),
        )
    }

    /// Arguments placed before source and destination
    #[must_use]
    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Remote login prefixed to the destination
    #[must_use]
    pub fn ssh_user(mut self, user: Option<String>) -> Self {
        self.ssh_user = user;
        self
    }

    /// Per-invocation time budget
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Coordinator consulted for each peer's login and path
    #[must_use]
    pub fn coordinator(mut self, client: Option<CoordinatorClient>) -> Self {
        self.coordinator = client;
        self
    }

    /// Maximum invocations in flight at once (at least one)
    #[must_use]
    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    /// Local directory being mirrored
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Source argument: the directory with a trailing slash, so its contents
    /// are mirrored rather than the directory itself.
    #[must_use]
    pub fn source_arg(&self) -> String {
        with_trailing_slash(&self.source.display().to_string())
    }

    /// Destination argument for `node` from local settings alone, or `None`
    /// while it has no address.
    #[must_use]
    pub fn destination(&self, node: &PeerNode) -> Option<String> {
        let address = node.address?;
        Some(format_destination(
            address,
            self.ssh_user.as_deref(),
            &node.remote_path,
        ))
    }

    /// Destination argument for `node`, asking the coordinator first when
    /// one is configured. Fields it leaves out fall back to local settings.
    pub async fn resolve_destination(&self, node: &PeerNode) -> Result<String> {
        let Some(address) = node.address else {
            return Err(SynkError::sync(&node.hostname, "no overlay address assigned"));
        };
        let Some(client) = &self.coordinator else {
            return Ok(format_destination(
                address,
                self.ssh_user.as_deref(),
                &node.remote_path,
            ));
        };

        let announced = client.node_config(address).await.map_err(|e| {
            SynkError::sync(&node.hostname, format!("coordinator lookup failed: {e}"))
        })?;
        debug!(hostname = %node.hostname, config = ?announced, "resolved destination");

        Ok(format_destination(
            announced.ip.unwrap_or(address),
            announced.username.as_deref().or(self.ssh_user.as_deref()),
            announced.remote_path.as_deref().unwrap_or(&node.remote_path),
        ))
    }

    /// Mirror to one node, returning the failure as an error.
    pub async fn try_sync_to(&self, node: &PeerNode) -> Result<()> {
        let destination = self.resolve_destination(node).await?;

        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .arg(self.source_arg())
            .arg(&destination)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!(
            hostname = %node.hostname,
            command = %self.command,
            args = ?self.args,
            destination = %destination,
            "running mirror tool"
        );

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return Err(SynkError::MirrorTimeout {
                    hostname: node.hostname.clone(),
                    secs: self.timeout.as_secs(),
                })
            }
            Ok(Err(e)) => {
                return Err(SynkError::sync(
                    &node.hostname,
                    format!("failed to run {}: {e}", self.command),
                ))
            }
            Ok(Ok(output)) => output,
        };

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let diagnostics = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };
        Err(SynkError::sync(
            &node.hostname,
            format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                truncate(diagnostics, MAX_DIAGNOSTIC_LEN)
            ),
        ))
    }

    /// Mirror to one node and record the attempt.
    pub async fn sync_to(&self, node: &PeerNode) -> SyncAttemptResult {
        info!(hostname = %node.hostname, "syncing");
        match self.try_sync_to(node).await {
            Ok(()) => {
                info!(hostname = %node.hostname, "sync successful");
                SyncAttemptResult::success(&node.hostname)
            }
            Err(e) => {
                error!(hostname = %node.hostname, kind = %e.kind(), error = %e, "sync failed");
                SyncAttemptResult::failure(&node.hostname, &e)
            }
        }
    }

    /// Mirror to every node.
    ///
    /// Each node is attempted exactly once regardless of how the others
    /// fare, with at most `max_concurrent` invocations in flight. Results
    /// are ordered by hostname.
    pub async fn sync_all(&self, nodes: &[PeerNode]) -> Vec<SyncAttemptResult> {
        let mut results: Vec<SyncAttemptResult> = stream::iter(nodes)
            .map(|node| self.sync_to(node))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;
        results.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        results
    }
}

fn format_destination(address: IpAddr, user: Option<&str>, path: &str) -> String {
    let host = match address {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{v6}]"),
    };
    let host = match user {
        Some(user) => format!("{user}@{host}"),
        None => host,
    };
    format!("{host}:{}", with_trailing_slash(path))
}

fn with_trailing_slash(path: &str) -> String {
    format!("{}/", path.trim_end_matches('/'))
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
