use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SynkError;

/// Outcome of one mirror invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    /// Mirror tool exited with status 0
    Success,
    /// Spawn error, non-zero exit, timeout or unresolved address
    Failure,
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// Result of syncing the shared directory to one node.
///
/// Used for logging and reporting only; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAttemptResult {
    /// Target node
    pub hostname: String,

    /// Whether the mirror succeeded
    pub outcome: SyncOutcome,

    /// Failure detail, including captured tool output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the attempt finished
    pub timestamp: DateTime<Utc>,
}

impl SyncAttemptResult {
    /// A successful attempt, stamped now
    pub fn success(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            outcome: SyncOutcome::Success,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// A failed attempt, stamped now
    pub fn failure(hostname: impl Into<String>, error: &SynkError) -> Self {
        Self {
            hostname: hostname.into(),
            outcome: SyncOutcome::Failure,
            error: Some(error.to_string()),
            timestamp: Utc::now(),
        }
    }

    /// Returns true if the mirror succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == SyncOutcome::Success
    }
}

/// SHA-256 digest over a directory's file contents, lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectoryFingerprint(String);

impl DirectoryFingerprint {
    /// Wrap a hex digest
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The hex digest
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, for log lines
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for DirectoryFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The shared directory changed while a sweep was running.
///
/// Observational only: nothing re-syncs automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftWarning {
    /// Fingerprint taken before the first sync
    pub before: DirectoryFingerprint,

    /// Fingerprint taken after the last sync
    pub after: DirectoryFingerprint,

    /// When the second fingerprint was taken
    pub detected_at: DateTime<Utc>,
}

impl std::fmt::Display for DriftWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "local directory changed during sync ({} -> {})",
            self.before.short(),
            self.after.short()
        )
    }
}
