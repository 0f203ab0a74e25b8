use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for synk operations
pub type Result<T> = std::result::Result<T, SynkError>;

/// Recovery class of a [`SynkError`].
///
/// The scheduler decides what to do with a failure by its kind, never by
/// the concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or invalid configuration; the process must not start.
    Config,
    /// Membership source unreachable or refused; skip this cycle.
    TransientSource,
    /// Registry could not be written; keep in-memory state and retry.
    Persistence,
    /// One node failed to sync; isolated to that node.
    Sync,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::TransientSource => write!(f, "transient-source"),
            Self::Persistence => write!(f, "persistence"),
            Self::Sync => write!(f, "sync"),
        }
    }
}

/// Errors that can occur while discovering, tracking and syncing peers
#[derive(Error, Debug)]
pub enum SynkError {
    /// The management API rejected the token
    #[error("authentication failed: invalid or missing API token")]
    Unauthorized,

    /// The management API returned an error response
    #[error("API error ({code}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message from the API
        message: String,
    },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Request timed out
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration is invalid or missing required fields
    #[error("configuration error: {0}")]
    Config(String),

    /// The shared directory does not exist
    #[error("shared directory not found: {}", .0.display())]
    MissingSharedDirectory(PathBuf),

    /// Registry file could not be read or written
    #[error("registry persistence failed at {}: {reason}", path.display())]
    Persistence {
        /// Registry file path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Mirroring to a node failed
    #[error("sync to {hostname} failed: {reason}")]
    Sync {
        /// Target node
        hostname: String,
        /// Exit status or spawn error, with captured diagnostics
        reason: String,
    },

    /// Mirror tool exceeded its time budget
    #[error("sync to {hostname} timed out after {secs} seconds")]
    MirrorTimeout {
        /// Target node
        hostname: String,
        /// Configured timeout
        secs: u64,
    },

    /// Directory fingerprint could not be computed
    #[error("fingerprint of {} failed: {reason}", path.display())]
    Fingerprint {
        /// Directory being hashed
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SynkError {
    /// Build a persistence error for `path`.
    pub fn persistence(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a sync error for `hostname`.
    pub fn sync(hostname: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Sync {
            hostname: hostname.into(),
            reason: reason.to_string(),
        }
    }

    /// Classify this error into its recovery kind
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::MissingSharedDirectory(_) => ErrorKind::Config,
            Self::Persistence { .. } => ErrorKind::Persistence,
            Self::Sync { .. } | Self::MirrorTimeout { .. } => ErrorKind::Sync,
            Self::Unauthorized
            | Self::Api { .. }
            | Self::Http(_)
            | Self::Timeout(_)
            | Self::Json(_)
            | Self::Fingerprint { .. }
            | Self::Io(_) => ErrorKind::TransientSource,
        }
    }

    /// Returns true if the process must stop on this error
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Config)
    }

    /// Returns true if the error is due to authentication
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns the HTTP status code if this is an API error
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
