//! Node registry: the persisted set of peers this host mirrors to.
//!
//! The registry maps hostname to [`PeerNode`] and is only ever changed by
//! [`Registry::reconcile_at`]. Every structural change is written through
//! [`Registry::save`], which replaces the file atomically so readers never
//! observe a partial write.
//!
//! Eviction is purely timestamp based: a peer that disappears from the
//! membership list stays until its last sighting ages past the staleness
//! threshold, and a peer that is still listed with an old timestamp is
//! removed all the same.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use synk_core::{Member, PeerNode, PeerStatus, Result, SynkError};
use tracing::{debug, error, info, warn};

/// On-disk registry layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryFile {
    shared_directory: String,
    #[serde(default)]
    nodes: Vec<PeerNode>,
}

/// What a reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Whether the node set differs from before the pass
    pub changed: bool,
    /// Hostnames inserted
    pub added: Vec<String>,
    /// Hostnames whose entry advanced
    pub updated: Vec<String>,
    /// Hostnames removed as stale
    pub evicted: Vec<String>,
    /// The local host's own entry, if it was in the member list
    pub local: Option<Member>,
}

/// Persisted mapping of hostname to peer metadata.
#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    shared_directory: String,
    nodes: BTreeMap<String, PeerNode>,
    staleness_threshold: Duration,
    dirty: bool,
}

impl Registry {
    /// Create an empty, unsaved registry.
    pub fn new(
        path: impl Into<PathBuf>,
        shared_directory: impl Into<String>,
        staleness_threshold: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            shared_directory: shared_directory.into(),
            nodes: BTreeMap::new(),
            staleness_threshold,
            dirty: false,
        }
    }

    /// Load the registry from `path`, or start empty.
    ///
    /// A missing file is created immediately. An unreadable or corrupt file
    /// is logged and left in place; the registry starts empty and the file
    /// is replaced on the next successful save.
    pub fn load_or_init(
        path: impl Into<PathBuf>,
        shared_directory: impl Into<String>,
        staleness_threshold: Duration,
    ) -> Self {
        let mut registry = Self::new(path, shared_directory, staleness_threshold);

        if !registry.path.exists() {
            registry.dirty = true;
            if let Err(e) = registry.save() {
                error!(error = %e, "failed to create registry file");
            }
            return registry;
        }

        match read_file(&registry.path) {
            Ok(file) => {
                if file.shared_directory != registry.shared_directory {
                    warn!(
                        stored = %file.shared_directory,
                        configured = %registry.shared_directory,
                        "registry was written for a different shared directory"
                    );
                    registry.dirty = true;
                }
                for node in file.nodes {
                    registry.nodes.insert(node.hostname.clone(), node);
                }
                debug!(
                    path = %registry.path.display(),
                    count = registry.nodes.len(),
                    "loaded registry"
                );
            }
            Err(e) => {
                error!(error = %e, "registry unreadable, starting empty");
                registry.dirty = true;
            }
        }

        registry
    }

    /// Registry file location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory mirrored to every node
    #[must_use]
    pub fn shared_directory(&self) -> &str {
        &self.shared_directory
    }

    /// Look up a node
    #[must_use]
    pub fn get(&self, hostname: &str) -> Option<&PeerNode> {
        self.nodes.get(hostname)
    }

    /// Check if a node is registered
    #[must_use]
    pub fn contains(&self, hostname: &str) -> bool {
        self.nodes.contains_key(hostname)
    }

    /// All nodes, ordered by hostname
    pub fn nodes(&self) -> impl Iterator<Item = &PeerNode> {
        self.nodes.values()
    }

    /// Get the number of registered nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether a structural change has not reached disk yet
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Derived freshness of every node at `now`
    #[must_use]
    pub fn statuses(&self, now: DateTime<Utc>) -> Vec<(&PeerNode, PeerStatus)> {
        self.nodes
            .values()
            .map(|node| (node, node.status(now, self.staleness_threshold)))
            .collect()
    }

    /// Reconcile against the current member list using the wall clock.
    pub fn reconcile(&mut self, members: &[Member], local_hostname: &str) -> ReconcileOutcome {
        self.reconcile_at(members, local_hostname, Utc::now())
    }

    /// Reconcile against `members` as of `now`.
    ///
    /// The local host is never inserted; its entry is handed back in
    /// [`ReconcileOutcome::local`]. Known nodes only move forward in time.
    /// Every node whose last sighting is missing or older than the staleness
    /// threshold is then evicted, whether or not it is still listed.
    ///
    /// This does not write to disk; call [`Registry::save`] when
    /// [`ReconcileOutcome::changed`] is set.
    pub fn reconcile_at(
        &mut self,
        members: &[Member],
        local_hostname: &str,
        now: DateTime<Utc>,
    ) -> ReconcileOutcome {
        let before = self.nodes.clone();
        let mut outcome = ReconcileOutcome::default();

        for member in members {
            if member.hostname == local_hostname {
                outcome.local = Some(member.clone());
                continue;
            }

            match self.nodes.get_mut(&member.hostname) {
                Some(node) => {
                    if node.merge(member) {
                        debug!(hostname = %member.hostname, "advanced last-seen");
                        outcome.updated.push(member.hostname.clone());
                    }
                }
                None => {
                    let node = PeerNode::from_member(member, &self.shared_directory);
                    if node.status(now, self.staleness_threshold) == PeerStatus::Stale {
                        debug!(hostname = %member.hostname, "ignoring member with stale last-seen");
                        continue;
                    }
                    info!(hostname = %member.hostname, address = ?member.address, "added new node");
                    outcome.added.push(member.hostname.clone());
                    self.nodes.insert(member.hostname.clone(), node);
                }
            }
        }

        // a local entry persisted by an older release is not a peer
        if self.nodes.remove(local_hostname).is_some() {
            info!(hostname = %local_hostname, "removed local host from registry");
        }

        let threshold = self.staleness_threshold;
        self.nodes.retain(|hostname, node| {
            match node.age(now) {
                Some(age) if age <= threshold => true,
                Some(age) => {
                    info!(
                        hostname = %hostname,
                        age_secs = age.num_seconds(),
                        threshold_secs = threshold.num_seconds(),
                        "evicted node: last seen longer ago than staleness threshold"
                    );
                    outcome.evicted.push(hostname.clone());
                    false
                }
                None => {
                    info!(hostname = %hostname, "evicted node: never seen");
                    outcome.evicted.push(hostname.clone());
                    false
                }
            }
        });

        outcome.changed = self.nodes != before;
        if outcome.changed {
            self.dirty = true;
        }
        outcome
    }

    /// Write the registry atomically.
    ///
    /// Serializes to a temporary file in the same directory, flushes it to
    /// disk, then renames it over the registry file. On failure the
    /// in-memory state is kept and the registry stays dirty.
    pub fn save(&mut self) -> Result<()> {
        let file = RegistryFile {
            shared_directory: self.shared_directory.clone(),
            nodes: self.nodes.values().cloned().collect(),
        };
        let json = serde_json::to_vec_pretty(&file)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SynkError::persistence(&self.path, e))?;
        }

        let temp_path = temp_path_for(&self.path);
        let write = || -> std::io::Result<()> {
            let mut tmp = std::fs::File::create(&temp_path)?;
            tmp.write_all(&json)?;
            tmp.write_all(b"\n")?;
            tmp.sync_all()?;
            std::fs::rename(&temp_path, &self.path)
        };

        if let Err(e) = write() {
            let _ = std::fs::remove_file(&temp_path);
            return Err(SynkError::persistence(&self.path, e));
        }

        self.dirty = false;
        debug!(path = %self.path.display(), count = self.nodes.len(), "saved registry");
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<RegistryFile> {
    let content = std::fs::read_to_string(path).map_err(|e| SynkError::persistence(path, e))?;
    serde_json::from_str(&content).map_err(|e| SynkError::persistence(path, e))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn member(hostname: &str, seen: i64) -> Member {
        Member::new(hostname)
            .with_last_seen(at(seen))
            .with_address(format!("192.168.192.{}", hostname.len()).parse().unwrap())
    }

    fn registry(dir: &tempfile::TempDir) -> Registry {
        Registry::new(
            dir.path().join("multi_node_sync.json"),
            "/shared",
            Duration::minutes(10),
        )
    }

    #[test]
    fn test_first_observation_inserts_peer() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);

        let outcome = reg.reconcile_at(&[member("node-b", -5)], "node-a", at(0));
        assert!(outcome.changed);
        assert_eq!(outcome.added, vec!["node-b"]);
        let node = reg.get("node-b").unwrap();
        assert_eq!(node.remote_path, "/shared");
        assert_eq!(node.last_seen, Some(at(-5)));
        assert!(reg.is_dirty());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);
        let members = vec![member("node-b", -5), member("node-c", -60)];

        assert!(reg.reconcile_at(&members, "node-a", at(0)).changed);
        let second = reg.reconcile_at(&members, "node-a", at(1));
        assert!(!second.changed);
        assert!(second.added.is_empty());
        assert!(second.updated.is_empty());
        assert!(second.evicted.is_empty());
    }

    #[test]
    fn test_older_observation_does_not_regress() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);
        reg.reconcile_at(&[member("node-b", -5)], "node-a", at(0));

        let outcome = reg.reconcile_at(&[member("node-b", -100)], "node-a", at(1));
        assert!(!outcome.changed);
        assert_eq!(reg.get("node-b").unwrap().last_seen, Some(at(-5)));

        let outcome = reg.reconcile_at(&[member("node-b", 0)], "node-a", at(1));
        assert!(outcome.changed);
        assert_eq!(outcome.updated, vec!["node-b"]);
        assert_eq!(reg.get("node-b").unwrap().last_seen, Some(at(0)));
    }

    #[test]
    fn test_local_host_is_never_inserted() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);

        let outcome = reg.reconcile_at(
            &[member("node-a", -1), member("node-b", -1)],
            "node-a",
            at(0),
        );
        assert!(!reg.contains("node-a"));
        assert!(reg.contains("node-b"));
        assert_eq!(outcome.local.unwrap().hostname, "node-a");
    }

    #[test]
    fn test_eviction_after_threshold_with_no_update() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);
        reg.reconcile_at(&[member("node-b", -5)], "node-a", at(0));
        assert!(reg.contains("node-b"));

        let outcome = reg.reconcile_at(&[], "node-a", at(11 * 60));
        assert!(outcome.changed);
        assert_eq!(outcome.evicted, vec!["node-b"]);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_eviction_even_when_still_listed_with_stale_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);
        reg.reconcile_at(&[member("node-b", 0)], "node-a", at(0));

        // controller still lists node-b, but has not heard from it for 11 minutes
        let outcome = reg.reconcile_at(&[member("node-b", 0)], "node-a", at(11 * 60));
        assert_eq!(outcome.evicted, vec!["node-b"]);
        assert!(!reg.contains("node-b"));
    }

    #[test]
    fn test_absent_member_survives_until_stale() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);
        reg.reconcile_at(&[member("node-b", 0)], "node-a", at(0));

        let outcome = reg.reconcile_at(&[], "node-a", at(9 * 60));
        assert!(!outcome.changed);
        assert!(reg.contains("node-b"));
    }

    #[test]
    fn test_member_without_last_seen_is_not_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);

        let outcome = reg.reconcile_at(&[Member::new("node-x")], "node-a", at(0));
        assert!(!outcome.changed);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);
        reg.reconcile_at(
            &[member("node-c", -2), member("node-b", -1)],
            "node-a",
            at(0),
        );
        reg.save().unwrap();
        assert!(!reg.is_dirty());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(reg.path()).unwrap()).unwrap();
        assert_eq!(raw["shared_directory"], "/shared");
        assert_eq!(raw["nodes"][0]["hostname"], "node-b");
        assert_eq!(raw["nodes"][1]["hostname"], "node-c");

        let reloaded = Registry::load_or_init(reg.path(), "/shared", Duration::minutes(10));
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("node-b"), reg.get("node-b"));
        assert!(!reloaded.is_dirty());
        assert!(!temp_path_for(reg.path()).exists());
    }

    #[test]
    fn test_load_or_init_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("multi_node_sync.json");
        let reg = Registry::load_or_init(&path, "/shared", Duration::minutes(10));
        assert!(reg.is_empty());
        assert!(path.exists());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"shared_directory": "/shared", "nodes": []}));
    }

    #[test]
    fn test_load_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi_node_sync.json");
        std::fs::write(&path, "{ not json").unwrap();

        let reg = Registry::load_or_init(&path, "/shared", Duration::minutes(10));
        assert!(reg.is_empty());
        assert!(reg.is_dirty());
    }

    #[test]
    fn test_save_failure_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        // the registry path is a directory, so the rename cannot succeed
        let path = dir.path().join("taken");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        let mut reg = Registry::new(&path, "/shared", Duration::minutes(10));
        reg.reconcile_at(&[member("node-b", 0)], "node-a", at(0));

        let err = reg.save().unwrap_err();
        assert_eq!(err.kind(), synk_core::ErrorKind::Persistence);
        assert!(reg.is_dirty());
        assert!(reg.contains("node-b"));
    }

    #[test]
    fn test_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);
        reg.reconcile_at(&[member("node-b", 0)], "node-a", at(0));

        let statuses = reg.statuses(at(60));
        assert_eq!(statuses[0].1, PeerStatus::Fresh);
        let statuses = reg.statuses(at(601));
        assert_eq!(statuses[0].1, PeerStatus::Stale);
    }
}
