//! Sync scheduler: one cooperative loop driving fetch, reconcile and sync.
//!
//! ```text
//!   Idle -> Fetching -> Reconciling -> Syncing -> Idle
//!     ^                                              |
//!     +-------- sleep(interval | backoff) <----------+
//! ```
//!
//! [`Scheduler::step`] runs exactly one cycle, which makes the loop testable
//! one transition at a time. Because it takes `&mut self`, a second sweep
//! can never start while one is in flight.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use synk_core::{
    DirectoryFingerprint, DriftWarning, LocalAnnouncement, Member, PeerNode, Result,
    SyncAttemptResult,
};
use tracing::{debug, error, info};

use crate::config::DaemonConfig;
use crate::coordinator::CoordinatorSink;
use crate::drift;
use crate::executor::SyncExecutor;
use crate::membership::MembershipSource;
use crate::registry::{ReconcileOutcome, Registry};

/// Where the scheduler is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// Between cycles
    Idle,
    /// Waiting on the membership source
    Fetching,
    /// Applying the member list to the registry
    Reconciling,
    /// Mirroring to peers
    Syncing,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fetching => write!(f, "fetching"),
            Self::Reconciling => write!(f, "reconciling"),
            Self::Syncing => write!(f, "syncing"),
        }
    }
}

/// Outcome of the sync phase of one cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Fingerprint before the first sync; `None` when there was nothing to sync
    pub before: Option<DirectoryFingerprint>,
    /// Fingerprint after the last sync
    pub after: Option<DirectoryFingerprint>,
    /// One entry per node, ordered by hostname
    pub results: Vec<SyncAttemptResult>,
    /// Raised when the fingerprints differ
    pub drift: Option<DriftWarning>,
}

impl SweepReport {
    /// Number of nodes mirrored successfully
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Number of nodes that failed
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Everything one cycle did.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// Members returned by the source (zero when it was unreachable)
    pub members_fetched: usize,
    /// Hostnames added to the registry
    pub added: Vec<String>,
    /// Hostnames evicted from the registry
    pub evicted: Vec<String>,
    /// Whether the registry reached disk (or had nothing to write)
    pub persisted: bool,
    /// The sync phase
    pub sweep: SweepReport,
}

/// Drives the fetch, reconcile, sync loop.
pub struct Scheduler<S, C> {
    config: Arc<DaemonConfig>,
    source: S,
    coordinator: C,
    registry: Registry,
    executor: SyncExecutor,
    local_hostname: String,
    state: SchedulerState,
}

impl<S, C> Scheduler<S, C>
where
    S: MembershipSource,
    C: CoordinatorSink,
{
    /// Assemble a scheduler; the executor is built from `config`.
    pub fn new(
        config: Arc<DaemonConfig>,
        source: S,
        coordinator: C,
        registry: Registry,
    ) -> Result<Self> {
        let executor = SyncExecutor::from_config(&config)?;
        let local_hostname = config.local_hostname();
        Ok(Self {
            config,
            source,
            coordinator,
            registry,
            executor,
            local_hostname,
            state: SchedulerState::Idle,
        })
    }

    /// Replace the executor
    #[must_use]
    pub fn with_executor(mut self, executor: SyncExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// The registry as of the last cycle
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Name this host is known by on the overlay
    #[must_use]
    pub fn local_hostname(&self) -> &str {
        &self.local_hostname
    }

    /// Run one full cycle and return to `Idle`.
    ///
    /// Only a failure to fingerprint the shared directory aborts a cycle;
    /// source, persistence and per-node sync failures are absorbed and show
    /// up in the report.
    pub async fn step(&mut self) -> Result<CycleReport> {
        let result = self.cycle().await;
        self.transition(SchedulerState::Idle);
        result
    }

    /// Loop until `shutdown` resolves.
    ///
    /// Sleeps the sync interval after a good cycle and the failure backoff
    /// after a bad one. Never returns early on a cycle error.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            hostname = %self.local_hostname,
            interval_secs = self.config.sync_interval_secs,
            "scheduler started"
        );

        loop {
            let delay = tokio::select! {
                () = &mut shutdown => break,
                result = self.step() => match result {
                    Ok(_) => self.config.sync_interval(),
                    Err(e) => {
                        error!(
                            kind = %e.kind(),
                            error = %e,
                            backoff_secs = self.config.failure_backoff_secs,
                            "cycle failed"
                        );
                        self.config.failure_backoff()
                    }
                },
            };

            tokio::select! {
                () = &mut shutdown => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        self.state = SchedulerState::Idle;
        info!("scheduler stopped");
    }

    async fn cycle(&mut self) -> Result<CycleReport> {
        self.transition(SchedulerState::Fetching);
        if self.registry.is_dirty() {
            self.persist();
        }
        let members = self.source.fetch_members().await;

        self.transition(SchedulerState::Reconciling);
        if members.is_empty() {
            debug!("no members this cycle, only ageing out stale peers");
        }
        // an empty list adds nothing, but eviction is timestamp based and still runs
        let outcome = self.registry.reconcile(&members, &self.local_hostname);
        if let Some(local) = &outcome.local {
            self.announce(local).await;
        }
        let persisted = if self.registry.is_dirty() {
            self.persist()
        } else {
            true
        };

        self.transition(SchedulerState::Syncing);
        let sweep = self.sweep().await?;

        let ReconcileOutcome { added, evicted, .. } = outcome;
        Ok(CycleReport {
            members_fetched: members.len(),
            added,
            evicted,
            persisted,
            sweep,
        })
    }

    /// Fingerprint, sync every node, fingerprint again.
    async fn sweep(&self) -> Result<SweepReport> {
        let nodes: Vec<PeerNode> = self.registry.nodes().cloned().collect();
        if nodes.is_empty() {
            debug!("no peers registered, nothing to sync");
            return Ok(SweepReport::default());
        }

        info!(nodes = nodes.len(), "starting multi-node synchronization");
        let source = self.executor.source();

        let before = drift::fingerprint(source).await?;
        let results = self.executor.sync_all(&nodes).await;
        let after = drift::fingerprint(source).await?;
        let drift = drift::compare(&before, &after);

        let report = SweepReport {
            before: Some(before),
            after: Some(after),
            results,
            drift,
        };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            drift = report.drift.is_some(),
            "sweep finished"
        );
        Ok(report)
    }

    async fn announce(&self, local: &Member) {
        let Some(address) = local.address else {
            debug!(hostname = %local.hostname, "local host has no overlay address yet");
            return;
        };
        let announcement = LocalAnnouncement {
            address,
            hostname: local.hostname.clone(),
            principal: self.config.principal(),
            remote_path: self.config.remote_path(),
        };
        self.coordinator.announce(&announcement).await;
    }

    /// Save the registry, keeping in-memory state on failure.
    fn persist(&mut self) -> bool {
        match self.registry.save() {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "registry write failed, will retry");
                false
            }
        }
    }

    fn transition(&mut self, next: SchedulerState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "scheduler state");
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::path::Path;
    use std::sync::Mutex;
    use synk_core::SyncOutcome;

    struct StaticSource(Vec<Member>);

    #[async_trait]
    impl MembershipSource for StaticSource {
        async fn fetch_members(&self) -> Vec<Member> {
            self.0.clone()
        }
    }

    #[derive(Default, Clone)]
    struct Recorder(Arc<Mutex<Vec<LocalAnnouncement>>>);

    #[async_trait]
    impl CoordinatorSink for Recorder {
        async fn announce(&self, announcement: &LocalAnnouncement) {
            self.0.lock().unwrap().push(announcement.clone());
        }
    }

    fn recent(hostname: &str, address: &str) -> Member {
        Member::new(hostname)
            .with_last_seen(Utc::now() - Duration::seconds(5))
            .with_address(address.parse().unwrap())
    }

    fn config(shared: &Path) -> Arc<DaemonConfig> {
        Arc::new(DaemonConfig {
            network_id: "net1".into(),
            api_token: "tok".into(),
            shared_directory: shared.to_path_buf(),
            local_hostname: Some("node-a".into()),
            coordinator: crate::config::CoordinatorConfig {
                principal: Some("rpi".into()),
                ..Default::default()
            },
            ..DaemonConfig::default()
        })
    }

    fn shell(script: &str, shared: &Path) -> SyncExecutor {
        SyncExecutor::new("sh", shared).args(vec!["-c".into(), script.into(), "mirror".into()])
    }

    fn scheduler(
        workspace: &tempfile::TempDir,
        members: Vec<Member>,
        script: &str,
    ) -> (Scheduler<StaticSource, Recorder>, Recorder) {
        let shared = workspace.path().join("shared");
        std::fs::create_dir_all(&shared).unwrap();
        std::fs::write(shared.join("a.txt"), "x").unwrap();

        let config = config(&shared);
        let registry = Registry::new(
            workspace.path().join("multi_node_sync.json"),
            shared.display().to_string(),
            config.staleness_threshold(),
        );
        let recorder = Recorder::default();
        let scheduler = Scheduler::new(config, StaticSource(members), recorder.clone(), registry)
            .unwrap()
            .with_executor(shell(script, &shared));
        (scheduler, recorder)
    }

    #[tokio::test]
    async fn test_step_adds_syncs_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sched, _) = scheduler(&dir, vec![recent("node-b", "10.0.0.2")], "exit 0");

        let report = sched.step().await.unwrap();
        assert_eq!(sched.state(), SchedulerState::Idle);
        assert_eq!(report.members_fetched, 1);
        assert_eq!(report.added, vec!["node-b"]);
        assert!(report.persisted);
        assert_eq!(report.sweep.succeeded(), 1);
        assert!(report.sweep.drift.is_none());

        let saved = std::fs::read_to_string(sched.registry().path()).unwrap();
        assert!(saved.contains("node-b"));
    }

    #[tokio::test]
    async fn test_local_host_is_announced_not_registered() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sched, recorder) = scheduler(
            &dir,
            vec![recent("node-a", "10.0.0.1"), recent("node-b", "10.0.0.2")],
            "exit 0",
        );

        let report = sched.step().await.unwrap();
        assert!(!sched.registry().contains("node-a"));
        assert_eq!(report.sweep.results.len(), 1);

        let announced = recorder.0.lock().unwrap();
        assert_eq!(announced.len(), 1);
        assert_eq!(announced[0].hostname, "node-a");
        assert_eq!(announced[0].principal, "rpi");
        assert_eq!(announced[0].address, "10.0.0.1".parse::<std::net::IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_failure_on_one_node_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sched, _) = scheduler(
            &dir,
            vec![recent("node-b", "10.0.0.2"), recent("node-c", "10.0.0.3")],
            "case \"$2\" in 10.0.0.2:*) echo denied >&2; exit 1;; esac",
        );

        let report = sched.step().await.unwrap();
        let outcomes: Vec<_> = report
            .sweep
            .results
            .iter()
            .map(|r| (r.hostname.as_str(), r.outcome))
            .collect();
        assert_eq!(
            outcomes,
            vec![("node-b", SyncOutcome::Failure), ("node-c", SyncOutcome::Success)]
        );
    }

    #[tokio::test]
    async fn test_mutation_during_sweep_raises_one_drift_warning() {
        let dir = tempfile::tempdir().unwrap();
        // $1 is the shared directory with its trailing slash
        let (mut sched, _) = scheduler(
            &dir,
            vec![recent("node-b", "10.0.0.2")],
            "echo appended >> \"$1a.txt\"",
        );

        let report = sched.step().await.unwrap();
        let drift = report.sweep.drift.expect("drift warning");
        assert_eq!(Some(&drift.before), report.sweep.before.as_ref());
        assert_eq!(Some(&drift.after), report.sweep.after.as_ref());
        assert_ne!(drift.before, drift.after);
    }

    #[tokio::test]
    async fn test_no_mutation_no_drift() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sched, _) = scheduler(&dir, vec![recent("node-b", "10.0.0.2")], "exit 0");

        let report = sched.step().await.unwrap();
        assert!(report.sweep.drift.is_none());
        assert_eq!(report.sweep.before, report.sweep.after);
    }

    #[tokio::test]
    async fn test_empty_fetch_keeps_fresh_peers() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sched, _) = scheduler(&dir, vec![recent("node-b", "10.0.0.2")], "exit 0");
        sched.step().await.unwrap();

        sched.source = StaticSource(Vec::new());
        let report = sched.step().await.unwrap();
        assert_eq!(report.members_fetched, 0);
        assert!(report.evicted.is_empty());
        assert!(sched.registry().contains("node-b"));
        assert_eq!(report.sweep.results.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_peer_is_evicted_and_not_synced() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sched, _) = scheduler(&dir, Vec::new(), "exit 0");

        // registered 11 minutes ago and still listed with that timestamp
        let seen = Utc::now() - Duration::minutes(11);
        let stale = Member::new("node-b")
            .with_last_seen(seen)
            .with_address("10.0.0.2".parse().unwrap());
        sched.registry.reconcile_at(std::slice::from_ref(&stale), "node-a", seen);
        assert!(sched.registry().contains("node-b"));

        sched.source = StaticSource(vec![stale]);
        let report = sched.step().await.unwrap();
        assert_eq!(report.evicted, vec!["node-b"]);
        assert!(!sched.registry().contains("node-b"));
        assert!(report.sweep.results.is_empty());
    }

    #[tokio::test]
    async fn test_empty_fetch_still_ages_out_stale_peers() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sched, _) = scheduler(&dir, Vec::new(), "exit 0");

        // last seen 11 minutes ago, and the controller has gone quiet since
        let seen = Utc::now() - Duration::minutes(11);
        let stale = Member::new("node-b")
            .with_last_seen(seen)
            .with_address("10.0.0.2".parse().unwrap());
        sched.registry.reconcile_at(std::slice::from_ref(&stale), "node-a", seen);
        assert!(sched.registry().contains("node-b"));

        let report = sched.step().await.unwrap();
        assert_eq!(report.members_fetched, 0);
        assert_eq!(report.evicted, vec!["node-b"]);
        assert!(!sched.registry().contains("node-b"));
        assert!(report.sweep.results.is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_is_retried_next_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sched, _) = scheduler(&dir, vec![recent("node-b", "10.0.0.2")], "exit 0");

        // a regular file where the registry's parent directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let registry_path = blocker.join("multi_node_sync.json");
        sched.registry = Registry::new(
            &registry_path,
            dir.path().join("shared").display().to_string(),
            Duration::minutes(10),
        );

        let report = sched.step().await.unwrap();
        assert!(!report.persisted);
        assert!(sched.registry().is_dirty());
        assert!(sched.registry().contains("node-b"));
        assert_eq!(report.sweep.succeeded(), 1);

        std::fs::remove_file(&blocker).unwrap();
        sched.source = StaticSource(Vec::new());
        let report = sched.step().await.unwrap();
        assert!(report.persisted);
        assert!(!sched.registry().is_dirty());

        let saved = std::fs::read_to_string(&registry_path).unwrap();
        assert!(saved.contains("node-b"), "{saved}");
    }

    #[tokio::test]
    async fn test_missing_shared_directory_fails_cycle_and_returns_to_idle() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sched, _) = scheduler(&dir, vec![recent("node-b", "10.0.0.2")], "exit 0");
        std::fs::remove_dir_all(dir.path().join("shared")).unwrap();

        let err = sched.step().await.unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(sched.state(), SchedulerState::Idle);
        // the registry change was still persisted
        assert!(sched.registry().contains("node-b"));
        assert!(!sched.registry().is_dirty());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sched, _) = scheduler(&dir, vec![recent("node-b", "10.0.0.2")], "exit 0");

        let finished = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            sched.run(tokio::time::sleep(std::time::Duration::from_millis(300))),
        )
        .await;
        assert!(finished.is_ok());
        assert_eq!(sched.state(), SchedulerState::Idle);
        assert!(sched.registry().contains("node-b"));
    }
}
