//! synk: keep a shared directory mirrored across the live peers of an
//! overlay network.
//!
//! # Architecture
//!
//! Each cycle of the [`Scheduler`] walks the same pipeline:
//!
//! ```text
//! MembershipSource::fetch_members()      overlay controller API
//!   -> Registry::reconcile()             add / advance / evict stale
//!   -> CoordinatorSink::announce()       only for the local host
//!   -> Registry::save()                  temp file + rename
//!   -> drift::fingerprint()              before
//!   -> SyncExecutor::sync_all()          one mirror run per peer
//!   -> drift::fingerprint()              after, warn on mismatch
//! ```
//!
//! Configuration is a single [`DaemonConfig`] value built at startup and
//! passed by reference; there is no global state. Only configuration errors
//! are fatal. Everything else is logged and the loop carries on.

pub mod config;
pub mod coordinator;
pub mod drift;
pub mod executor;
pub mod membership;
pub mod registry;
pub mod scheduler;

// Re-exports for convenience.
pub use config::DaemonConfig;
pub use coordinator::{CoordinatorSink, DisabledCoordinator, HttpCoordinatorSink};
pub use executor::SyncExecutor;
pub use membership::{CentralMembershipSource, MembershipSource};
pub use registry::{ReconcileOutcome, Registry};
pub use scheduler::{CycleReport, Scheduler, SchedulerState, SweepReport};
pub use synk_core::*;
