//! Command implementations.

pub mod config;
pub mod fingerprint;
pub mod members;
pub mod nodes;
pub mod once;
pub mod run;

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use std::sync::Arc;
use synk::{CentralMembershipSource, DaemonConfig, Registry, Scheduler};

use crate::cli::args::Overrides;
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file, if one was given
    pub config_path: Option<PathBuf>,

    /// Command-line settings layered over file and environment
    pub overrides: Overrides,

    /// Output format
    pub output_format: OutputFormat,
}

/// Scheduler wired to the real controller and coordinator.
pub type DaemonScheduler = Scheduler<CentralMembershipSource, Box<dyn synk::CoordinatorSink>>;

impl Context {
    /// Config file in effect: `--config`, else the platform default.
    pub fn config_file(&self) -> PathBuf {
        self.config_path
            .clone()
            .or_else(DaemonConfig::default_path)
            .unwrap_or_else(|| PathBuf::from("synk.toml"))
    }

    /// File, then environment, then command line. Not validated.
    pub fn load_config(&self) -> Result<DaemonConfig> {
        let path = self.config_file();
        let mut config = DaemonConfig::load(&path)
            .with_context(|| format!("loading {}", path.display()))?;
        config.apply_env()?;

        let o = &self.overrides;
        if let Some(id) = &o.network_id {
            config.network_id.clone_from(id);
        }
        if let Some(token) = &o.api_token {
            config.api_token.clone_from(token);
        }
        if let Some(dir) = &o.shared_dir {
            config.shared_directory.clone_from(dir);
        }
        if let Some(secs) = o.interval {
            config.sync_interval_secs = secs;
        }
        Ok(config)
    }

    /// Configuration the daemon can start with.
    pub fn daemon_config(&self) -> Result<DaemonConfig> {
        let config = self.load_config()?;
        config.validate()?;
        Ok(config)
    }

    /// Membership adapter; only needs the network id and token.
    pub fn membership_source(&self, config: &DaemonConfig) -> Result<CentralMembershipSource> {
        if config.network_id.trim().is_empty() {
            anyhow::bail!(
                "network id required.\n\n\
                 Set it with one of:\n  \
                 1. --network-id <ID>\n  \
                 2. SYNK_NETWORK_ID environment variable\n  \
                 3. network_id in {}",
                self.config_file().display()
            );
        }
        Ok(CentralMembershipSource::from_config(config)?)
    }

    /// Open the registry at the configured location.
    pub fn registry(config: &DaemonConfig) -> Registry {
        Registry::load_or_init(
            config.registry_path(),
            config.shared_directory.display().to_string(),
            config.staleness_threshold(),
        )
    }

    /// Fully wired scheduler from validated configuration.
    pub fn scheduler(&self) -> Result<DaemonScheduler> {
        let config = Arc::new(self.daemon_config()?);
        let source = self.membership_source(&config)?;
        let coordinator = synk::coordinator::sink_from_config(&config)?;
        let registry = Self::registry(&config);
        Ok(Scheduler::new(config, source, coordinator, registry)?)
    }
}
