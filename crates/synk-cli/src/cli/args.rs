//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Mirror a shared directory to every live peer on an overlay network
///
/// Peers are discovered from the overlay controller's member list, kept in
/// a local registry, and synced with an external mirror tool (rsync by
/// default) on a fixed interval.
#[derive(Parser, Debug)]
#[command(name = "synk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: <config dir>/synk/config.toml)
    #[arg(short, long, env = "SYNK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "synk=trace" (overrides RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Shorthand for --output json
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings that take precedence over the config file and environment.
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Overlay network identifier
    #[arg(long, global = true)]
    pub network_id: Option<String>,

    /// Management API token
    #[arg(long, global = true)]
    pub api_token: Option<String>,

    /// Local directory to mirror
    #[arg(long, global = true)]
    pub shared_dir: Option<PathBuf>,

    /// Seconds between sweeps
    #[arg(long, global = true)]
    pub interval: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the sync loop until interrupted
    Run,

    /// Run a single cycle and print what it did
    Once,

    /// Fetch and print the overlay network's members
    Members,

    /// Print the persisted node registry
    Nodes,

    /// Print the content fingerprint of a directory
    Fingerprint(FingerprintArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

// ============================================================================
// Fingerprint command
// ============================================================================

#[derive(Args, Debug)]
pub struct FingerprintArgs {
    /// Directory to hash (default: the configured shared directory)
    pub dir: Option<PathBuf>,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration (token masked)
    Show,

    /// Show the config file path
    Path,
}
