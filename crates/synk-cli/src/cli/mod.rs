//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_level.as_deref())?;

    if cli.no_color {
        colored::control::set_override(false);
    }

    let output_format = if cli.json {
        OutputFormat::Json
    } else {
        cli.output.unwrap_or_default()
    };

    let ctx = commands::Context {
        config_path: cli.config,
        overrides: cli.overrides,
        output_format,
    };

    match cli.command {
        Commands::Run => commands::run::execute(ctx).await,
        Commands::Once => commands::once::execute(ctx).await,
        Commands::Members => commands::members::execute(ctx).await,
        Commands::Nodes => commands::nodes::execute(ctx).await,
        Commands::Fingerprint(args) => commands::fingerprint::execute(ctx, args).await,
        Commands::Config(args) => commands::config::execute(ctx, args).await,
    }
}

/// Install the fmt subscriber on stderr so stdout stays machine-readable.
///
/// `--log-level` wins over `RUST_LOG`; with neither set the filter is `info`.
fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}
