//! `synk config` - inspect the effective configuration.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::output::OutputFormat;

pub async fn execute(ctx: Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(&ctx),
        ConfigCommands::Path => {
            show_path(&ctx);
            Ok(())
        }
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?.redacted();

    match ctx.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        OutputFormat::Pretty => {
            let unset = || "(not set)".dimmed().to_string();
            let or_unset = |s: &str| {
                if s.is_empty() {
                    unset()
                } else {
                    s.to_string()
                }
            };

            println!("{}", "Current Configuration:".bold());
            println!();
            println!("  {} {}", "network_id:".bold(), or_unset(&config.network_id));
            println!("  {} {}", "api_token:".bold(), or_unset(&config.api_token));
            println!("  {} {}", "api_url:".bold(), config.api_url);
            println!(
                "  {} {}",
                "shared_directory:".bold(),
                or_unset(&config.shared_directory.display().to_string())
            );
            println!("  {} {}", "remote_path:".bold(), config.remote_path());
            println!("  {} {}", "registry_path:".bold(), config.registry_path().display());
            println!("  {} {}", "local_hostname:".bold(), config.local_hostname());
            println!("  {} {}s", "sync_interval:".bold(), config.sync_interval_secs);
            println!(
                "  {} {}s",
                "staleness_threshold:".bold(),
                config.staleness_threshold_secs
            );
            println!(
                "  {} {}",
                "coordinator:".bold(),
                config.coordinator.url.clone().unwrap_or_else(unset)
            );
            println!(
                "  {} {} {}",
                "mirror:".bold(),
                config.mirror.command,
                config.mirror.args.join(" ")
            );

            if let Err(e) = config.validate() {
                println!();
                println!("{} {e}", "Invalid:".red().bold());
            }
        }
    }

    Ok(())
}

fn show_path(ctx: &Context) {
    let path = ctx.config_file();
    let exists = path.exists();

    match ctx.output_format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "path": path, "exists": exists })
        ),
        OutputFormat::Pretty => {
            if exists {
                println!("{}", path.display());
            } else {
                println!("{} {}", path.display(), "(not created)".dimmed());
            }
        }
    }
}
