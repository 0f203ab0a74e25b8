//! `synk members` - what the overlay controller currently reports.

use anyhow::Result;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::output::{format_time, print_json, OutputFormat};

#[derive(Tabled)]
struct MemberRow {
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Last seen")]
    last_seen: String,
}

pub async fn execute(ctx: Context) -> Result<()> {
    let config = ctx.load_config()?;
    let source = ctx.membership_source(&config)?;

    // unlike the daemon, a failed fetch is an error here
    let members = source.try_fetch().await?;

    match ctx.output_format {
        OutputFormat::Json => print_json(&members)?,
        OutputFormat::Pretty => {
            if members.is_empty() {
                println!("{}", "No members reported.".dimmed());
                return Ok(());
            }
            let rows: Vec<MemberRow> = members
                .iter()
                .map(|m| MemberRow {
                    hostname: m.hostname.clone(),
                    address: m
                        .address
                        .map_or_else(|| "-".to_string(), |a| a.to_string()),
                    last_seen: format_time(m.last_seen),
                })
                .collect();
            println!("{}", Table::new(&rows).with(Style::rounded()));
            println!("{} member(s) in network {}", members.len(), config.network_id.cyan());
        }
    }

    Ok(())
}
