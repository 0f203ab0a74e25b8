//! `synk nodes` - the persisted registry and each node's status.

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::net::IpAddr;
use synk::PeerStatus;
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::output::{format_time, print_json, OutputFormat};

#[derive(Serialize)]
struct NodeView {
    hostname: String,
    address: Option<IpAddr>,
    remote_path: String,
    last_seen: Option<DateTime<Utc>>,
    status: PeerStatus,
}

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Remote path")]
    remote_path: String,
    #[tabled(rename = "Last seen")]
    last_seen: String,
    #[tabled(rename = "Status")]
    status: String,
}

pub async fn execute(ctx: Context) -> Result<()> {
    let config = ctx.load_config()?;
    let path = config.registry_path();

    if !path.exists() {
        match ctx.output_format {
            OutputFormat::Json => print_json(&Vec::<NodeView>::new())?,
            OutputFormat::Pretty => {
                println!("{} {}", "No registry at".dimmed(), path.display());
            }
        }
        return Ok(());
    }

    let registry = Context::registry(&config);
    let views: Vec<NodeView> = registry
        .statuses(Utc::now())
        .into_iter()
        .map(|(node, status)| NodeView {
            hostname: node.hostname.clone(),
            address: node.address,
            remote_path: node.remote_path.clone(),
            last_seen: node.last_seen,
            status,
        })
        .collect();

    match ctx.output_format {
        OutputFormat::Json => print_json(&views)?,
        OutputFormat::Pretty => {
            if views.is_empty() {
                println!("{}", "Registry is empty.".dimmed());
                return Ok(());
            }
            let rows: Vec<NodeRow> = views
                .iter()
                .map(|v| NodeRow {
                    hostname: v.hostname.clone(),
                    address: v.address.map_or_else(|| "-".to_string(), |a| a.to_string()),
                    remote_path: v.remote_path.clone(),
                    last_seen: format_time(v.last_seen),
                    status: match v.status {
                        PeerStatus::Fresh => "fresh".green().to_string(),
                        PeerStatus::Stale => "stale".yellow().to_string(),
                    },
                })
                .collect();
            println!("{}", Table::new(&rows).with(Style::rounded()));
            println!("{} node(s) in {}", views.len(), registry.path().display());
        }
    }

    Ok(())
}
