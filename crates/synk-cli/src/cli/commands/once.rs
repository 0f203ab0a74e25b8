//! `synk once` - run one cycle and report.

use anyhow::Result;
use colored::Colorize;
use synk::{CycleReport, SyncOutcome};
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::output::{print_json, OutputFormat};

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Node")]
    hostname: String,
    #[tabled(rename = "Result")]
    outcome: String,
    #[tabled(rename = "Error")]
    error: String,
}

pub async fn execute(ctx: Context) -> Result<()> {
    let mut scheduler = ctx.scheduler()?;
    let report = scheduler.step().await?;

    match ctx.output_format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Pretty => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &CycleReport) {
    println!("{}", "Cycle complete".bold());
    println!();
    println!("  {} {}", "Members fetched:".bold(), report.members_fetched);
    println!("  {} {}", "Added:".bold(), list_or_none(&report.added));
    println!("  {} {}", "Evicted:".bold(), list_or_none(&report.evicted));
    println!(
        "  {} {}",
        "Registry saved:".bold(),
        if report.persisted {
            "yes".green()
        } else {
            "no (will retry)".yellow()
        }
    );

    let sweep = &report.sweep;
    if sweep.results.is_empty() {
        println!();
        println!("{}", "No peers to sync.".dimmed());
        return;
    }

    let rows: Vec<ResultRow> = sweep
        .results
        .iter()
        .map(|r| ResultRow {
            hostname: r.hostname.clone(),
            outcome: match r.outcome {
                SyncOutcome::Success => "ok".green().to_string(),
                SyncOutcome::Failure => "failed".red().to_string(),
            },
            error: r.error.clone().unwrap_or_default(),
        })
        .collect();

    println!();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    println!(
        "{} succeeded, {} failed",
        sweep.succeeded().to_string().green(),
        sweep.failed().to_string().red()
    );

    if let Some(drift) = &sweep.drift {
        println!();
        println!("{} {drift}", "Warning:".yellow().bold());
    }
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".dimmed().to_string()
    } else {
        names.join(", ")
    }
}
