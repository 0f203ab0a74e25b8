//! `synk fingerprint` - hash a directory the way drift detection does.

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use super::Context;
use crate::cli::args::FingerprintArgs;
use crate::output::{print_json, OutputFormat};

pub async fn execute(ctx: Context, args: FingerprintArgs) -> Result<()> {
    let dir = match args.dir {
        Some(dir) => dir,
        None => {
            let config = ctx.load_config()?;
            if config.shared_directory.as_os_str().is_empty() {
                anyhow::bail!("no directory given and no shared_directory configured");
            }
            config.shared_directory
        }
    };

    let fingerprint = synk::drift::fingerprint(&dir).await?;

    match ctx.output_format {
        OutputFormat::Json => print_json(&json!({
            "directory": dir,
            "fingerprint": fingerprint,
        }))?,
        OutputFormat::Pretty => {
            println!("{}  {}", fingerprint.as_str(), dir.display().to_string().dimmed());
        }
    }

    Ok(())
}
