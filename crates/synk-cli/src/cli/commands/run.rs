//! `synk run` - the sync daemon loop.

use anyhow::Result;
use tracing::{info, warn};

use super::Context;

pub async fn execute(ctx: Context) -> Result<()> {
    let mut scheduler = ctx.scheduler()?;
    info!(
        hostname = %scheduler.local_hostname(),
        registry = %scheduler.registry().path().display(),
        nodes = scheduler.registry().len(),
        "starting synk"
    );

    scheduler.run(shutdown_signal()).await;

    info!("synk stopped");
    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed the loop runs
/// until the process is killed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupt received, shutting down"),
        Err(e) => {
            warn!(error = %e, "could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    }
}
