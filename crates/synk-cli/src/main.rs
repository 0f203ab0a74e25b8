//! synk - mirror a shared directory to every live peer on an overlay network.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    synk_cli::run().await
}
