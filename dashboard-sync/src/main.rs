use anyhow::Result;
use clap::Parser;
use dashboard_sync::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may come from a local .env during development.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    tracing::info!(dry_run = cli.dry_run, "dashboard-sync starting");
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("dashboard-sync finished"),
        Err(e) => tracing::error!(error = %e, "dashboard-sync failed"),
    }
    result
}
