//! Snapback game server binary.

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Snapback Server v{}", env!("CARGO_PKG_VERSION"));

    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Mode: {:?}", config.server.mode);
    info!(
        "  Tick: {} Hz, snapshots: {} Hz",
        config.server.tick_rate, config.server.snapshot_rate
    );

    server::run(config).await?;

    Ok(())
}
