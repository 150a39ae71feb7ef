//! Battlezone game server (WebSocket only).

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

    info!("Battlezone Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Name: {}", config.server.name);
    info!("  Port: {}", config.server.port);
    info!("  Play area: +/-{}", config.world.half_extent);
    info!("  Tick: {}ms", config.server.tick_interval_ms);
    info!("  Enemies: {}", config.actors.count);

    // Start the game server
    server::run(config).await?;

    Ok(())
}
