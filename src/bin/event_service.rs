use anyhow::Result;
use tracing::{info, Level};
use v2_pair_indexer::{services::EventService, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("🔧 启动独立事件索引服务...");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded successfully");

    // Create and start event service
    let event_service = EventService::new(config).await?;
    event_service.start().await?;

    Ok(())
}
