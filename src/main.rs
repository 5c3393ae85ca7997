mod config;
mod error;
mod firebase;
mod line;
mod relay;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::firebase::FirebaseClient;
use crate::line::LineClient;
use crate::relay::Relay;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,homeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; the file is optional, the environment fills the rest
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Target group: {}", config.line.group_id);
    info!("  LINE API: {}", config.line.api_base_url);
    info!(
        "  Firebase: {}/{}",
        config.firebase.base_url, config.firebase.path
    );
    if let Some(beacon) = &config.beacon {
        info!("  Beacon: {}", beacon.hwid);
    }

    let messenger = Arc::new(LineClient::new(config.line.clone()));
    let sink = Arc::new(FirebaseClient::new(config.firebase.clone()));
    let bind_addr = config.server.bind_addr.clone();
    let relay = Arc::new(Relay::new(Arc::new(config), messenger, sink));

    info!("Relay is starting...");
    server::serve(relay, &bind_addr).await?;

    Ok(())
}
