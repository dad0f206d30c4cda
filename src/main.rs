mod bot;
mod config;
mod platform;
mod registry;
mod relay;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, ADMINS_ENV};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relaybot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Optional TOML config file; the environment alone is enough.
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    if let Some(path) = &config_path {
        info!("Loading configuration from: {}", path.display());
    }
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    if config.recipients.is_empty() {
        warn!(
            "{} is not set. Start the bot and send /myid to find your chat ID.",
            ADMINS_ENV
        );
    } else {
        info!("Admin chats: {}", config.recipients.len());
    }

    info!("Bot is starting...");
    platform::telegram::run(config).await?;

    Ok(())
}
