mod config;
mod error;
mod gateway;
mod parser;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::gateway::telegram::TelegramTransport;
use crate::gateway::BotGateway;
use crate::server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,leakosint=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let login_only = args.iter().any(|a| a == "--login");
    let config_path = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Bot: @{}", config.bot_username());
    info!("  Session: {}", config.telegram.session_file.display());
    info!(
        "  Reply window: {}s (timeout {}s)",
        config.gateway.reply_window_secs, config.gateway.round_trip_timeout_secs
    );
    if config.server.include_raw_response {
        info!("  Raw bot replies are included in search responses");
    }

    let transport = TelegramTransport::connect(&config, login_only).await?;
    if login_only {
        info!("Telegram login complete");
        return Ok(());
    }

    let gateway = BotGateway::new(Arc::new(transport), &config.gateway);
    let state = AppState::new(&config, gateway)?;

    server::run(&config, state).await
}
