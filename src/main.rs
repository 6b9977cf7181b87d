//! Pricewatch binary: load config, connect the Telegram channel, and run
//! update ingestion until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pricewatch_bot::{Dispatcher, UpdateHandler};
use pricewatch_channels::TelegramChannel;
use pricewatch_core::WatchConfig;
use pricewatch_tracker::TrackerRegistry;

#[derive(Parser)]
#[command(name = "pricewatch", version, about = "Telegram value tracker bot")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "~/.pricewatch/config.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("pricewatch={default_level}"))),
        )
        .init();

    let config_path = PathBuf::from(shellexpand::tilde(&cli.config).into_owned());
    let config = WatchConfig::load_from(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    config.validate().context("invalid configuration")?;
    let config = Arc::new(config);
    tracing::info!(
        api_trackers = config.api_trackers.len(),
        scraper_trackers = config.scraper_trackers.len(),
        environment = %config.environment,
        "configuration loaded"
    );

    let channel = Arc::new(TelegramChannel::new(config.bot_token.clone()));
    let me = channel.get_me().await.context("telegram getMe failed")?;
    tracing::info!(
        bot = me.username.as_deref().unwrap_or(&me.first_name),
        "connected to telegram"
    );

    let registry = Arc::new(TrackerRegistry::new());
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&config),
        Arc::clone(&registry),
        Arc::clone(&channel) as _,
    ));
    let handler = Arc::new(UpdateHandler::new(Arc::clone(&channel), dispatcher));

    let ingest = async {
        if config.environment.trim().to_lowercase() == "local" {
            // Long polling and webhooks are mutually exclusive on the Bot API.
            channel
                .delete_webhook()
                .await
                .context("failed to delete webhook before long polling")?;
            handler.run_long_polling().await;
            Ok(())
        } else {
            let url = format!("{}/webhook", config.webhook_url.trim_end_matches('/'));
            channel
                .set_webhook(&url)
                .await
                .context("failed to register webhook")?;
            pricewatch_bot::webhook::serve(Arc::clone(&handler), config.port)
                .await
                .context("webhook server failed")
        }
    };

    tokio::select! {
        result = ingest => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
        }
    }

    registry.stop_all().await;
    tracing::info!("all trackers stopped, bye");
    Ok(())
}
