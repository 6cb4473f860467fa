//! sqlalert - PostgreSQL NOTIFY to DingTalk relay
//!
//! Subscribes to a notification channel and posts every payload it receives
//! to a DingTalk robot webhook as a text alert.

use anyhow::{Context, Result};
use sqlalert::{
    cli::Cli,
    config::Config,
    listener::PgSubscription,
    notification::DingTalkClient,
    relay::Relay,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_normalized();

    let config = Config::load(&cli).unwrap_or_else(|err| {
        // Logging is not configured yet, so report straight to stderr.
        eprintln!("Failed to load configuration: {}", err);
        std::process::exit(1);
    });

    // Initialize logging; RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("sqlalert starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Database: {}", config.database.redacted_dsn());
    info!("Channel: {}", config.database.channel);
    info!("Webhook URL: {}", config.webhook.redacted_url());
    match config.webhook_timeout() {
        Some(timeout) => info!("Webhook Timeout: {}s", timeout.as_secs()),
        None => info!("Webhook Timeout: none"),
    }
    info!("Idle Timeout: {}s", config.liveness.idle_timeout_seconds);
    info!("-------------------------------------------------------");

    if let Err(e) = run(&config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    info!("sqlalert stopped.");
}

async fn run(config: &Config) -> Result<()> {
    let sink = Arc::new(
        DingTalkClient::new(config.webhook.url.clone(), config.webhook_timeout())
            .context("Failed to build webhook client")?,
    );

    let subscription = PgSubscription::start(&config.database)
        .await
        .context("Failed to listen to channel")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received.");
                let _ = shutdown_tx.send(());
            }
            Err(e) => {
                error!("Failed to listen for shutdown signal: {}", e);
                // Keep the sender alive so the relay is not stopped.
                std::future::pending::<()>().await;
            }
        }
    });

    Relay::new(subscription, sink, config.idle_timeout())
        .run(shutdown_rx)
        .await
        .context("Listener error")?;

    Ok(())
}
