mod handlers;
mod menus;
mod poller;
mod views;

use std::sync::Arc;

use tracing::{error, info};

use parcel_core::{Config, Database, Logistics, Notifier, Settings, run_worker};
use parcel_telegram::BotClient;

use crate::handlers::Handlers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parcel=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if !config.has_bot_token() {
        error!("BOT_TOKEN is not set or still holds the placeholder value");
        error!("Put the token from @BotFather into .env as BOT_TOKEN=<token>");
        anyhow::bail!("missing bot token");
    }

    let db = Arc::new(Database::open(&config.database_path)?);
    let client = BotClient::new(&config.bot_token);

    let (notifier, rx) = Notifier::channel(config.notify_queue_capacity);
    let worker = tokio::spawn(run_worker(rx, client.clone()));

    let logistics = Logistics::new(db, notifier, Settings::from(&config));
    let handlers = Handlers::new(logistics, &config);

    match &config.webapp_url {
        Some(url) => info!("WebApp URL: {}", url),
        None => info!("WebApp URL not set, menus go without the app button"),
    }
    if config.log_group_id.is_none() {
        info!("LOG_GROUP_ID not set, operational log messages are not sent");
    }

    info!("Parcel bot polling for updates");
    poller::run(client, handlers, shutdown_signal()).await;

    // Dropping the last notifier closes the queue; the worker drains it.
    let _ = worker.await;
    info!("Parcel bot stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                let _ = ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
