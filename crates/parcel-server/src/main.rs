use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use parcel_api::{AppStateInner, router};
use parcel_core::{Config, Database, Logistics, Notifier, Settings, run_worker};
use parcel_telegram::BotClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parcel=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    let db = Arc::new(Database::open(&config.database_path)?);

    let (notifier, worker) = if config.has_bot_token() {
        let (notifier, rx) = Notifier::channel(config.notify_queue_capacity);
        let worker = tokio::spawn(run_worker(rx, BotClient::new(&config.bot_token)));
        (notifier, Some(worker))
    } else {
        warn!("BOT_TOKEN is not set: WebApp logins are refused and notifications are off");
        (Notifier::disabled(), None)
    };
    if config.test_api_token.is_none() {
        info!("TEST_API_TOKEN not set, maintenance routes need an admin session");
    }

    let logistics = Logistics::new(db, notifier, Settings::from(&config));
    let state = Arc::new(AppStateInner::new(logistics, &config));

    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.listen_addr().parse()?;
    info!("Parcel dashboard API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(worker) = worker {
        let _ = worker.await;
    }
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
