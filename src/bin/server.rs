//! reelkit-server: remote store for the sync client.

use clap::Parser;
use reelkit_sync::cli::ServerArgs;
use reelkit_sync::{create_router_with_config, RouterConfig};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let args = ServerArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RouterConfig {
        database: args.database.clone(),
    };
    match &config.database {
        Some(path) => tracing::info!("[server] Database: {:?}", path),
        None => tracing::info!("[server] Database: in-memory"),
    }

    let app = match create_router_with_config(&config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("[server] Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let addr = format!("{}:{}", args.host, args.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("[server] Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("[server] Listening on http://{}", addr);

    let shutdown = async {
        let _ = signal::ctrl_c().await;
        tracing::info!("[server] Received Ctrl+C, shutting down");
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::error!("[server] Server error: {}", e);
        std::process::exit(1);
    }
}
