//! murmur-sync
//!
//! Keeps the local user shadow store in sync with the identity authority
//! by consuming user lifecycle events from the broker, and serves a
//! health probe over HTTP.

mod config;
mod logging;
mod routes;

use config::Config;
use murmur_events::EventBus;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        "Starting murmur-sync"
    );

    let pool = match murmur_db::connect(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = murmur_db::run_migrations(&pool).await {
        eprintln!("Failed to run migrations: {e}");
        std::process::exit(1);
    }

    let bus = start_consumers(&config, &pool).await;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!(addr = %addr, "server running");

    if let Err(e) = axum::serve(listener, routes::router())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
    }

    if let Some(bus) = bus {
        if let Err(e) = bus.close().await {
            error!(error = %e, "event bus close failed");
        }
    }

    info!("Server shutdown complete");
}

/// Wire the broker, dispatcher and synchronization handler.
///
/// Returns the bus so shutdown can drain it, or `None` when event
/// consumption is disabled.
async fn start_consumers(config: &Config, pool: &PgPool) -> Option<Arc<dyn EventBus>> {
    #[cfg(feature = "kafka")]
    {
        use murmur_events::{KafkaEventBus, UserEventDispatcher};
        use murmur_shadow::ShadowSyncHandler;

        let Some(broker) = config.broker.clone() else {
            tracing::warn!("KAFKA_BOOTSTRAP_SERVERS not set, event consumption disabled");
            return None;
        };

        let bus: Arc<dyn EventBus> = match KafkaEventBus::new(broker) {
            Ok(bus) => Arc::new(bus),
            Err(e) => {
                eprintln!("Failed to create event bus: {e}");
                std::process::exit(1);
            }
        };

        let dispatcher = UserEventDispatcher::new(bus.clone());
        let handler = Arc::new(ShadowSyncHandler::new(pool.clone()));
        if let Err(e) = dispatcher.setup_subscriptions(handler).await {
            eprintln!("Failed to register event subscriptions: {e}");
            std::process::exit(1);
        }

        Some(bus)
    }

    #[cfg(not(feature = "kafka"))]
    {
        let _ = pool;
        if config.broker.is_some() {
            tracing::warn!("built without kafka support, event consumption disabled");
        }
        None
    }
}

/// Graceful shutdown on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
