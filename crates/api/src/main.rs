//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use axum::Router;
use ledger::{InMemoryLedger, PostgresLedger};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
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
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve(app: Router, config: &Config) {
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Build state over the configured ledger and serve
    match &config.database_url {
        Some(url) => {
            let ledger = Arc::new(
                PostgresLedger::connect(url)
                    .await
                    .expect("failed to connect to database"),
            );
            ledger.run_migrations().await.expect("migrations failed");

            let state = api::create_default_state(ledger, config.commission());
            serve(api::create_app(state, metrics_handle), &config).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory ledger");
            let ledger = Arc::new(InMemoryLedger::new());
            let state = api::create_default_state(ledger, config.commission());
            serve(api::create_app(state, metrics_handle), &config).await;
        }
    }
}
