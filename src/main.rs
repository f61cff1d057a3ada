//! Carousel - Entry Point
//!
//! Wires the proxy pool, health monitor, and API server together with
//! graceful shutdown support.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod database;
mod error;
mod models;
mod pool;
mod repository;

use api::ApiServer;
use config::{Config, LogConfig};
use database::Database;
use pool::{HealthMonitor, HealthProber, MonitorConfig, MonitorHandle, ProberConfig, ProxyPool};
use repository::{ProxyRepository, ProxyStore};

#[tokio::main]
async fn main() -> error::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log);

    info!("Starting Carousel proxy pool manager");

    // Connect to database
    let db = Database::new(&config).await?;
    info!("Connected to database");

    // Load the pool: configs, then health, then usage
    let store: Arc<dyn ProxyStore> = Arc::new(ProxyRepository::new(db.pool().clone()));
    let pool = Arc::new(ProxyPool::initialize(store).await?);

    // Build the health monitor
    let prober = HealthProber::new(&ProberConfig {
        check_url: config.healthcheck.check_url.clone(),
        timeout: Duration::from_secs(config.healthcheck.timeout_secs.max(1)),
    });
    let monitor = HealthMonitor::new(
        pool.state(),
        prober,
        MonitorConfig {
            probe_interval: Duration::from_secs(config.healthcheck.interval_secs.max(1)),
            workers: config.healthcheck.workers,
        },
    );

    // One synchronous probe pass before serving any selection
    info!("Running initial probe cycle");
    monitor.run_cycle().await;

    // Start the periodic monitor
    let (monitor_handle, monitor_shutdown) = MonitorHandle::new();
    let monitor_task = tokio::spawn(async move {
        monitor.run(monitor_shutdown).await;
    });

    // Start the API server
    let (shutdown_tx, _) = watch::channel(false);
    let api_shutdown = shutdown_tx.subscribe();
    let api_server = ApiServer::new(config.api.clone(), pool.clone());
    let api_task = tokio::spawn(async move {
        if let Err(e) = api_server.run(api_shutdown).await {
            error!("API server error: {}", e);
        }
    });

    info!(
        "Carousel started - API: {}:{}",
        config.api.host, config.api.port
    );

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received");

    // Stop all services
    let _ = shutdown_tx.send(true);
    monitor_handle.shutdown();

    let _ = tokio::join!(monitor_task, api_task);
    db.close().await;

    info!("Carousel stopped");
    Ok(())
}

/// Initialize the tracing subscriber from the log configuration
fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("carousel={},tower_http=info", log.level).into());

    if log.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
