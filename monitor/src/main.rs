use axum::{routing::get, Router};
use monitor::config::Config;
use monitor::logger::{Logger, MonitorHandle};
use monitor::probe::SimulatedProbe;
use monitor::sensor::SensorReader;
use monitor::session::ReadingSession;
use monitor::store::SqliteStore;
use monitor::{metrics, rest};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting temperature monitor");
    info!("HTTP server: {}", config.http_addr);
    info!("Database: {}", config.database_url);
    info!(
        "Logging every {}ms, {} measurements max",
        config.logging_interval_ms, config.max_logging_count
    );

    // Initialize metrics
    metrics::init_metrics();

    // Open the measurement store
    let store = match SqliteStore::open(&config.database_url).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open measurement store: {}", e);
            std::process::exit(1);
        }
    };

    // Command mailbox and event broadcast for the monitor actor
    let (commands_tx, commands_rx) = mpsc::channel(config.command_capacity);
    let (events_tx, _) = broadcast::channel(64);

    let reader = SensorReader::new(SimulatedProbe::new(config.probe_dropout), config.sensor());
    let session = ReadingSession::new(config.thresholds());
    let monitor = Logger::new(
        reader,
        session,
        store.clone(),
        events_tx.clone(),
        config.logging(),
    );

    let monitor_handle = tokio::spawn(monitor.run(commands_rx));

    // Build HTTP app with REST API, websocket, and metrics endpoint
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(
            MonitorHandle::new(commands_tx),
            store.clone(),
            events_tx,
        ));

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", config.http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", config.http_addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap_or_else(|e| {
            error!("HTTP server error: {}", e);
        });
    });

    tokio::select! {
        _ = monitor_handle => {
            error!("Monitor task terminated");
        }
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    store.close().await;
    info!("Shutting down");
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
