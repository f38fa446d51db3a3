//! TubeScribe API Gateway
//!
//! Entry point for the HTTP service.
//! Handles:
//! - Configuration and logging setup
//! - Summary store selection and teardown
//! - YouTube / Gemini client wiring
//! - Observability (logging, metrics)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tubescribe_common::{
    config::{AppConfig, ObservabilityConfig},
    connect_store, metrics,
    summarizer::GeminiSummarizer,
    youtube::YouTubeClient,
};
use tubescribe_gateway::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting TubeScribe API Gateway v{}",
        tubescribe_common::VERSION
    );

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .set_buckets(metrics::LATENCY_BUCKETS)?
            .install()?;
        info!("Prometheus metrics on {}", addr);
    }

    // Initialize summary store
    info!(backend = config.store.backend.as_str(), "Connecting to summary store...");
    let store = connect_store(&config.store).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to initialise summary store");
        e
    })?;

    let mut state = AppState::new(config.clone(), store.clone());

    match YouTubeClient::new(&config.youtube) {
        Ok(client) => state = state.with_video_source(Arc::new(client)),
        Err(e) => warn!(error = %e, "YouTube client disabled; article generation unavailable"),
    }
    match GeminiSummarizer::new(&config.gemini) {
        Ok(client) => state = state.with_summarizer(Arc::new(client)),
        Err(e) => warn!(error = %e, "Gemini client disabled; article generation unavailable"),
    }

    // Build the router
    let app = create_router(state);

    // Start the server
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Release the store connection before exiting
    if tokio::time::timeout(config.shutdown_timeout(), store.close())
        .await
        .is_err()
    {
        warn!("Timed out closing summary store");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// RUST_LOG wins over the configured level
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
