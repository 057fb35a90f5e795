//! Commentarium API Gateway
//!
//! Serves the public content API, the admin API and the LLM-backed
//! functions from one process. Handles:
//! - Admin key authentication
//! - Rate limiting of the paid function endpoints
//! - Request routing
//! - Observability (logging, metrics, request ids)

mod app;
mod extract;
mod handlers;
mod middleware;

use anyhow::Context;
use commentarium_common::{
    config::{AppConfig, ObservabilityConfig},
    db::{DbPool, Repository},
    embeddings::create_embedder,
    llm::create_generator,
    metrics,
    proxy::ResourceProxy,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting Commentarium gateway v{}",
        commentarium_common::VERSION
    );

    let config = Arc::new(config);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        install_metrics_exporter(config.observability.metrics_port)?;
    }
    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        db.migrate().await?;
    }

    let embedder = create_embedder(&config.embedding)?;
    let generator = create_generator(&config.llm)?;
    let proxy = Arc::new(ResourceProxy::new(&config.proxy)?);
    info!(
        embedding_model = embedder.model_name(),
        chat_model = generator.model_name(),
        "Model clients ready"
    );

    if config.auth.admin_key_hash.is_none() {
        tracing::warn!("auth.admin_key_hash is not set; admin routes will reject every request");
    }

    // Create app state
    let state = AppState::new(
        config.clone(),
        Arc::new(Repository::new(db)),
        embedder,
        generator,
        proxy,
    );

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.shutdown_timeout()))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    // RUST_LOG wins over the configured level when present
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets(metrics::LATENCY_BUCKETS)?
        .set_buckets_for_metric(
            Matcher::Suffix("generation_duration_seconds".to_string()),
            metrics::UPSTREAM_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("embedding_duration_seconds".to_string()),
            metrics::UPSTREAM_BUCKETS,
        )?
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!(port, "Prometheus exporter listening");
    Ok(())
}

/// Graceful shutdown signal handler; in-flight requests get `grace` to finish
async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        tracing::warn!(grace_secs = grace.as_secs(), "Graceful shutdown timed out, exiting");
        std::process::exit(1);
    });
}
