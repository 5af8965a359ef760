//! TrendCast entry point
//!
//! Polls prices, evaluates trends and serves them over HTTP/WebSocket until ctrl-c.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trendcast::config::{AppConfig, LogConfig};
use trendcast::dashboard;
use trendcast::feed::BinanceTickerSource;
use trendcast::service::TrendService;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.log);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "🚀 Starting TrendCast");
    tracing::info!(config = %config, "Configuration loaded");

    let source = BinanceTickerSource::new(
        config.feed.base_url.clone(),
        config.feed.quote_asset.clone(),
        config.request_timeout(),
    )?;
    let service = Arc::new(TrendService::new(&config, Arc::new(source)));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let price_loop = tokio::spawn(
        Arc::clone(&service).run_price_loop(config.poll_interval(), shutdown_rx.clone()),
    );
    let trend_loop = tokio::spawn(
        Arc::clone(&service).run_trend_loop(config.predictor_interval(), shutdown_rx),
    );

    let addr = config.bind_address();
    let served = dashboard::start_server(service.api_state(), &addr, shutdown_signal())
        .await
        .with_context(|| format!("Dashboard server failed on {addr}"));

    if let Err(e) = &served {
        tracing::error!(error = %e, "Dashboard server error");
    }

    // Server is down either way; stop the loops
    let _ = shutdown_tx.send(true);
    price_loop.await.context("Price loop panicked")?;
    trend_loop.await.context("Trend loop panicked")?;

    tracing::info!("👋 TrendCast stopped");
    served
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for ctrl-c, shutting down"),
    }
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("trendcast={},warn", log.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if log.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
