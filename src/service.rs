//! Service loops
//!
//! Wires the quote source, history store, trend engine and broadcaster together:
//! - price loop: poll every instrument, record, fan out the tick
//! - trend loop: evaluate every instrument with enough history, fan out the trend

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::config::AppConfig;
use crate::dashboard::{ApiState, DashboardMemory, TrendMessage, WebSocketBroadcaster};
use crate::engine::TrendEngine;
use crate::feed::{fetch_all, PriceHistoryStore, QuoteSource};

pub struct TrendService {
    source: Arc<dyn QuoteSource>,
    instruments: Vec<String>,
    history: Arc<PriceHistoryStore>,
    engine: Arc<TrendEngine>,
    memory: Arc<DashboardMemory>,
    broadcaster: WebSocketBroadcaster,
    min_history: usize,
}

impl TrendService {
    pub fn new(config: &AppConfig, source: Arc<dyn QuoteSource>) -> Self {
        let instruments = config.feed.instruments.clone();
        Self {
            source,
            history: Arc::new(PriceHistoryStore::new(
                &instruments,
                config.feed.history_capacity,
            )),
            instruments,
            engine: Arc::new(TrendEngine::new()),
            memory: Arc::new(DashboardMemory::new(config.feed.poll_interval_ms)),
            broadcaster: WebSocketBroadcaster::new(config.server.broadcast_capacity),
            min_history: config.predictor.min_history,
        }
    }

    /// Handles for the HTTP/WebSocket API
    pub fn api_state(&self) -> ApiState {
        ApiState {
            memory: Arc::clone(&self.memory),
            history: Arc::clone(&self.history),
            engine: Arc::clone(&self.engine),
            broadcaster: self.broadcaster.clone(),
            min_history: self.min_history,
        }
    }

    pub fn history(&self) -> &PriceHistoryStore {
        &self.history
    }

    pub fn broadcaster(&self) -> &WebSocketBroadcaster {
        &self.broadcaster
    }

    /// Fetch, record and broadcast one price tick
    pub async fn poll_prices_once(&self) -> BTreeMap<String, Option<f64>> {
        let prices = fetch_all(self.source.as_ref(), &self.instruments).await;
        let recorded = self.history.record_tick(&prices).await;
        let delivered = self.broadcaster.broadcast_prices(prices.clone());

        tracing::debug!(
            source = self.source.name(),
            recorded,
            missing = prices.len() - recorded,
            delivered,
            "Price tick"
        );
        prices
    }

    /// Evaluate every instrument with enough history; returns the updates published
    pub async fn publish_trends_once(&self) -> Vec<TrendMessage> {
        let mut published = Vec::new();

        for instrument in &self.instruments {
            let prices = self.history.snapshot(instrument).await;
            if prices.len() < self.min_history {
                tracing::trace!(
                    instrument = %instrument,
                    samples = prices.len(),
                    "Waiting for history"
                );
                continue;
            }

            let prediction = self.engine.predict_trend(&prices, instrument);
            let msg =
                TrendMessage::from_prediction(instrument.as_str(), &prediction, chrono::Utc::now());

            tracing::info!(
                instrument = %instrument,
                trend = %msg.trend,
                confidence = msg.confidence,
                "📈 Trend update"
            );

            self.memory.record_prediction(msg.clone()).await;
            self.broadcaster.broadcast_trend(msg.clone());
            published.push(msg);
        }

        published
    }

    /// Poll prices every `interval` until shutdown is signalled
    pub async fn run_price_loop(
        self: Arc<Self>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!(every_ms = interval.as_millis() as u64, "✅ Price loop started");
        run_every(interval, shutdown, move || {
            let service = Arc::clone(&self);
            async move {
                service.poll_prices_once().await;
            }
        })
        .await;
        tracing::info!("Price loop stopped");
    }

    /// Publish trends every `interval` until shutdown is signalled
    pub async fn run_trend_loop(
        self: Arc<Self>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!(every_secs = interval.as_secs(), "✅ Trend loop started");
        run_every(interval, shutdown, move || {
            let service = Arc::clone(&self);
            async move {
                service.publish_trends_once().await;
            }
        })
        .await;
        tracing::info!("Trend loop stopped");
    }
}

/// Drive `tick` on a fixed interval, returning once `shutdown` flips to true
/// or its sender is dropped
async fn run_every<F, Fut>(interval: Duration, mut shutdown: watch::Receiver<bool>, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => tick().await,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}
