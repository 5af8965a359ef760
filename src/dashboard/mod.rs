//! Dashboard Module
//!
//! Provides HTTP/WebSocket API for real-time monitoring of TrendCast.

mod api;
mod types;
mod websocket;

pub use api::{create_router, ApiState};
pub use types::*;
pub use websocket::WebSocketBroadcaster;

use crate::feed::PriceHistoryStore;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Instant;
use tokio::sync::RwLock;

/// Ticks older than this many poll intervals mark an instrument stale
const STALE_AFTER_POLLS: i64 = 5;

/// In-memory state for the dashboard API
#[derive(Debug)]
pub struct DashboardMemory {
    /// Latest trend update per instrument
    pub predictions: RwLock<BTreeMap<String, TrendMessage>>,
    /// Tick age beyond which an instrument is reported stale
    pub stale_threshold_ms: i64,
    started_at: Instant,
}

impl Default for DashboardMemory {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl DashboardMemory {
    pub fn new(poll_interval_ms: u64) -> Self {
        let poll_interval_ms = i64::try_from(poll_interval_ms).unwrap_or(i64::MAX);
        Self {
            predictions: RwLock::new(BTreeMap::new()),
            stale_threshold_ms: poll_interval_ms.saturating_mul(STALE_AFTER_POLLS),
            started_at: Instant::now(),
        }
    }

    pub async fn record_prediction(&self, msg: TrendMessage) {
        self.predictions.write().await.insert(msg.coin.clone(), msg);
    }

    /// Latest predictions, ordered by instrument
    pub async fn get_predictions(&self) -> Vec<TrendMessage> {
        self.predictions.read().await.values().cloned().collect()
    }

    pub async fn get_health(
        &self,
        history: &PriceHistoryStore,
        subscribers: usize,
        min_history: usize,
    ) -> HealthResponse {
        let now = chrono::Utc::now().timestamp_millis();
        let instruments: BTreeMap<String, InstrumentHealth> = history
            .status()
            .await
            .iter()
            .map(|(id, status)| {
                (
                    id.clone(),
                    InstrumentHealth::from_status(
                        status,
                        now,
                        self.stale_threshold_ms,
                        min_history,
                    ),
                )
            })
            .collect();

        let status = if instruments.values().any(|h| h.stale) {
            "degraded"
        } else {
            "ok"
        };

        HealthResponse {
            status: status.to_string(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            subscribers,
            stale_threshold_ms: self.stale_threshold_ms,
            instruments,
            updated_at: now,
        }
    }
}

/// Start the dashboard server, draining connections once `shutdown` resolves
pub async fn start_server<F>(state: ApiState, addr: &str, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("🖥️ Dashboard API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("🖥️ Dashboard API stopped");
    Ok(())
}
