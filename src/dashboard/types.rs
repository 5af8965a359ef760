//! Dashboard API Types
//!
//! DTOs for HTTP/WebSocket communication with dashboard clients.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::engine::{IndicatorSnapshot, MemorySnapshot};
use crate::feed::SeriesStatus;
use crate::types::{Prediction, Trend};

// ─────────────────────────────────────────────────────────────────
// WebSocket Messages
// ─────────────────────────────────────────────────────────────────

/// Trend update pushed to clients after each evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendMessage {
    pub coin: String,
    pub trend: Trend,
    pub explanation: String,
    /// Always within [0, 1]
    pub confidence: f64,
    /// RFC 3339
    pub timestamp: String,
}

impl TrendMessage {
    pub fn from_prediction(
        coin: impl Into<String>,
        prediction: &Prediction,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let confidence = if prediction.confidence.is_finite() {
            prediction.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            coin: coin.into(),
            trend: prediction.trend,
            explanation: prediction.explanation.clone(),
            confidence,
            timestamp: at.to_rfc3339(),
        }
    }
}

/// Messages fanned out over `/ws`.
///
/// Untagged so existing clients receive the bare objects: a price tick is a flat
/// `{"BTC": 64000.1, "ETH": null}` map, a trend update is a `TrendMessage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WsMessage {
    Trend(TrendMessage),
    Prices(BTreeMap<String, Option<f64>>),
}

// ─────────────────────────────────────────────────────────────────
// Response Types
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentHealth {
    pub samples: usize,
    pub last_price: Option<f64>,
    pub last_tick_ts: Option<i64>,
    pub tick_age_ms: Option<i64>,
    pub stale: bool,
    /// Enough samples for the trend loop to evaluate it
    pub ready: bool,
}

impl InstrumentHealth {
    pub fn from_status(
        status: &SeriesStatus,
        now_ms: i64,
        stale_threshold_ms: i64,
        min_history: usize,
    ) -> Self {
        let tick_age_ms = status.last_tick_ms.map(|ts| (now_ms - ts).max(0));
        Self {
            samples: status.samples,
            last_price: status.last_price,
            last_tick_ts: status.last_tick_ms,
            tick_age_ms,
            stale: tick_age_ms.map_or(true, |age| age > stale_threshold_ms),
            ready: status.samples >= min_history,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" when every instrument has a fresh tick, "degraded" otherwise
    pub status: String,
    pub uptime_secs: u64,
    pub subscribers: usize,
    pub stale_threshold_ms: i64,
    pub instruments: BTreeMap<String, InstrumentHealth>,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub instrument: String,
    pub capacity: usize,
    pub prices: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorsResponse {
    pub instrument: String,
    pub indicators: IndicatorSnapshot,
    /// Smoothing memories, absent until the instrument was first evaluated
    pub memory: Option<MemorySnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
