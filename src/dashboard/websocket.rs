//! WebSocket Broadcaster
//!
//! Broadcasts price ticks and trend updates to all connected WebSocket clients.

use super::types::{TrendMessage, WsMessage};
use std::collections::BTreeMap;
use tokio::sync::broadcast;

/// Channel for broadcasting updates to WebSocket clients.
///
/// Each client owns a receiver; a client that disconnects simply drops it, and
/// a slow client lags without blocking the others.
#[derive(Debug, Clone)]
pub struct WebSocketBroadcaster {
    tx: broadcast::Sender<String>,
}

impl WebSocketBroadcaster {
    /// Create a new broadcaster with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to receive broadcast messages
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Currently connected subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Broadcast a message to all connected clients, returning how many received it
    pub fn broadcast(&self, msg: &WsMessage) -> usize {
        match serde_json::to_string(msg) {
            // No receivers is fine
            Ok(json) => self.tx.send(json).unwrap_or(0),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize WebSocket message");
                0
            }
        }
    }

    /// Broadcast the latest price tick
    pub fn broadcast_prices(&self, prices: BTreeMap<String, Option<f64>>) -> usize {
        self.broadcast(&WsMessage::Prices(prices))
    }

    /// Broadcast a trend update
    pub fn broadcast_trend(&self, trend: TrendMessage) -> usize {
        self.broadcast(&WsMessage::Trend(trend))
    }
}

impl Default for WebSocketBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
