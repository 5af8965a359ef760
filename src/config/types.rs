//! Configuration sections

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP/WebSocket server
    pub host: String,
    pub port: u16,
    /// Buffered messages per WebSocket subscriber before it starts lagging
    pub broadcast_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Instruments to poll (base asset tickers)
    pub instruments: Vec<String>,
    /// Quote asset appended to form the exchange symbol
    pub quote_asset: String,
    /// REST ticker endpoint
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    /// Samples kept per instrument
    pub history_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictorConfig {
    /// Seconds between trend evaluations
    pub interval_secs: u64,
    /// Samples an instrument needs before it is evaluated
    pub min_history: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
    /// Default level when RUST_LOG is unset
    pub level: String,
}
