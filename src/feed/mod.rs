//! Feed module - Quote sources and the rolling price history
//!
//! Polls the latest price per instrument and keeps a bounded history that the
//! trend engine reads on every tick.

mod binance;
mod history;

pub use binance::{BinanceTickerSource, BINANCE_TICKER_URL};
pub use history::{PriceHistoryStore, SeriesStatus};

use async_trait::async_trait;
use futures_util::future::join_all;
use std::collections::BTreeMap;

/// Errors from a quote source. The engine never sees these; a failed fetch
/// only means the instrument has no price on that tick.
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned status {status} for {symbol}")]
    Status {
        provider: &'static str,
        symbol: String,
        status: u16,
    },

    #[error("invalid price {raw:?} for {symbol}")]
    InvalidPrice { symbol: String, raw: String },
}

/// Trait for quote source clients
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Fetch the latest price for one instrument (e.g. "BTC")
    async fn fetch_price(&self, instrument: &str) -> Result<f64, QuoteError>;
}

/// Fetch every instrument concurrently. Failures yield `None` for that
/// instrument only.
pub async fn fetch_all(
    source: &dyn QuoteSource,
    instruments: &[String],
) -> BTreeMap<String, Option<f64>> {
    let results = join_all(instruments.iter().map(|id| source.fetch_price(id))).await;

    instruments
        .iter()
        .zip(results)
        .map(|(id, result)| match result {
            Ok(price) => (id.clone(), Some(price)),
            Err(e) => {
                tracing::warn!(
                    source = source.name(),
                    instrument = %id,
                    error = %e,
                    "⚠️ Quote fetch failed"
                );
                (id.clone(), None)
            }
        })
        .collect()
}
