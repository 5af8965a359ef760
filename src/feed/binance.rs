//! Binance REST ticker client
//!
//! Polls `GET /api/v3/ticker/price?symbol=BTCUSDT` for the last traded price.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{QuoteError, QuoteSource};

pub const BINANCE_TICKER_URL: &str = "https://api.binance.com/api/v3/ticker/price";

/// Body of the ticker endpoint; Binance sends the price as a decimal string
#[derive(Debug, Deserialize)]
struct TickerPrice {
    symbol: String,
    price: String,
}

#[derive(Debug, Clone)]
pub struct BinanceTickerSource {
    client: reqwest::Client,
    base_url: String,
    quote_asset: String,
}

impl BinanceTickerSource {
    pub fn new(
        base_url: impl Into<String>,
        quote_asset: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            quote_asset: quote_asset.into().to_uppercase(),
        })
    }

    /// Exchange symbol for an instrument, e.g. "btc" -> "BTCUSDT"
    pub fn symbol(&self, instrument: &str) -> String {
        format!("{}{}", instrument.trim().to_uppercase(), self.quote_asset)
    }

    fn parse_price(ticker: &TickerPrice) -> Result<f64, QuoteError> {
        match ticker.price.trim().parse::<f64>() {
            Ok(price) if price.is_finite() && price >= 0.0 => Ok(price),
            _ => Err(QuoteError::InvalidPrice {
                symbol: ticker.symbol.clone(),
                raw: ticker.price.clone(),
            }),
        }
    }
}

#[async_trait]
impl QuoteSource for BinanceTickerSource {
    fn name(&self) -> &'static str {
        "Binance"
    }

    async fn fetch_price(&self, instrument: &str) -> Result<f64, QuoteError> {
        let symbol = self.symbol(instrument);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("symbol", symbol.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QuoteError::Status {
                provider: self.name(),
                symbol,
                status: response.status().as_u16(),
            });
        }

        let ticker: TickerPrice = response.json().await?;
        let price = Self::parse_price(&ticker)?;

        tracing::trace!(symbol = %ticker.symbol, price, "Ticker price");
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> BinanceTickerSource {
        BinanceTickerSource::new(BINANCE_TICKER_URL, "usdt", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_symbol_uses_uppercase_pair() {
        let source = source();
        assert_eq!(source.symbol("BTC"), "BTCUSDT");
        assert_eq!(source.symbol(" ena "), "ENAUSDT");
    }

    #[test]
    fn test_parse_ticker_body() {
        let ticker: TickerPrice =
            serde_json::from_str(r#"{"symbol":"ETHUSDT","price":"3120.45000000"}"#).unwrap();
        assert_eq!(BinanceTickerSource::parse_price(&ticker).unwrap(), 3120.45);
    }

    #[test]
    fn test_parse_rejects_bad_prices() {
        for raw in ["", "abc", "-1.0", "NaN", "inf"] {
            let ticker = TickerPrice {
                symbol: "DOTUSDT".to_string(),
                price: raw.to_string(),
            };
            let err = BinanceTickerSource::parse_price(&ticker).unwrap_err();
            assert!(matches!(err, QuoteError::InvalidPrice { .. }), "{raw}");
        }
    }
}
