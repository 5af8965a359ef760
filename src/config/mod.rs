//! Configuration management for TrendCast
//!
//! Loads from YAML files + environment variables via .env

mod types;

pub use types::*;

use anyhow::{bail, Context, Result};
use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::feed::BINANCE_TICKER_URL;

const ENV_PREFIX: &str = "TRENDCAST";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub feed: FeedConfig,
    pub predictor: PredictorConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (TRENDCAST__FEED__INSTRUMENTS=BTC,ETH)
            .add_source(Self::environment());

        Self::build(builder)
    }

    /// Built-in defaults only, ignoring files and environment
    pub fn with_defaults() -> Result<Self> {
        Self::build(Self::defaults()?)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            // Server defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.broadcast_capacity", 256)?
            // Feed defaults
            .set_default("feed.instruments", vec!["BTC", "ETH", "DOT", "ENA"])?
            .set_default("feed.quote_asset", "USDT")?
            .set_default("feed.base_url", BINANCE_TICKER_URL)?
            .set_default("feed.poll_interval_ms", 1000)?
            .set_default("feed.request_timeout_ms", 10_000)?
            .set_default("feed.history_capacity", 60)?
            // Predictor defaults
            .set_default("predictor.interval_secs", 5)?
            .set_default("predictor.min_history", 15)?
            // Log defaults
            .set_default("log.json", false)?
            .set_default("log.level", "info")?;
        Ok(builder)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("feed.instruments")
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder.build().context("Failed to build configuration")?;

        let mut app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.normalize();
        app_config.validate()?;
        Ok(app_config)
    }

    /// Uppercase and dedupe instruments, keeping first-seen order
    fn normalize(&mut self) {
        let mut seen = Vec::with_capacity(self.feed.instruments.len());
        for id in &self.feed.instruments {
            let id = id.trim().to_uppercase();
            if !id.is_empty() && !seen.contains(&id) {
                seen.push(id);
            }
        }
        self.feed.instruments = seen;
        self.feed.quote_asset = self.feed.quote_asset.trim().to_uppercase();
    }

    /// Reject settings the service loops cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.feed.instruments.is_empty() {
            bail!("feed.instruments must list at least one instrument");
        }
        if self.feed.history_capacity == 0 {
            bail!("feed.history_capacity must be greater than zero");
        }
        if self.server.broadcast_capacity == 0 {
            bail!("server.broadcast_capacity must be greater than zero");
        }
        if self.feed.poll_interval_ms == 0 || self.feed.request_timeout_ms == 0 {
            bail!("feed.poll_interval_ms and feed.request_timeout_ms must be greater than zero");
        }
        if self.predictor.interval_secs == 0 {
            bail!("predictor.interval_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.feed.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.feed.request_timeout_ms)
    }

    pub fn predictor_interval(&self) -> Duration {
        Duration::from_secs(self.predictor.interval_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "instruments={:?} quote={} poll={}ms predict={}s history={} bind={}",
            self.feed.instruments,
            self.feed.quote_asset,
            self.feed.poll_interval_ms,
            self.predictor.interval_secs,
            self.feed.history_capacity,
            self.bind_address()
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn with_env(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let builder = AppConfig::defaults()?.add_source(AppConfig::environment().source(Some(map)));
        AppConfig::build(builder)
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::with_defaults().unwrap();
        assert_eq!(config.feed.instruments, vec!["BTC", "ETH", "DOT", "ENA"]);
        assert_eq!(config.feed.quote_asset, "USDT");
        assert_eq!(config.feed.base_url, BINANCE_TICKER_URL);
        assert_eq!(config.feed.history_capacity, 60);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.predictor_interval(), Duration::from_secs(5));
        assert_eq!(config.predictor.min_history, 15);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert!(!config.log.json);
    }

    #[test]
    fn test_environment_overrides() {
        let config = with_env(&[
            ("TRENDCAST__SERVER__PORT", "9100"),
            ("TRENDCAST__FEED__INSTRUMENTS", "sol, btc,SOL"),
            ("TRENDCAST__LOG__JSON", "true"),
        ])
        .unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.feed.instruments, vec!["SOL", "BTC"]);
        assert!(config.log.json);
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let err = with_env(&[("TRENDCAST__FEED__HISTORY_CAPACITY", "0")]).unwrap_err();
        assert!(err.to_string().contains("history_capacity"));

        let err = with_env(&[("TRENDCAST__PREDICTOR__INTERVAL_SECS", "0")]).unwrap_err();
        assert!(err.to_string().contains("interval_secs"));

        let mut config = AppConfig::with_defaults().unwrap();
        config.feed.instruments.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_digest_mentions_instruments() {
        let config = AppConfig::with_defaults().unwrap();
        let digest = config.to_string();
        assert!(digest.contains("BTC"));
        assert!(digest.contains("bind=0.0.0.0:8000"));
    }
}
