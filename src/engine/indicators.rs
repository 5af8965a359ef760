//! Indicator Library - Pure technical indicators over a price sequence
//!
//! Every function takes prices oldest-first and never fails on short input:
//! below its minimum window it returns a defined neutral default.
//! - RSI (simple mean of gains/losses)
//! - MACD approximation (plain moving averages, not EMAs)
//! - Bollinger Bands
//! - Support/Resistance
//! - Market regime from log-return volatility
//! - Volatility score
//! - Compact 10-value feature vector
//!
//! Division by zero is guarded everywhere by substituting 0.

use serde::Serialize;
use std::fmt;

pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_BB_PERIOD: usize = 20;
pub const DEFAULT_SR_WINDOW: usize = 10;
pub const DEFAULT_VOLATILITY_WINDOW: usize = 20;

const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BB_MULTIPLIER: f64 = 2.0;
const REGIME_WINDOW: usize = 20;
const FEATURE_MIN_SAMPLES: usize = 30;

/// Days per year used to annualize per-sample volatility
pub const ANNUALIZATION_DAYS: f64 = 365.0;

// ============================================
// Numeric helpers
// ============================================

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// `numerator / denominator`, or 0 when the denominator is 0
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// The newest `n` samples (all of them when fewer)
pub(crate) fn tail(prices: &[f64], n: usize) -> &[f64] {
    &prices[prices.len().saturating_sub(n)..]
}

/// Log returns between consecutive samples; a zero price yields a 0 return
pub(crate) fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 && w[1] > 0.0 {
                (w[1] / w[0]).ln()
            } else {
                0.0
            }
        })
        .collect()
}

/// Annualized std dev of log returns (`std * sqrt(365)`)
pub fn annualized_volatility(prices: &[f64]) -> f64 {
    let returns = log_returns(prices);
    std_dev(&returns) * ANNUALIZATION_DAYS.sqrt()
}

// ============================================
// RSI
// ============================================

/// RSI over the last `period` deltas. Fewer than `period + 1` samples gives 50.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 50.0;
    }

    let deltas: Vec<f64> = tail(prices, period + 1)
        .windows(2)
        .map(|w| w[1] - w[0])
        .collect();

    let avg_gain = deltas.iter().map(|d| d.max(0.0)).sum::<f64>() / period as f64;
    let avg_loss = deltas.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        return if avg_gain > 0.0 { 100.0 } else { 50.0 };
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

// ============================================
// MACD approximation
// ============================================

/// Moving-average MACD proxy. The signal line is the 9-sample price mean,
/// which downstream thresholds are tuned to.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MacdApprox {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub fn macd_approx(prices: &[f64]) -> MacdApprox {
    if prices.len() < MACD_SLOW {
        return MacdApprox::default();
    }

    let macd = mean(tail(prices, MACD_FAST)) - mean(tail(prices, MACD_SLOW));
    let signal = mean(tail(prices, MACD_SIGNAL));

    MacdApprox {
        macd,
        signal,
        histogram: macd - signal,
    }
}

// ============================================
// Bollinger Bands
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// (upper - lower) / middle * 100
    pub bandwidth: f64,
}

impl BollingerBands {
    fn collapsed(price: f64) -> Self {
        Self {
            upper: price,
            middle: price,
            lower: price,
            bandwidth: 0.0,
        }
    }

    /// Position of `price` within the bands (0 = lower, 1 = upper), 0.5 when collapsed
    pub fn position(&self, price: f64) -> f64 {
        let width = self.upper - self.lower;
        if width > 0.0 {
            (price - self.lower) / width
        } else {
            0.5
        }
    }
}

pub fn bollinger_bands(prices: &[f64], period: usize) -> BollingerBands {
    if period == 0 || prices.len() < period {
        return BollingerBands::collapsed(prices.last().copied().unwrap_or(0.0));
    }

    let window = tail(prices, period);
    let sma = mean(window);
    let std = std_dev(window);
    let upper = sma + BB_MULTIPLIER * std;
    let lower = sma - BB_MULTIPLIER * std;

    BollingerBands {
        upper,
        middle: sma,
        lower,
        bandwidth: ratio(upper - lower, sma) * 100.0,
    }
}

// ============================================
// Support / Resistance
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SupportResistance {
    pub support: f64,
    pub resistance: f64,
}

/// Min/max over the last `window` samples; needs `2 * window` samples.
pub fn support_resistance(prices: &[f64], window: usize) -> SupportResistance {
    if window == 0 || prices.len() < window * 2 {
        let last = prices.last().copied().unwrap_or(0.0);
        return SupportResistance {
            support: last,
            resistance: last,
        };
    }

    let recent = tail(prices, window);
    SupportResistance {
        support: recent.iter().copied().fold(f64::INFINITY, f64::min),
        resistance: recent.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

// ============================================
// Market regime
// ============================================

/// Coarse market-behaviour classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    Trending,
    Ranging,
    HighVolatility,
    #[default]
    Unknown,
}

impl MarketRegime {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketRegime::Trending => "trending",
            MarketRegime::Ranging => "ranging",
            MarketRegime::HighVolatility => "high_volatility",
            MarketRegime::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn market_regime(prices: &[f64]) -> MarketRegime {
    if prices.len() < REGIME_WINDOW {
        return MarketRegime::Unknown;
    }

    let returns = log_returns(tail(prices, REGIME_WINDOW));
    let volatility = std_dev(&returns) * ANNUALIZATION_DAYS.sqrt();

    // Both means run over every return, with the opposite sign zeroed
    let up_moves: Vec<f64> = returns.iter().map(|r| r.max(0.0)).collect();
    let down_moves: Vec<f64> = returns.iter().map(|r| (-r).max(0.0)).collect();
    let trend_strength = (mean(&up_moves) - mean(&down_moves)).abs();

    if volatility > 0.8 {
        MarketRegime::HighVolatility
    } else if trend_strength > 0.02 {
        MarketRegime::Trending
    } else {
        MarketRegime::Ranging
    }
}

// ============================================
// Volatility score
// ============================================

/// Coefficient of variation (in %) over `window` scaled into [0, 1]; 0.5 below window.
pub fn volatility_score(prices: &[f64], window: usize) -> f64 {
    if window == 0 || prices.len() < window {
        return 0.5;
    }
    let recent = tail(prices, window);
    let cv_pct = ratio(std_dev(recent), mean(recent)) * 100.0;
    (cv_pct / 5.0).min(1.0)
}

// ============================================
// Feature vector
// ============================================

/// Ten normalized features; all zeros below 30 samples
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FeatureVector(pub [f64; FeatureVector::NUM_FEATURES]);

impl FeatureVector {
    pub const NUM_FEATURES: usize = 10;

    pub fn feature_names() -> [&'static str; Self::NUM_FEATURES] {
        [
            "momentum_5",
            "momentum_10",
            "cv_10",
            "cv_20",
            "mean_10_deviation",
            "rsi_deviation",
            "macd_norm",
            "macd_hist_norm",
            "slope_5_norm",
            "slope_15_norm",
        ]
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Mean of the first four (momentum and dispersion) features
    pub fn momentum_mean(&self) -> f64 {
        mean(&self.0[..4])
    }
}

pub fn feature_vector(prices: &[f64]) -> FeatureVector {
    if prices.len() < FEATURE_MIN_SAMPLES {
        return FeatureVector::default();
    }

    let n = prices.len();
    let current = prices[n - 1];
    let back = |k: usize| prices[n - k];

    let last_10 = tail(prices, 10);
    let last_20 = tail(prices, 20);
    let mean_10 = mean(last_10);

    let macd = macd_approx(prices);
    let short_slope = (current - back(5)) / 5.0;
    let long_slope = (current - back(15)) / 15.0;

    FeatureVector([
        ratio(current - back(5), back(5)),
        ratio(current - back(10), back(10)),
        ratio(std_dev(last_10), mean_10),
        ratio(std_dev(last_20), mean(last_20)),
        ratio(current - mean_10, mean_10),
        (rsi(prices, DEFAULT_RSI_PERIOD) - 50.0) / 50.0,
        ratio(macd.macd, current),
        ratio(macd.histogram, current),
        ratio(short_slope, current),
        ratio(long_slope, current),
    ])
}

// ============================================
// Snapshot
// ============================================

/// Every indicator for one price sequence, with default parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub samples: usize,
    pub last_price: f64,
    pub rsi: f64,
    pub macd: MacdApprox,
    pub bollinger: BollingerBands,
    pub levels: SupportResistance,
    pub regime: MarketRegime,
    pub volatility_score: f64,
    pub annualized_volatility: f64,
    pub features: FeatureVector,
}

impl IndicatorSnapshot {
    pub fn compute(prices: &[f64]) -> Self {
        Self {
            samples: prices.len(),
            last_price: prices.last().copied().unwrap_or(0.0),
            rsi: rsi(prices, DEFAULT_RSI_PERIOD),
            macd: macd_approx(prices),
            bollinger: bollinger_bands(prices, DEFAULT_BB_PERIOD),
            levels: support_resistance(prices, DEFAULT_SR_WINDOW),
            regime: market_regime(prices),
            volatility_score: volatility_score(prices, DEFAULT_VOLATILITY_WINDOW),
            annualized_volatility: annualized_volatility(prices),
            features: feature_vector(prices),
        }
    }
}
