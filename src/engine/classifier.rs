//! Trend Classifier - Maps (score, confidence) to a trend label and explanation

use crate::engine::indicators::ratio;
use crate::engine::memory::BoundedHistory;
use crate::types::Trend;

/// Below this confidence the trend is always neutral
pub const MIN_DIRECTIONAL_CONFIDENCE: f64 = 0.25;
const TREND_THRESHOLD: f64 = 0.2;
const BIAS_WINDOW: usize = 5;
const BIAS_WEIGHT: f64 = 0.1;
/// Samples treated as one day when reporting the change line
const DAY_SAMPLES: usize = 24;
const HIGH_CHANGE_PCT: f64 = 15.0;

/// Nudge the score toward the instrument's recent trend bias
pub fn apply_trend_bias(score: f64, trend_memory: &BoundedHistory) -> f64 {
    match trend_memory.mean_of_last(BIAS_WINDOW) {
        Some(bias) => score + bias * BIAS_WEIGHT,
        None => score,
    }
}

/// Classify and record the trend bias. Low-confidence calls leave the memory untouched.
pub fn classify(
    score: f64,
    confidence: f64,
    trend_memory: &mut BoundedHistory,
    rationale: &mut Vec<String>,
) -> Trend {
    if confidence < MIN_DIRECTIONAL_CONFIDENCE {
        rationale.push("Low confidence in volatile crypto market".to_string());
        return Trend::Neutral;
    }

    let trend = if score > TREND_THRESHOLD {
        Trend::Bullish
    } else if score < -TREND_THRESHOLD {
        Trend::Bearish
    } else {
        Trend::Neutral
    };
    trend_memory.push(trend.bias());
    trend
}

pub fn confidence_label(confidence: f64) -> &'static str {
    if confidence > 0.6 {
        "High"
    } else if confidence > 0.3 {
        "Medium"
    } else {
        "Low"
    }
}

/// Percent change between the newest sample and the one 24 samples back.
///
/// Sample count stands in for elapsed time (one sample ≈ one hour); `None`
/// until more than 24 samples exist.
pub fn change_24h(prices: &[f64]) -> Option<f64> {
    let len = prices.len();
    if len <= DAY_SAMPLES {
        return None;
    }
    let reference = prices[len - DAY_SAMPLES.min(len)];
    Some(ratio(prices[len - 1] - reference, reference) * 100.0)
}

/// Append the confidence descriptor and the 24h change lines
pub fn describe(prices: &[f64], confidence: f64, rationale: &mut Vec<String>) {
    rationale.push(format!(
        "{} confidence ({:.1}%)",
        confidence_label(confidence),
        confidence * 100.0
    ));

    if let Some(change) = change_24h(prices) {
        rationale.push(format!("24h change: {:+.2}%", change));
        if change.abs() > HIGH_CHANGE_PCT {
            rationale.push("High volatility - typical crypto movement".to_string());
        }
    }
}
