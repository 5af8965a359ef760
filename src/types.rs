//! Core types used throughout TrendCast
//!
//! Defines the trend labels, prediction results and the raw price inputs the
//! engine accepts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional signal produced by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Bullish => "bullish",
            Trend::Bearish => "bearish",
            Trend::Neutral => "neutral",
        }
    }

    /// Signed bias pushed onto the per-instrument trend memory
    pub fn bias(&self) -> f64 {
        match self {
            Trend::Bullish => 0.1,
            Trend::Bearish => -0.1,
            Trend::Neutral => 0.0,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one engine call. Never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub trend: Trend,
    pub explanation: String,
    /// Always within [0, 1]
    pub confidence: f64,
}

impl Prediction {
    pub fn new(trend: Trend, explanation: impl Into<String>, confidence: f64) -> Self {
        Self {
            trend,
            explanation: explanation.into(),
            confidence,
        }
    }

    /// Degraded result used by early exits and contained failures
    pub fn neutral(explanation: impl Into<String>, confidence: f64) -> Self {
        Self::new(Trend::Neutral, explanation, confidence)
    }
}

/// A raw price sample that may or may not coerce to a number.
///
/// The engine cleans its own input: anything that fails to coerce, or coerces
/// to a non-finite or negative value, is dropped before scoring.
pub trait PriceInput {
    fn to_price(&self) -> Option<f64>;
}

impl PriceInput for f64 {
    fn to_price(&self) -> Option<f64> {
        Some(*self)
    }
}

impl PriceInput for f32 {
    fn to_price(&self) -> Option<f64> {
        Some(f64::from(*self))
    }
}

impl PriceInput for i64 {
    fn to_price(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl PriceInput for i32 {
    fn to_price(&self) -> Option<f64> {
        Some(f64::from(*self))
    }
}

impl PriceInput for u64 {
    fn to_price(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl PriceInput for u32 {
    fn to_price(&self) -> Option<f64> {
        Some(f64::from(*self))
    }
}

impl PriceInput for str {
    fn to_price(&self) -> Option<f64> {
        self.trim().parse::<f64>().ok()
    }
}

impl PriceInput for String {
    fn to_price(&self) -> Option<f64> {
        self.as_str().to_price()
    }
}

impl PriceInput for serde_json::Value {
    fn to_price(&self) -> Option<f64> {
        match self {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.to_price(),
            _ => None,
        }
    }
}

impl<T: PriceInput> PriceInput for Option<T> {
    fn to_price(&self) -> Option<f64> {
        self.as_ref().and_then(PriceInput::to_price)
    }
}

impl<T: PriceInput + ?Sized> PriceInput for &T {
    fn to_price(&self) -> Option<f64> {
        (**self).to_price()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trend_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Trend::Bullish).unwrap(), "\"bullish\"");
        assert_eq!(Trend::Bearish.to_string(), "bearish");
        assert_eq!(Trend::default(), Trend::Neutral);
    }

    #[test]
    fn trend_bias_matches_memory_values() {
        assert_eq!(Trend::Bullish.bias(), 0.1);
        assert_eq!(Trend::Bearish.bias(), -0.1);
        assert_eq!(Trend::Neutral.bias(), 0.0);
    }

    #[test]
    fn price_input_coerces_strings_and_json() {
        assert_eq!(" 101.5 ".to_price(), Some(101.5));
        assert_eq!("abc".to_price(), None);
        assert_eq!(json!(42).to_price(), Some(42.0));
        assert_eq!(json!("7.25").to_price(), Some(7.25));
        assert_eq!(json!(null).to_price(), None);
        assert_eq!(json!([1, 2]).to_price(), None);
        assert_eq!(Some(3_i64).to_price(), Some(3.0));
        assert_eq!(None::<f64>.to_price(), None);
    }
}
