//! Trend Engine - Heuristic signal derivation
//!
//! Pipeline per call:
//! - Input cleaning (coerce, drop non-finite/negative samples)
//! - Indicator Library → Composite Scorer
//! - Confidence Adjustment Pipeline
//! - Trend Classifier with per-instrument smoothing memories
//!
//! The engine performs no I/O. Its only state is a small bounded memory per
//! instrument; calls for the same instrument are serialized on that
//! instrument's lock, calls for different instruments run in parallel.

pub mod classifier;
pub mod confidence;
pub mod indicators;
pub mod memory;
pub mod scorer;

pub use confidence::{CONFIDENCE_CEILING, CONFIDENCE_FLOOR};
pub use indicators::{IndicatorSnapshot, MarketRegime};
pub use memory::{BoundedHistory, InstrumentMemory, MemorySnapshot, MEMORY_CAPACITY};
pub use scorer::ScoreCard;

use crate::types::{Prediction, PriceInput};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Fewer valid samples than this → "insufficient valid data"
pub const MIN_VALID_SAMPLES: usize = 10;
/// Fewer valid samples than this → "insufficient crypto data"
pub const MIN_CRYPTO_SAMPLES: usize = 15;

pub const INSUFFICIENT_VALID_DATA: &str = "Insufficient valid data for prediction";
pub const INSUFFICIENT_CRYPTO_DATA: &str = "Insufficient crypto data";
pub const PREDICTION_UNAVAILABLE: &str = "Prediction unavailable";

/// Failures contained at the engine boundary
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("non-finite {value} produced by {stage}")]
    NonFinite { stage: &'static str, value: &'static str },

    #[error("scoring panicked: {0}")]
    Panicked(String),
}

/// Coerce raw samples to prices, dropping anything non-numeric, non-finite or negative
pub fn clean_prices<T: PriceInput>(history: &[T]) -> Vec<f64> {
    history
        .iter()
        .filter_map(PriceInput::to_price)
        .filter(|p| p.is_finite() && *p >= 0.0)
        .collect()
}

/// Trend engine owning the per-instrument smoothing memories.
///
/// Construct once and share through an `Arc`.
#[derive(Debug, Default)]
pub struct TrendEngine {
    memories: RwLock<HashMap<String, Arc<Mutex<InstrumentMemory>>>>,
}

impl TrendEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predict the trend for one instrument from its price history (oldest first).
    ///
    /// Never fails: degraded situations yield a neutral, low-confidence result.
    pub fn predict_trend<T: PriceInput>(&self, history: &[T], instrument: &str) -> Prediction {
        let prices = clean_prices(history);

        if prices.len() < MIN_VALID_SAMPLES {
            tracing::debug!(
                instrument = %instrument,
                valid = prices.len(),
                dropped = history.len() - prices.len(),
                "Not enough valid samples"
            );
            return Prediction::neutral(INSUFFICIENT_VALID_DATA, 0.1);
        }
        if prices.len() < MIN_CRYPTO_SAMPLES {
            return Prediction::neutral(INSUFFICIENT_CRYPTO_DATA, 0.15);
        }

        let memory = self.memory_for(instrument);
        let mut guard = lock(&memory);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| evaluate(&prices, &mut guard)))
            .unwrap_or_else(|payload| Err(EngineError::Panicked(panic_message(payload.as_ref()))));

        match outcome {
            Ok(prediction) => {
                tracing::debug!(
                    instrument = %instrument,
                    samples = prices.len(),
                    trend = %prediction.trend,
                    confidence = prediction.confidence,
                    "Trend predicted"
                );
                prediction
            }
            Err(e) => {
                tracing::error!(instrument = %instrument, error = %e, "Trend prediction failed");
                Prediction::neutral(PREDICTION_UNAVAILABLE, 0.1)
            }
        }
    }

    /// Copy of an instrument's memories, `None` if it was never scored
    pub fn memory_snapshot(&self, instrument: &str) -> Option<MemorySnapshot> {
        let memories = self.memories.read().unwrap_or_else(PoisonError::into_inner);
        memories.get(instrument).map(|m| lock(m).snapshot())
    }

    /// Instruments with memory, sorted
    pub fn instruments(&self) -> Vec<String> {
        let memories = self.memories.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = memories.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn memory_for(&self, instrument: &str) -> Arc<Mutex<InstrumentMemory>> {
        {
            let memories = self.memories.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(memory) = memories.get(instrument) {
                return Arc::clone(memory);
            }
        }

        let mut memories = self.memories.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(memories.entry(instrument.to_string()).or_default())
    }
}

/// Score, adjust and classify one cleaned history against its memory
fn evaluate(prices: &[f64], memory: &mut InstrumentMemory) -> Result<Prediction, EngineError> {
    let card = scorer::score(prices);
    if !card.is_finite() {
        return Err(EngineError::NonFinite {
            stage: "scorer",
            value: "score",
        });
    }

    let ScoreCard {
        score,
        base_confidence,
        mut rationale,
        sufficient_data,
    } = card;

    let confidence = if sufficient_data {
        confidence::adjust(base_confidence, prices, &mut memory.confidence)
    } else {
        base_confidence
    };
    if !confidence.is_finite() {
        return Err(EngineError::NonFinite {
            stage: "confidence pipeline",
            value: "confidence",
        });
    }

    let score = classifier::apply_trend_bias(score, &memory.trend);
    let trend = classifier::classify(score, confidence, &mut memory.trend, &mut rationale);
    classifier::describe(prices, confidence, &mut rationale);

    Ok(Prediction::new(trend, rationale.join("; "), confidence))
}

fn lock(memory: &Mutex<InstrumentMemory>) -> MutexGuard<'_, InstrumentMemory> {
    memory.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Trend;

    fn ramp(start: f64, step: f64, len: usize) -> Vec<f64> {
        (0..len).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn test_clean_prices_drops_invalid_samples() {
        let raw = vec!["100", "abc", "-5", "NaN", "inf", " 101.5", ""];
        assert_eq!(clean_prices(&raw), vec![100.0, 101.5]);

        let raw = vec![Some(1.0), None, Some(f64::NAN), Some(2.0)];
        assert_eq!(clean_prices(&raw), vec![1.0, 2.0]);
    }

    #[test]
    fn test_short_history_early_exits() {
        let engine = TrendEngine::new();

        let p = engine.predict_trend(&[100.0, 101.0, 99.0, 102.0, 98.0], "BTC");
        assert_eq!(p, Prediction::neutral(INSUFFICIENT_VALID_DATA, 0.1));

        let p = engine.predict_trend(&ramp(100.0, 1.0, 12), "BTC");
        assert_eq!(p, Prediction::neutral(INSUFFICIENT_CRYPTO_DATA, 0.15));

        // Early exits never touch memory
        assert!(engine.memory_snapshot("BTC").is_none());
    }

    #[test]
    fn test_invalid_samples_count_against_minimum() {
        let engine = TrendEngine::new();
        let mut raw: Vec<String> = (0..9).map(|i| format!("{}", 100 + i)).collect();
        raw.extend(std::iter::repeat("n/a".to_string()).take(20));
        let p = engine.predict_trend(&raw, "ETH");
        assert_eq!(p.explanation, INSUFFICIENT_VALID_DATA);
    }

    #[test]
    fn test_scorer_early_exit_below_thirty() {
        let engine = TrendEngine::new();
        let p = engine.predict_trend(&[100.0; 20], "BTC");
        assert_eq!(p.trend, Trend::Neutral);
        assert_eq!(p.confidence, 0.1);
        assert_eq!(
            p.explanation,
            "Insufficient data for crypto analysis; Low confidence in volatile crypto market; Low confidence (10.0%)"
        );

        // Scorer exit skips the pipeline, so nothing is recorded
        let memory = engine.memory_snapshot("BTC").unwrap();
        assert!(memory.confidence.is_empty());
        assert!(memory.trend.is_empty());
    }

    #[test]
    fn test_overconfidence_penalty_across_calls() {
        let engine = TrendEngine::new();
        let prices = ramp(100.0, 1.0, 30);

        let first = engine.predict_trend(&prices, "BTC");
        let second = engine.predict_trend(&prices, "BTC");
        let third = engine.predict_trend(&prices, "BTC");

        assert!((first.confidence - 0.8).abs() < 1e-9);
        assert!((second.confidence - 0.8).abs() < 1e-9);
        assert!((third.confidence - 0.72).abs() < 1e-9);

        let memory = engine.memory_snapshot("BTC").unwrap();
        assert_eq!(memory.trend, vec![-0.1, -0.1, -0.1]);
        assert_eq!(memory.confidence.len(), 3);
    }

    #[test]
    fn test_instruments_are_isolated() {
        let engine = TrendEngine::new();
        let prices = ramp(100.0, 1.0, 30);
        for _ in 0..3 {
            engine.predict_trend(&prices, "BTC");
        }
        let eth = engine.predict_trend(&prices, "ETH");
        assert!((eth.confidence - 0.8).abs() < 1e-9);
        assert_eq!(engine.instruments(), vec!["BTC", "ETH"]);
    }

    #[test]
    fn test_evaluate_rejects_non_finite_scores() {
        let mut memory = InstrumentMemory::default();
        let prices = vec![f64::MAX; 40];
        match evaluate(&prices, &mut memory) {
            Err(EngineError::NonFinite { stage, .. }) => assert_eq!(stage, "scorer"),
            other => panic!("expected non-finite error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_scores_degrade_to_neutral() {
        let engine = TrendEngine::new();
        let p = engine.predict_trend(&vec![f64::MAX; 40], "BTC");
        assert_eq!(p, Prediction::neutral(PREDICTION_UNAVAILABLE, 0.1));
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
