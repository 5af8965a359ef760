//! Confidence Adjustment Pipeline
//!
//! Converts the scorer's base confidence into a bounded, risk-aware value.
//! The volatility-based stages are pure `fn(confidence, prices) -> confidence`
//! transforms applied in order; the final safeguards also read and update the
//! instrument's confidence memory.

use crate::engine::indicators::{annualized_volatility, log_returns, mean, ratio, tail};
use crate::engine::memory::BoundedHistory;

pub const CONFIDENCE_FLOOR: f64 = 0.05;
pub const CONFIDENCE_CEILING: f64 = 0.85;

/// Below this many samples the volatility-based stages are skipped
pub const MIN_RISK_SAMPLES: usize = 20;
const SHORT_HISTORY_FACTOR: f64 = 0.3;

const VOLATILITY_WINDOW: usize = 50;
const PUMP_DUMP_WINDOW: usize = 10;
const PUMP_DUMP_THRESHOLD: f64 = 0.15;
const REGIME_WINDOW: usize = 30;
const REGIME_BOOST_CAP: f64 = 0.8;
const RECENT_MOVE_THRESHOLD: f64 = 0.1;
const OVERCONFIDENCE_WINDOW: usize = 5;
const OVERCONFIDENCE_MIN_ENTRIES: usize = 3;
const OVERCONFIDENCE_THRESHOLD: f64 = 0.7;

/// A pure confidence transform
pub type StageFn = fn(f64, &[f64]) -> f64;

/// Named pipeline stage
#[derive(Debug, Clone, Copy)]
pub struct RiskStage {
    pub name: &'static str,
    pub apply: StageFn,
}

/// Volatility-based stages, in application order
pub const RISK_STAGES: [RiskStage; 4] = [
    RiskStage {
        name: "volatility_damping",
        apply: volatility_damping,
    },
    RiskStage {
        name: "pump_dump",
        apply: pump_dump_damping,
    },
    RiskStage {
        name: "regime_adaptation",
        apply: regime_adaptation,
    },
    RiskStage {
        name: "cap_clamp",
        apply: cap_clamp,
    },
];

pub fn clamp_confidence(confidence: f64) -> f64 {
    confidence.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING)
}

/// Full pipeline: length guard or risk stages, then the final safeguards.
pub fn adjust(base_confidence: f64, prices: &[f64], memory: &mut BoundedHistory) -> f64 {
    let confidence = if prices.len() < MIN_RISK_SAMPLES {
        tracing::debug!(
            samples = prices.len(),
            required = MIN_RISK_SAMPLES,
            "Short history, skipping volatility stages"
        );
        base_confidence * SHORT_HISTORY_FACTOR
    } else {
        apply_risk_stages(base_confidence, prices)
    };

    final_safeguards(confidence, prices, memory)
}

/// Fold the confidence through `RISK_STAGES`
pub fn apply_risk_stages(confidence: f64, prices: &[f64]) -> f64 {
    RISK_STAGES.iter().fold(confidence, |current, stage| {
        let next = (stage.apply)(current, prices);
        if next != current {
            tracing::debug!(
                stage = stage.name,
                before = current,
                after = next,
                "Confidence adjusted"
            );
        }
        next
    })
}

/// Dampen by annualized volatility of the last 50 samples
pub fn volatility_damping(confidence: f64, prices: &[f64]) -> f64 {
    let volatility = annualized_volatility(tail(prices, VOLATILITY_WINDOW));

    if volatility > 1.2 {
        confidence * 0.5
    } else if volatility > 0.8 {
        confidence * 0.7
    } else if volatility > 0.4 {
        confidence * 0.85
    } else {
        confidence
    }
}

/// Penalize any single-step log move beyond ±15% in the last 10 samples.
/// A step into or out of a zero price is an unbounded move and always counts.
pub fn pump_dump_damping(confidence: f64, prices: &[f64]) -> f64 {
    if prices.len() < PUMP_DUMP_WINDOW {
        return confidence;
    }

    let window = tail(prices, PUMP_DUMP_WINDOW);
    let crashed = window
        .windows(2)
        .any(|w| (w[0] == 0.0) != (w[1] == 0.0));
    let extreme = crashed
        || log_returns(window)
            .iter()
            .any(|r| *r > PUMP_DUMP_THRESHOLD || *r < -PUMP_DUMP_THRESHOLD);

    if extreme {
        tracing::warn!(
            confidence = confidence,
            "⚠️ Pump/dump pattern detected - confidence reduced"
        );
        confidence * 0.4
    } else {
        confidence
    }
}

/// Adapt to the 30-sample regime: mild boost in calm uptrends, damping otherwise
pub fn regime_adaptation(confidence: f64, prices: &[f64]) -> f64 {
    if prices.len() < REGIME_WINDOW {
        return confidence;
    }

    let window = tail(prices, REGIME_WINDOW);
    let first = window[0];
    let last = window[window.len() - 1];
    let total_return = ratio(last - first, first);
    let volatility = annualized_volatility(window);

    if total_return > 0.2 && volatility < 0.8 {
        (confidence * 1.1).min(REGIME_BOOST_CAP)
    } else if total_return < -0.2 {
        confidence * 0.7
    } else if total_return.abs() < 0.1 && volatility > 0.9 {
        confidence * 0.6
    } else {
        confidence
    }
}

pub fn cap_clamp(confidence: f64, _prices: &[f64]) -> f64 {
    clamp_confidence(confidence)
}

/// Clamp, penalize large 3-sample moves, record into memory, then correct for
/// recent overconfidence. The recorded value excludes the overconfidence penalty.
pub fn final_safeguards(confidence: f64, prices: &[f64], memory: &mut BoundedHistory) -> f64 {
    let mut confidence = clamp_confidence(confidence);

    if prices.len() >= 3 {
        let reference = prices[prices.len() - 3];
        let recent_move = ratio(prices[prices.len() - 1] - reference, reference).abs();
        if recent_move > RECENT_MOVE_THRESHOLD {
            confidence *= 0.8;
        }
    }

    memory.push(confidence);

    if memory.len() >= OVERCONFIDENCE_MIN_ENTRIES {
        let recent: Vec<f64> = memory.last(OVERCONFIDENCE_WINDOW).collect();
        if mean(&recent) > OVERCONFIDENCE_THRESHOLD {
            tracing::debug!(
                recent_mean = mean(&recent),
                "Recent overconfidence, applying penalty"
            );
            confidence *= 0.9;
        }
    }

    clamp_confidence(confidence)
}
