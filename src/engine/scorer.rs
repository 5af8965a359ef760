//! Composite Scorer - Combines indicators into a signed score and base confidence
//!
//! Each rule contributes independently; rules are not mutually exclusive.

use crate::engine::indicators::{IndicatorSnapshot, MarketRegime};

/// Samples required before any rule is evaluated
pub const MIN_SCORING_SAMPLES: usize = 30;

/// Confidence returned when the scorer exits early
pub const INSUFFICIENT_DATA_CONFIDENCE: f64 = 0.1;

const PROXIMITY_THRESHOLD: f64 = 0.02;

/// Output of the composite scorer
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    /// Signed score, typically within [-1, 1]
    pub score: f64,
    /// Confidence before risk adjustments
    pub base_confidence: f64,
    /// Human-readable reasons, in rule order
    pub rationale: Vec<String>,
    /// False when the scorer exited early; the risk pipeline is then skipped
    pub sufficient_data: bool,
}

impl ScoreCard {
    fn insufficient() -> Self {
        Self {
            score: 0.0,
            base_confidence: INSUFFICIENT_DATA_CONFIDENCE,
            rationale: vec!["Insufficient data for crypto analysis".to_string()],
            sufficient_data: false,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.score.is_finite() && self.base_confidence.is_finite()
    }
}

/// Score a cleaned price history (oldest first)
pub fn score(prices: &[f64]) -> ScoreCard {
    if prices.len() < MIN_SCORING_SAMPLES {
        return ScoreCard::insufficient();
    }

    let snapshot = IndicatorSnapshot::compute(prices);
    score_snapshot(&snapshot)
}

/// Apply the scoring rules to precomputed indicators
pub fn score_snapshot(ind: &IndicatorSnapshot) -> ScoreCard {
    let current = ind.last_price;
    let mut score = 0.0;
    let mut rationale = Vec::new();

    // 1. RSI
    if ind.rsi > 75.0 {
        score -= 0.25;
        rationale.push(format!("RSI overbought ({:.1})", ind.rsi));
    } else if ind.rsi < 25.0 {
        score += 0.25;
        rationale.push(format!("RSI oversold ({:.1})", ind.rsi));
    } else {
        score += (50.0 - ind.rsi) / 200.0;
    }

    // 2. MACD momentum
    let macd = ind.macd;
    if macd.macd > macd.signal && macd.histogram > 0.0 {
        score += 0.3;
        rationale.push("MACD bullish momentum".to_string());
    } else if macd.macd < macd.signal && macd.histogram < 0.0 {
        score -= 0.3;
        rationale.push("MACD bearish momentum".to_string());
    }

    // 3. Bollinger position
    let bb_position = ind.bollinger.position(current);
    if bb_position < 0.2 {
        score += 0.2;
        rationale.push("Near lower Bollinger Band".to_string());
    } else if bb_position > 0.8 {
        score -= 0.2;
        rationale.push("Near upper Bollinger Band".to_string());
    }

    // 4. Support / resistance proximity
    let to_support = ratio(current - ind.levels.support, current);
    let to_resistance = ratio(ind.levels.resistance - current, current);
    if to_support < PROXIMITY_THRESHOLD {
        score += 0.15;
        rationale.push("Near strong support level".to_string());
    } else if to_resistance < PROXIMITY_THRESHOLD {
        score -= 0.15;
        rationale.push("Near strong resistance level".to_string());
    }

    // 5. Regime
    match ind.regime {
        MarketRegime::Trending => {
            score += 0.1;
            rationale.push("Strong trending market".to_string());
        }
        MarketRegime::HighVolatility => {
            score -= 0.1;
            rationale.push("High volatility - cautious".to_string());
        }
        MarketRegime::Ranging | MarketRegime::Unknown => {}
    }

    let mut confidence = 0.0;
    confidence += ((ind.rsi - 50.0).abs() / 50.0 * 0.25).min(0.25);
    if current != 0.0 {
        confidence += (macd.histogram.abs() / current * 80.0 * 0.3).min(0.3);
    }
    confidence += (ind.bollinger.bandwidth / 15.0 * 0.2).min(0.2);
    confidence += match ind.regime {
        MarketRegime::Trending => 0.1,
        MarketRegime::HighVolatility => -0.05,
        MarketRegime::Ranging | MarketRegime::Unknown => 0.0,
    };

    let momentum = ind.features.momentum_mean();
    score += momentum * 0.3;
    confidence += (momentum.abs() * 0.15).min(0.15);

    ScoreCard {
        score,
        base_confidence: confidence,
        rationale,
        sufficient_data: true,
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    crate::engine::indicators::ratio(numerator, denominator)
}
