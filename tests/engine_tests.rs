//! Integration tests for the trend engine

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use trendcast::engine::indicators::{bollinger_bands, rsi, DEFAULT_BB_PERIOD};
    use trendcast::engine::{
        TrendEngine, CONFIDENCE_CEILING, CONFIDENCE_FLOOR, INSUFFICIENT_VALID_DATA,
        MEMORY_CAPACITY,
    };
    use trendcast::types::{Prediction, Trend};

    fn ramp(start: f64, step: f64, len: usize) -> Vec<f64> {
        (0..len).map(|i| start + step * i as f64).collect()
    }

    fn wave(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| 100.0 + 3.0 * (i as f64 / 2.0).sin())
            .collect()
    }

    fn choppy(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| 100.0 + 10.0 * (1.3 * i as f64).sin())
            .collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    // ============================================================================
    // Indicator properties
    // ============================================================================

    #[test]
    fn test_rsi_short_input_is_neutral() {
        assert_eq!(rsi(&ramp(100.0, 1.0, 14), 14), 50.0);
        assert_eq!(rsi(&[], 14), 50.0);
    }

    #[test]
    fn test_rsi_stays_in_range() {
        for series in [ramp(100.0, 1.0, 40), ramp(200.0, -2.0, 40), choppy(40), wave(40)] {
            let value = rsi(&series, 14);
            assert!((0.0..=100.0).contains(&value), "rsi {value}");
        }
    }

    #[test]
    fn test_bollinger_bands_are_ordered() {
        for series in [choppy(60), wave(25), vec![42.0; 30], ramp(10.0, 0.5, 5)] {
            let bands = bollinger_bands(&series, DEFAULT_BB_PERIOD);
            assert!(bands.lower <= bands.middle && bands.middle <= bands.upper);
        }
    }

    // ============================================================================
    // Scenarios
    // ============================================================================

    #[test]
    fn test_five_samples_is_insufficient() {
        let engine = TrendEngine::new();
        let prediction = engine.predict_trend(&[100.0, 101.0, 99.0, 102.0, 98.0], "BTC");
        assert_eq!(
            prediction,
            Prediction::neutral(INSUFFICIENT_VALID_DATA, 0.1)
        );
    }

    #[test]
    fn test_flat_twenty_exits_before_scoring() {
        let engine = TrendEngine::new();
        let prediction = engine.predict_trend(&[50.0; 20], "ETH");
        assert_eq!(prediction.trend, Trend::Neutral);
        assert_eq!(prediction.confidence, 0.1);
        assert!(prediction
            .explanation
            .starts_with("Insufficient data for crypto analysis"));
    }

    #[test]
    fn test_flat_forty() {
        let engine = TrendEngine::new();
        let prediction = engine.predict_trend(&[50.0; 40], "ETH");
        assert_eq!(prediction.trend, Trend::Neutral);
        assert_close(prediction.confidence, 0.3);
        assert_eq!(
            prediction.explanation,
            "MACD bearish momentum; Near strong support level; Low confidence (30.0%); 24h change: +0.00%"
        );
    }

    #[test]
    fn test_steady_rise_reads_as_overextended() {
        // The momentum proxy and the band/level rules all fire against a
        // steady climb, so it reads bearish with the confidence cap applied.
        let engine = TrendEngine::new();
        let prediction = engine.predict_trend(&ramp(100.0, 1.0, 30), "BTC");
        assert!(prediction.confidence >= CONFIDENCE_FLOOR);
        assert!(prediction.confidence <= CONFIDENCE_CEILING);
        assert_eq!(prediction.trend, Trend::Bearish);
        assert_close(prediction.confidence, 0.8);
        assert!(prediction.explanation.contains("RSI overbought (100.0)"));
        assert!(prediction.explanation.contains("24h change: +21.70%"));
    }

    #[test]
    fn test_steady_fall_is_bullish() {
        let engine = TrendEngine::new();
        let prediction = engine.predict_trend(&ramp(200.0, -2.0, 60), "DOT");
        assert_eq!(prediction.trend, Trend::Bullish);
        assert_close(prediction.confidence, 0.5974);
        assert!(prediction.explanation.contains("Strong trending market"));
    }

    #[test]
    fn test_choppy_market_is_low_confidence_neutral() {
        let engine = TrendEngine::new();
        let prediction = engine.predict_trend(&choppy(60), "ENA");
        assert_eq!(prediction.trend, Trend::Neutral);
        assert_close(prediction.confidence, 0.1098);
        assert!(prediction
            .explanation
            .contains("Low confidence in volatile crypto market"));
    }

    #[test]
    fn test_pump_lowers_confidence() {
        let smooth = wave(40);
        let pumped: Vec<f64> = smooth
            .iter()
            .enumerate()
            .map(|(i, p)| if i >= 35 { p * 1.2 } else { *p })
            .collect();

        let smooth_prediction = TrendEngine::new().predict_trend(&smooth, "BTC");
        let pumped_prediction = TrendEngine::new().predict_trend(&pumped, "BTC");

        assert_close(smooth_prediction.confidence, 0.4494);
        assert_close(pumped_prediction.confidence, 0.2543);
        assert!(pumped_prediction.confidence < smooth_prediction.confidence);
    }

    // ============================================================================
    // Engine properties
    // ============================================================================

    #[test]
    fn test_confidence_bounds() {
        let engine = TrendEngine::new();
        let series = [
            ramp(100.0, 1.0, 30),
            ramp(200.0, -2.0, 60),
            choppy(60),
            wave(40),
            vec![0.0; 40],
            vec![50.0; 40],
            ramp(1.0, 1.0, 16),
        ];
        for (i, prices) in series.iter().enumerate() {
            let prediction = engine.predict_trend(prices, &format!("C{i}"));
            assert!((0.0..=1.0).contains(&prediction.confidence));
            if prices.len() >= 30 {
                assert!(prediction.confidence >= CONFIDENCE_FLOOR);
                assert!(prediction.confidence <= CONFIDENCE_CEILING);
            }
        }
    }

    #[test]
    fn test_memories_stay_bounded() {
        let engine = TrendEngine::new();
        let prices = wave(40);
        let mut last = None;
        for _ in 0..50 {
            last = Some(engine.predict_trend(&prices, "BTC"));
        }

        let memory = engine.memory_snapshot("BTC").unwrap();
        assert_eq!(memory.trend.len(), MEMORY_CAPACITY);
        assert_eq!(memory.confidence.len(), MEMORY_CAPACITY);
        assert_eq!(last.unwrap().trend, Trend::Bearish);
    }

    #[test]
    fn test_fresh_engines_agree() {
        for prices in [wave(40), choppy(60), ramp(100.0, 1.0, 30)] {
            let a = TrendEngine::new().predict_trend(&prices, "BTC");
            let b = TrendEngine::new().predict_trend(&prices, "BTC");
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_mixed_inputs_are_cleaned() {
        let raw: Vec<serde_json::Value> = (0..40)
            .map(|i| match i % 10 {
                3 => serde_json::Value::Null,
                7 => serde_json::json!("not a price"),
                _ => serde_json::json!(format!("{}", 100.0 + i as f64)),
            })
            .collect();

        let cleaned: Vec<f64> = raw.iter().filter_map(|v| v.as_str()?.parse().ok()).collect();
        let from_raw = TrendEngine::new().predict_trend(&raw, "BTC");
        let from_clean = TrendEngine::new().predict_trend(&cleaned, "BTC");
        assert_eq!(from_raw, from_clean);
    }

    #[test]
    fn test_parallel_instruments_match_sequential() {
        let instruments = ["BTC", "ETH", "DOT", "ENA"];
        let series = [wave(40), choppy(60), ramp(200.0, -2.0, 60), ramp(100.0, 1.0, 30)];

        let sequential = TrendEngine::new();
        let expected: Vec<Vec<Prediction>> = instruments
            .iter()
            .zip(&series)
            .map(|(id, prices)| (0..10).map(|_| sequential.predict_trend(prices, id)).collect())
            .collect();

        let engine = Arc::new(TrendEngine::new());
        let actual: Vec<Vec<Prediction>> = std::thread::scope(|scope| {
            let handles: Vec<_> = instruments
                .iter()
                .zip(&series)
                .map(|(id, prices)| {
                    let engine = Arc::clone(&engine);
                    scope.spawn(move || {
                        (0..10)
                            .map(|_| engine.predict_trend(prices, id))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(actual, expected);
        assert_eq!(engine.instruments(), vec!["BTC", "DOT", "ENA", "ETH"]);
    }

    #[test]
    fn test_same_instrument_updates_are_not_lost() {
        const CALLERS: usize = 8;
        let engine = Arc::new(TrendEngine::new());
        let prices = wave(40);

        let predictions: Vec<Prediction> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..CALLERS)
                .map(|_| {
                    let engine = Arc::clone(&engine);
                    let prices = &prices;
                    scope.spawn(move || engine.predict_trend(prices, "BTC"))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(predictions.iter().all(|p| p.trend == Trend::Bearish));
        let memory = engine.memory_snapshot("BTC").unwrap();
        assert_eq!(memory.trend.len(), CALLERS);
        assert_eq!(memory.confidence.len(), CALLERS);
        assert!(memory.trend.iter().all(|bias| *bias == -0.1));
    }
}
