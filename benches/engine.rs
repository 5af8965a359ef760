//! Benchmarks for trend prediction over a full history window.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trendcast::engine::{IndicatorSnapshot, TrendEngine};

fn history(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| 100.0 + 3.0 * (i as f64 / 2.0).sin() + 0.1 * i as f64)
        .collect()
}

fn benchmark_predict(c: &mut Criterion) {
    let prices = history(60);
    let engine = TrendEngine::new();

    c.bench_function("predict_trend_60", |b| {
        b.iter(|| engine.predict_trend(black_box(&prices), "BTC"))
    });

    c.bench_function("predict_trend_60_fresh_engine", |b| {
        b.iter(|| TrendEngine::new().predict_trend(black_box(&prices), "BTC"))
    });
}

fn benchmark_indicators(c: &mut Criterion) {
    let prices = history(60);

    c.bench_function("indicator_snapshot_60", |b| {
        b.iter(|| IndicatorSnapshot::compute(black_box(&prices)))
    });
}

criterion_group!(benches, benchmark_predict, benchmark_indicators);
criterion_main!(benches);
