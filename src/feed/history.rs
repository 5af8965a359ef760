//! Rolling per-instrument price history

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Series {
    prices: VecDeque<f64>,
    last_tick_ms: Option<i64>,
}

/// Per-instrument sample counts and freshness, used by the health endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStatus {
    pub samples: usize,
    pub last_price: Option<f64>,
    pub last_tick_ms: Option<i64>,
}

/// Bounded FIFO of recent prices per instrument (oldest first).
///
/// Instruments passed at construction always appear in `latest()`, even before
/// their first successful fetch.
#[derive(Debug)]
pub struct PriceHistoryStore {
    capacity: usize,
    series: RwLock<HashMap<String, Series>>,
}

impl PriceHistoryStore {
    pub fn new(instruments: &[String], capacity: usize) -> Self {
        let series = instruments
            .iter()
            .map(|id| (id.clone(), Series::default()))
            .collect();
        Self {
            capacity,
            series: RwLock::new(series),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a price, evicting the oldest sample once full
    pub async fn record(&self, instrument: &str, price: f64) {
        let mut series = self.series.write().await;
        let entry = series.entry(instrument.to_string()).or_default();
        if self.capacity == 0 {
            return;
        }
        while entry.prices.len() >= self.capacity {
            entry.prices.pop_front();
        }
        entry.prices.push_back(price);
        entry.last_tick_ms = Some(chrono::Utc::now().timestamp_millis());
    }

    /// Record every present price of one tick; absent prices are skipped.
    /// Returns how many were recorded.
    pub async fn record_tick(&self, prices: &BTreeMap<String, Option<f64>>) -> usize {
        let mut recorded = 0;
        for (instrument, price) in prices {
            if let Some(price) = price {
                self.record(instrument, *price).await;
                recorded += 1;
            }
        }
        recorded
    }

    /// Copy of an instrument's history, empty if unknown
    pub async fn snapshot(&self, instrument: &str) -> Vec<f64> {
        self.series
            .read()
            .await
            .get(instrument)
            .map(|s| s.prices.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Most recent price per instrument
    pub async fn latest(&self) -> BTreeMap<String, Option<f64>> {
        self.series
            .read()
            .await
            .iter()
            .map(|(id, s)| (id.clone(), s.prices.back().copied()))
            .collect()
    }

    pub async fn len(&self, instrument: &str) -> usize {
        self.series
            .read()
            .await
            .get(instrument)
            .map_or(0, |s| s.prices.len())
    }

    pub async fn instruments(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.series.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn status(&self) -> BTreeMap<String, SeriesStatus> {
        self.series
            .read()
            .await
            .iter()
            .map(|(id, s)| {
                (
                    id.clone(),
                    SeriesStatus {
                        samples: s.prices.len(),
                        last_price: s.prices.back().copied(),
                        last_tick_ms: s.last_tick_ms,
                    },
                )
            })
            .collect()
    }
}
