//! Bounded per-instrument smoothing memories

use serde::Serialize;
use std::collections::VecDeque;

/// Capacity of both the trend and the confidence memory
pub const MEMORY_CAPACITY: usize = 20;

/// FIFO-bounded sequence of values; pushing past capacity evicts the oldest.
#[derive(Debug, Clone)]
pub struct BoundedHistory {
    values: VecDeque<f64>,
    capacity: usize,
}

impl BoundedHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.capacity == 0 {
            return;
        }
        while self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The newest `n` values, oldest first
    pub fn last(&self, n: usize) -> impl Iterator<Item = f64> + '_ {
        let skip = self.values.len().saturating_sub(n);
        self.values.iter().skip(skip).copied()
    }

    /// Mean of the newest `n` values, `None` when empty
    pub fn mean_of_last(&self, n: usize) -> Option<f64> {
        let count = self.values.len().min(n);
        if count == 0 {
            return None;
        }
        Some(self.last(n).sum::<f64>() / count as f64)
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

/// Smoothing state for one instrument
#[derive(Debug, Clone)]
pub struct InstrumentMemory {
    /// Recent signed trend biases (+0.1 / -0.1 / 0.0)
    pub trend: BoundedHistory,
    /// Recent final confidences
    pub confidence: BoundedHistory,
}

impl Default for InstrumentMemory {
    fn default() -> Self {
        Self {
            trend: BoundedHistory::new(MEMORY_CAPACITY),
            confidence: BoundedHistory::new(MEMORY_CAPACITY),
        }
    }
}

impl InstrumentMemory {
    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            trend: self.trend.to_vec(),
            confidence: self.confidence.to_vec(),
        }
    }
}

/// Read-only copy of an instrument's memories
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemorySnapshot {
    pub trend: Vec<f64>,
    pub confidence: Vec<f64>,
}
