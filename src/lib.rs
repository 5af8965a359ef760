//! TrendCast Library
//!
//! Heuristic crypto trend signals streamed to real-time dashboard clients

pub mod config;
pub mod dashboard;
pub mod engine;
pub mod feed;
pub mod service;
pub mod types;

pub use engine::TrendEngine;
pub use types::{Prediction, Trend};
