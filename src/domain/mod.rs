//! Core domain types and logic.

pub mod approval;
pub mod backtest;
pub mod candle;
pub mod config_validation;
pub mod cost;
pub mod error;
pub mod execution;
pub mod indicator;
pub mod indicator_set;
pub mod instrument;
pub mod learning;
pub mod metrics;
pub mod pattern;
pub mod position;
pub mod regime;
pub mod rng;
pub mod signal;
pub mod strategy;
pub mod walk_forward;
