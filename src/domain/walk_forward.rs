//! Rolling walk-forward validation.
//!
//! The series is cut into windows of `window_bars` bars starting every
//! `step_bars` bars (0, S, 2S, ... while a whole window fits). Bars left over
//! after the last whole window form one partial window, which is either
//! dropped or run and flagged. Each window is an independent single-pass run
//! from a flat state with its own derived RNG stream, so windows can run in
//! any order or in parallel.

use chrono::{DateTime, FixedOffset};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::backtest::run_session;
use crate::domain::candle::Candle;
use crate::domain::error::StuntmanError;
use crate::domain::execution::TradingState;
use crate::domain::position::Trade;
use crate::domain::rng::stream_rng;
use crate::domain::strategy::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialWindowPolicy {
    Exclude,
    Flag,
}

impl PartialWindowPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclude" => Some(PartialWindowPolicy::Exclude),
            "flag" => Some(PartialWindowPolicy::Flag),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    pub enabled: bool,
    pub window_bars: usize,
    pub step_bars: usize,
    pub partial: PartialWindowPolicy,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        WalkForwardConfig {
            enabled: false,
            window_bars: 2000,
            step_bars: 1000,
            partial: PartialWindowPolicy::Exclude,
        }
    }
}

/// Bar range of one window; `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub partial: bool,
}

impl WindowSpec {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

pub fn window_specs(
    bars: usize,
    window_bars: usize,
    step_bars: usize,
    policy: PartialWindowPolicy,
) -> Vec<WindowSpec> {
    let mut specs = Vec::new();
    if window_bars == 0 || step_bars == 0 {
        return specs;
    }

    let mut start = 0;
    while start + window_bars <= bars {
        specs.push(WindowSpec {
            index: specs.len(),
            start,
            end: start + window_bars,
            partial: false,
        });
        start += step_bars;
    }

    let covered = specs.last().map_or(0, |w| w.end);
    if covered < bars && policy == PartialWindowPolicy::Flag {
        // `start` is the first window start that would overrun the data
        specs.push(WindowSpec {
            index: specs.len(),
            start: start.min(covered),
            end: bars,
            partial: true,
        });
    }
    specs
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingWindowResult {
    pub index: usize,
    pub window_start: usize,
    pub window_end: usize,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub partial: bool,
    pub trades: Vec<Trade>,
    pub net_pnl: f64,
    pub rejected: usize,
}

/// Run every window of the series.
///
/// Fails with [`StuntmanError::InsufficientData`] when a whole window cannot
/// clear the warm-up, or when the series is too short for any window.
pub fn run_walk_forward(
    candles: &[Candle],
    strategy: &Strategy,
    master_seed: u64,
) -> Result<Vec<RollingWindowResult>, StuntmanError> {
    let config = &strategy.config;
    let wf = &config.walk_forward;
    let warmup = config.backtest.warmup_bars;
    if wf.window_bars <= warmup {
        return Err(StuntmanError::InsufficientData {
            symbol: config.instrument.symbol.clone(),
            bars: wf.window_bars,
            minimum: warmup + 1,
        });
    }

    let specs = window_specs(candles.len(), wf.window_bars, wf.step_bars, wf.partial);
    if specs.is_empty() {
        return Err(StuntmanError::InsufficientData {
            symbol: config.instrument.symbol.clone(),
            bars: candles.len(),
            minimum: wf.window_bars,
        });
    }
    tracing::info!(
        windows = specs.len(),
        window_bars = wf.window_bars,
        step_bars = wf.step_bars,
        "walk-forward started"
    );

    #[cfg(feature = "parallel")]
    let results: Vec<RollingWindowResult> = specs
        .par_iter()
        .map(|spec| run_window(candles, strategy, master_seed, spec))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<RollingWindowResult> = specs
        .iter()
        .map(|spec| run_window(candles, strategy, master_seed, spec))
        .collect();

    Ok(results)
}

fn run_window(
    candles: &[Candle],
    strategy: &Strategy,
    master_seed: u64,
    spec: &WindowSpec,
) -> RollingWindowResult {
    let slice = &candles[spec.start..spec.end];
    let mut rng = stream_rng(master_seed, spec.index as u64);
    let session = run_session(slice, strategy, TradingState::default(), &mut rng);

    let trades: Vec<Trade> = session
        .trades
        .into_iter()
        .map(|mut t| {
            t.entry_bar_index += spec.start;
            t.exit_bar_index += spec.start;
            t
        })
        .collect();
    let net_pnl = trades.iter().map(|t| t.net_pnl).sum();

    tracing::info!(
        window = spec.index,
        start = spec.start,
        end = spec.end,
        partial = spec.partial,
        trades = trades.len(),
        net_pnl,
        "window complete"
    );

    RollingWindowResult {
        index: spec.index,
        window_start: spec.start,
        window_end: spec.end,
        start_time: slice[0].time,
        end_time: slice[slice.len() - 1].time,
        partial: spec.partial,
        trades,
        net_pnl,
        rejected: session.rejected,
    }
}
