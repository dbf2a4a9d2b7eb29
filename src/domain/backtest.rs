//! Single-pass backtest loop.
//!
//! Indicators and regimes are computed once for the whole series; the loop
//! then walks the bars in time order after the warm-up, asks the strategy for
//! a signal and steps the position state machine. No I/O happens inside.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::candle::Candle;
use crate::domain::cost::CostModel;
use crate::domain::error::StuntmanError;
use crate::domain::execution::{EntryOutcome, PositionStateMachine, TradingState};
use crate::domain::indicator_set::{IndicatorSet, IndicatorSnapshot};
use crate::domain::pattern::PatternContext;
use crate::domain::position::Trade;
use crate::domain::regime::classify_all;
use crate::domain::strategy::Strategy;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 150_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Bars skipped before patterns are evaluated.
    pub warmup_bars: usize,
    pub seed: u64,
    /// Starting equity for drawdown measurement and the drawdown stop.
    pub initial_capital: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            warmup_bars: 100,
            seed: 42,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub bars: usize,
    pub bars_evaluated: usize,
    pub signals: usize,
    /// Entries lost to the cost model's rejection draw.
    pub rejected: usize,
    /// Entries refused by session timing, trade cap or a loss stop.
    pub blocked: usize,
    pub final_state: TradingState,
}

impl BacktestResult {
    pub fn net_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.net_pnl).sum()
    }
}

/// Single pass over the whole series from a flat state, seeded from the
/// strategy's backtest config.
pub fn run_backtest(
    candles: &[Candle],
    strategy: &Strategy,
) -> Result<BacktestResult, StuntmanError> {
    resume_backtest(candles, strategy, TradingState::default())
}

/// Like [`run_backtest`], starting from a saved state: its per-day counters,
/// drawdown peak and any open position carry into this run.
pub fn resume_backtest(
    candles: &[Candle],
    strategy: &Strategy,
    state: TradingState,
) -> Result<BacktestResult, StuntmanError> {
    let config = &strategy.config;
    if candles.is_empty() {
        return Err(StuntmanError::NoData {
            symbol: config.instrument.symbol.clone(),
        });
    }
    if candles.len() <= config.backtest.warmup_bars {
        return Err(StuntmanError::InsufficientData {
            symbol: config.instrument.symbol.clone(),
            bars: candles.len(),
            minimum: config.backtest.warmup_bars + 1,
        });
    }

    let mut rng = StdRng::seed_from_u64(config.backtest.seed);
    let result = run_session(candles, strategy, state, &mut rng);
    tracing::info!(
        symbol = %config.instrument.symbol,
        bars = result.bars,
        trades = result.trades.len(),
        rejected = result.rejected,
        net_pnl = result.net_pnl(),
        "backtest complete"
    );
    Ok(result)
}

/// Run the loop from an explicit starting state with the caller's RNG.
///
/// The state carries over per-day counters and any open position, so a
/// session can be resumed from a persisted [`TradingState`].
pub fn run_session<R: Rng + ?Sized>(
    candles: &[Candle],
    strategy: &Strategy,
    mut state: TradingState,
    rng: &mut R,
) -> BacktestResult {
    let config = &strategy.config;
    let indicators = IndicatorSet::compute(candles, &config.indicators);
    let regimes = classify_all(&indicators, &config.regime);
    let machine = PositionStateMachine::new(
        config.execution.clone(),
        CostModel::new(config.costs.clone(), config.instrument.clone()),
    )
    .with_capital(config.backtest.initial_capital);

    let mut result = BacktestResult {
        bars: candles.len(),
        ..BacktestResult::default()
    };

    let start = config.backtest.warmup_bars.min(candles.len());
    let mut previous = if start > 0 {
        indicators.snapshot(start - 1)
    } else {
        IndicatorSnapshot::default()
    };

    for index in start..candles.len() {
        let snapshot = indicators.snapshot(index);
        let ctx = PatternContext::new(candles, index, snapshot, previous, regimes[index]);
        let signal = strategy.signal(&ctx);
        if signal.is_some() {
            result.signals += 1;
        }

        let outcome = machine.step(&mut state, candles, index, snapshot.atr, signal.as_ref(), rng);
        match outcome.entry {
            EntryOutcome::Rejected => result.rejected += 1,
            EntryOutcome::Blocked(_) => result.blocked += 1,
            _ => {}
        }
        result.trades.extend(outcome.closed);
        result.bars_evaluated += 1;
        previous = snapshot;
    }

    result.final_state = state;
    result
}
