//! Single-position execution simulator.
//!
//! Per bar, in order:
//! 1. exit check for an open position (from the bar after entry): stop loss,
//!    take profit, max holding bars exceeded, end of session / end of data;
//! 2. reversal: an opposite signal above the reversal confidence closes the
//!    position and may re-open the other way on the same bar;
//! 3. entry: when flat, subject to session timing, the daily trade cap, the
//!    daily loss kill switch, the equity drawdown stop and the cost model's
//!    rejection draw.
//!
//! Stop loss is checked before take profit, so a bar that spans both exits
//! on the stop.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::backtest::DEFAULT_INITIAL_CAPITAL;
use crate::domain::candle::{Candle, is_session_last_bar};
use crate::domain::cost::CostModel;
use crate::domain::position::{ExitReason, Position, Trade};
use crate::domain::signal::Signal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Contracts per entry, capped at `max_contracts`.
    pub contracts: u32,
    pub max_contracts: u32,
    /// A position held longer than this many bars is closed.
    pub max_hold_bars: Option<usize>,
    pub max_trades_per_day: Option<u32>,
    /// Stop opening positions for the day once realized net P&L is at or
    /// below minus this amount.
    pub max_daily_loss: Option<f64>,
    /// Opposite signals at or above this confidence reverse the position.
    pub reversal_min_confidence: Option<f64>,
    /// Exchange-time hour from which positions are closed and entries blocked.
    pub flatten_hour: Option<u32>,
    /// Halt all further entries once equity is this many percent below its
    /// peak.
    pub auto_stop_drawdown_pct: Option<f64>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            contracts: 1,
            max_contracts: 5,
            max_hold_bars: Some(24),
            max_trades_per_day: Some(3),
            max_daily_loss: Some(1500.0),
            reversal_min_confidence: None,
            flatten_hour: None,
            auto_stop_drawdown_pct: Some(80.0),
        }
    }
}

impl ExecutionConfig {
    pub fn effective_contracts(&self) -> u32 {
        self.contracts.min(self.max_contracts)
    }
}

/// Everything the simulator carries from one bar to the next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradingState {
    pub position: Option<Position>,
    /// Trades closed per exchange date.
    pub trades_closed: BTreeMap<NaiveDate, u32>,
    /// Realized net P&L per exchange date.
    pub realized_pnl: BTreeMap<NaiveDate, f64>,
    /// Realized net P&L since the state was created.
    #[serde(default)]
    pub cumulative_pnl: f64,
    /// Highest value `cumulative_pnl` has reached, starting from zero.
    #[serde(default)]
    pub peak_pnl: f64,
}

impl TradingState {
    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn trades_closed_on(&self, date: NaiveDate) -> u32 {
        self.trades_closed.get(&date).copied().unwrap_or(0)
    }

    pub fn realized_on(&self, date: NaiveDate) -> f64 {
        self.realized_pnl.get(&date).copied().unwrap_or(0.0)
    }

    /// Percent decline of `capital + cumulative_pnl` from its peak.
    pub fn drawdown_pct(&self, capital: f64) -> f64 {
        let peak = capital + self.peak_pnl;
        if peak <= 0.0 {
            return 100.0;
        }
        ((self.peak_pnl - self.cumulative_pnl) / peak * 100.0).max(0.0)
    }

    fn record(&mut self, trade: &Trade) {
        let date = trade.exit_time.date_naive();
        *self.trades_closed.entry(date).or_insert(0) += 1;
        *self.realized_pnl.entry(date).or_insert(0.0) += trade.net_pnl;
        self.cumulative_pnl += trade.net_pnl;
        self.peak_pnl = self.peak_pnl.max(self.cumulative_pnl);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryBlock {
    /// Last bar of the session or past the flatten hour.
    SessionClosing,
    TradeCap,
    DailyLossLimit,
    /// Equity drawdown reached `auto_stop_drawdown_pct`; stays blocked.
    DrawdownStop,
    ZeroContracts,
}

/// What happened to the bar's signal, if there was one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    NoSignal,
    /// A position was already open and the signal did not reverse it.
    Ignored,
    Opened,
    Rejected,
    Blocked(EntryBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Trades closed on this bar, in closing order (at most two with reversal).
    pub closed: Vec<Trade>,
    pub entry: EntryOutcome,
}

#[derive(Debug, Clone)]
pub struct PositionStateMachine {
    pub config: ExecutionConfig,
    pub costs: CostModel,
    /// Account equity the drawdown stop is measured against.
    pub capital: f64,
}

impl PositionStateMachine {
    pub fn new(config: ExecutionConfig, costs: CostModel) -> Self {
        PositionStateMachine {
            config,
            costs,
            capital: DEFAULT_INITIAL_CAPITAL,
        }
    }

    pub fn with_capital(mut self, capital: f64) -> Self {
        self.capital = capital;
        self
    }

    /// Advance `state` through bar `index`.
    ///
    /// `volatility` drives slippage (normally ATR); the bar range is used
    /// while it is undefined.
    pub fn step<R: Rng + ?Sized>(
        &self,
        state: &mut TradingState,
        candles: &[Candle],
        index: usize,
        volatility: Option<f64>,
        signal: Option<&Signal>,
        rng: &mut R,
    ) -> StepOutcome {
        let bar = &candles[index];
        let volatility = volatility.unwrap_or_else(|| bar.range());
        let end_of_data = index + 1 == candles.len();
        let session_closing = is_session_last_bar(candles, index)
            || self.config.flatten_hour.is_some_and(|h| bar.hour() >= h);

        let mut closed = Vec::new();

        if let Some(position) = state.position.take() {
            match self.exit_reason(&position, bar, index, session_closing, end_of_data) {
                Some((reason, reference)) => {
                    let trade =
                        self.close(position, bar, index, reason, reference, volatility, rng);
                    state.record(&trade);
                    closed.push(trade);
                }
                None => state.position = Some(position),
            }
        }

        let Some(signal) = signal else {
            return StepOutcome {
                closed,
                entry: EntryOutcome::NoSignal,
            };
        };

        if let Some(position) = state.position.take() {
            if !self.reverses(&position, signal) {
                state.position = Some(position);
                return StepOutcome {
                    closed,
                    entry: EntryOutcome::Ignored,
                };
            }
            let trade = self.close(
                position,
                bar,
                index,
                ExitReason::Reversal,
                bar.close,
                volatility,
                rng,
            );
            state.record(&trade);
            closed.push(trade);
        }

        let entry = self.try_enter(state, bar, index, session_closing, volatility, signal, rng);
        StepOutcome { closed, entry }
    }

    fn exit_reason(
        &self,
        position: &Position,
        bar: &Candle,
        index: usize,
        session_closing: bool,
        end_of_data: bool,
    ) -> Option<(ExitReason, f64)> {
        // by time: a resumed position's index may belong to another series
        if bar.time <= position.opened_at {
            return None;
        }
        if position.stop_hit(bar) {
            return Some((ExitReason::StopLoss, position.stop_fill(bar)));
        }
        if position.target_hit(bar) {
            return Some((ExitReason::TakeProfit, position.target_price));
        }
        let held = index.saturating_sub(position.entry_bar_index);
        if self.config.max_hold_bars.is_some_and(|max| held > max) {
            return Some((ExitReason::MaxHold, bar.close));
        }
        if end_of_data {
            return Some((ExitReason::EndOfData, bar.close));
        }
        if session_closing {
            return Some((ExitReason::EndOfSession, bar.close));
        }
        None
    }

    fn reverses(&self, position: &Position, signal: &Signal) -> bool {
        signal.direction != position.direction
            && self
                .config
                .reversal_min_confidence
                .is_some_and(|min| signal.confidence >= min)
    }

    #[allow(clippy::too_many_arguments)]
    fn try_enter<R: Rng + ?Sized>(
        &self,
        state: &mut TradingState,
        bar: &Candle,
        index: usize,
        session_closing: bool,
        volatility: f64,
        signal: &Signal,
        rng: &mut R,
    ) -> EntryOutcome {
        let date = bar.date();
        if session_closing {
            return EntryOutcome::Blocked(EntryBlock::SessionClosing);
        }
        if self
            .config
            .max_trades_per_day
            .is_some_and(|cap| state.trades_closed_on(date) >= cap)
        {
            return EntryOutcome::Blocked(EntryBlock::TradeCap);
        }
        if self
            .config
            .max_daily_loss
            .is_some_and(|limit| state.realized_on(date) <= -limit)
        {
            return EntryOutcome::Blocked(EntryBlock::DailyLossLimit);
        }
        if self
            .config
            .auto_stop_drawdown_pct
            .is_some_and(|limit| state.drawdown_pct(self.capital) >= limit)
        {
            return EntryOutcome::Blocked(EntryBlock::DrawdownStop);
        }
        let contracts = self.config.effective_contracts();
        if contracts == 0 {
            return EntryOutcome::Blocked(EntryBlock::ZeroContracts);
        }
        if self.costs.rejects(rng) {
            tracing::debug!(index, pattern = %signal.pattern_id, "entry rejected");
            return EntryOutcome::Rejected;
        }

        let ticks = self.costs.slippage_ticks(volatility, rng);
        let entry_price = self
            .costs
            .adverse_fill(signal.entry_price, signal.direction, ticks);

        state.position = Some(Position {
            direction: signal.direction,
            contracts,
            entry_price,
            stop_price: signal.stop_price,
            target_price: signal.target_price,
            entry_bar_index: index,
            opened_at: bar.time,
            pattern: signal.pattern_id.clone(),
            regime: signal.regime,
            entry_slippage_ticks: ticks,
        });
        EntryOutcome::Opened
    }

    #[allow(clippy::too_many_arguments)]
    fn close<R: Rng + ?Sized>(
        &self,
        position: Position,
        bar: &Candle,
        index: usize,
        reason: ExitReason,
        reference: f64,
        volatility: f64,
        rng: &mut R,
    ) -> Trade {
        let exit_ticks = self.costs.slippage_ticks(volatility, rng);
        let exit_price =
            self.costs
                .adverse_fill(reference, position.direction.opposite(), exit_ticks);

        let gross_pnl = position.unrealized_pnl(exit_price, self.costs.instrument.point_value);
        let costs = self.costs.round_trip(
            position.contracts,
            position.entry_slippage_ticks + exit_ticks,
        );
        let net_pnl = gross_pnl - costs.charged();

        tracing::debug!(
            index,
            pattern = %position.pattern,
            direction = %position.direction,
            reason = %reason,
            net_pnl,
            "trade closed"
        );

        Trade {
            direction: position.direction,
            contracts: position.contracts,
            entry_price: position.entry_price,
            exit_price,
            gross_pnl,
            costs,
            net_pnl,
            exit_reason: reason,
            entry_time: position.opened_at,
            exit_time: bar.time,
            entry_bar_index: position.entry_bar_index,
            exit_bar_index: index,
            pattern: position.pattern,
            regime: position.regime,
        }
    }
}
