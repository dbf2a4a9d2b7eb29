//! Open positions and closed trades.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::domain::candle::Candle;
use crate::domain::cost::CostBreakdown;
use crate::domain::regime::Regime;
use crate::domain::signal::Direction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub direction: Direction,
    pub contracts: u32,
    /// Fill price after entry slippage.
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
    pub entry_bar_index: usize,
    pub opened_at: DateTime<FixedOffset>,
    pub pattern: String,
    pub regime: Regime,
    pub entry_slippage_ticks: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == Direction::Short
    }

    pub fn unrealized_pnl(&self, price: f64, point_value: f64) -> f64 {
        (price - self.entry_price) * self.direction.sign() * self.contracts as f64 * point_value
    }

    pub fn stop_hit(&self, bar: &Candle) -> bool {
        match self.direction {
            Direction::Long => bar.low <= self.stop_price,
            Direction::Short => bar.high >= self.stop_price,
        }
    }

    pub fn target_hit(&self, bar: &Candle) -> bool {
        match self.direction {
            Direction::Long => bar.high >= self.target_price,
            Direction::Short => bar.low <= self.target_price,
        }
    }

    /// Reference price for a stop exit; a gap through the stop fills at the open.
    pub fn stop_fill(&self, bar: &Candle) -> f64 {
        match self.direction {
            Direction::Long if bar.open <= self.stop_price => bar.open,
            Direction::Short if bar.open >= self.stop_price => bar.open,
            _ => self.stop_price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    MaxHold,
    EndOfSession,
    EndOfData,
    Reversal,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "Stop Loss",
            ExitReason::TakeProfit => "Take Profit",
            ExitReason::MaxHold => "Max Hold",
            ExitReason::EndOfSession => "End Of Session",
            ExitReason::EndOfData => "End Of Data",
            ExitReason::Reversal => "Reversal",
        };
        f.write_str(s)
    }
}

/// A closed round trip. Append-only once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: Direction,
    pub contracts: u32,
    pub entry_price: f64,
    pub exit_price: f64,
    /// P&L from the slipped fills, before fees and spread.
    pub gross_pnl: f64,
    pub costs: CostBreakdown,
    pub net_pnl: f64,
    pub exit_reason: ExitReason,
    pub entry_time: DateTime<FixedOffset>,
    pub exit_time: DateTime<FixedOffset>,
    pub entry_bar_index: usize,
    pub exit_bar_index: usize,
    pub pattern: String,
    pub regime: Regime,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.net_pnl > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar_index.saturating_sub(self.entry_bar_index)
    }
}
