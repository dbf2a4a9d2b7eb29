//! Per-pattern outcome tallies carried across sessions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::position::Trade;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternStats {
    pub trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub net_pnl: f64,
}

impl PatternStats {
    /// Fraction of trades won; 0 with no trades.
    pub fn win_rate(&self) -> f64 {
        if self.trades == 0 {
            0.0
        } else {
            self.wins as f64 / self.trades as f64
        }
    }

    pub fn avg_pnl(&self) -> f64 {
        if self.trades == 0 {
            0.0
        } else {
            self.net_pnl / self.trades as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnedParameters {
    /// Keyed by the signal's pattern id.
    pub patterns: BTreeMap<String, PatternStats>,
    /// Ledgers folded in so far.
    pub sessions: u32,
}

impl LearnedParameters {
    /// Fold one session's ledger into the tallies.
    pub fn record(&mut self, trades: &[Trade]) {
        for trade in trades {
            let stats = self.patterns.entry(trade.pattern.clone()).or_default();
            stats.trades += 1;
            if trade.net_pnl > 0.0 {
                stats.wins += 1;
            } else if trade.net_pnl < 0.0 {
                stats.losses += 1;
            }
            stats.net_pnl += trade.net_pnl;
        }
        self.sessions += 1;
    }

    pub fn stats(&self, pattern: &str) -> Option<&PatternStats> {
        self.patterns.get(pattern)
    }
}
