//! Performance statistics over a trade ledger.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::domain::position::Trade;
use crate::domain::walk_forward::RollingWindowResult;

/// Reported profit factor when there are winners but no losers.
pub const PROFIT_FACTOR_SENTINEL: f64 = 999.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyBasis {
    Windows,
    CalendarYears,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,
    /// Percent, 0-100.
    pub win_rate_pct: f64,
    pub profit_factor: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub net_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// Percent of peak equity, 0-100. Equity starts at the initial capital,
    /// so the same ledger shows a deeper drawdown on a smaller account and
    /// the drawdown approval threshold moves with it.
    pub max_drawdown_pct: f64,
    /// Fraction of periods with positive net P&L, 0-1.
    pub consistency: f64,
    pub consistency_basis: ConsistencyBasis,
    pub consistency_periods: usize,
}

impl PerformanceReport {
    /// Single-pass report; consistency is measured over calendar years of
    /// the trades' exit dates.
    pub fn from_trades(trades: &[Trade], initial_capital: f64) -> Self {
        let (consistency, periods) = yearly_consistency(trades);
        Self::build(
            trades.iter(),
            initial_capital,
            consistency,
            ConsistencyBasis::CalendarYears,
            periods,
        )
    }

    /// Walk-forward report over whole windows. Flagged partial windows are
    /// left out of every statistic. Each window is an independent run, so
    /// when windows overlap a trade in the shared bars is counted once per
    /// window that produced it.
    pub fn from_windows(windows: &[RollingWindowResult], initial_capital: f64) -> Self {
        let counted: Vec<&RollingWindowResult> = windows.iter().filter(|w| !w.partial).collect();
        let positive = counted.iter().filter(|w| w.net_pnl > 0.0).count();
        let consistency = ratio(positive, counted.len());
        Self::build(
            counted.iter().flat_map(|w| w.trades.iter()),
            initial_capital,
            consistency,
            ConsistencyBasis::Windows,
            counted.len(),
        )
    }

    fn build<'a>(
        trades: impl Iterator<Item = &'a Trade>,
        initial_capital: f64,
        consistency: f64,
        consistency_basis: ConsistencyBasis,
        consistency_periods: usize,
    ) -> Self {
        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut breakeven = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut equity_curve = vec![initial_capital];

        for trade in trades {
            let pnl = trade.net_pnl;
            if pnl > 0.0 {
                wins += 1;
                gross_profit += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                losses += 1;
                gross_loss += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                breakeven += 1;
            }
            let last = equity_curve[equity_curve.len() - 1];
            equity_curve.push(last + pnl);
        }

        let total_trades = wins + losses + breakeven;

        PerformanceReport {
            total_trades,
            wins,
            losses,
            breakeven,
            win_rate_pct: ratio(wins, total_trades) * 100.0,
            profit_factor: profit_factor(gross_profit, gross_loss),
            gross_profit,
            gross_loss,
            net_pnl: gross_profit - gross_loss,
            avg_win: if wins > 0 { gross_profit / wins as f64 } else { 0.0 },
            avg_loss: if losses > 0 { gross_loss / losses as f64 } else { 0.0 },
            largest_win,
            largest_loss,
            max_drawdown_pct: max_drawdown_pct(&equity_curve),
            consistency,
            consistency_basis,
            consistency_periods,
        }
    }
}

/// Gross profit over gross loss; [`PROFIT_FACTOR_SENTINEL`] with no losses
/// but some profit, 0 with neither.
pub fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        PROFIT_FACTOR_SENTINEL
    } else {
        0.0
    }
}

/// Largest peak-to-trough decline of the curve as a percent of the peak.
pub fn max_drawdown_pct(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &equity in equity_curve {
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - equity) / peak);
        }
    }
    max_dd * 100.0
}

fn yearly_consistency(trades: &[Trade]) -> (f64, usize) {
    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for trade in trades {
        *by_year.entry(trade.exit_time.year()).or_insert(0.0) += trade.net_pnl;
    }
    let positive = by_year.values().filter(|&&pnl| pnl > 0.0).count();
    (ratio(positive, by_year.len()), by_year.len())
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::cost::CostBreakdown;
    use crate::domain::position::{ExitReason, Trade};
    use crate::domain::regime::Regime;
    use crate::domain::signal::Direction;
    use chrono::{DateTime, FixedOffset};

    /// A trade closing on 1 July of `year` with the given net P&L.
    pub fn trade_in_year(net_pnl: f64, year: i32) -> Trade {
        let time = DateTime::parse_from_rfc3339(&format!("{year}-07-01T15:00:00-05:00")).unwrap();
        trade_at(net_pnl, time)
    }

    pub fn trade_at(net_pnl: f64, time: DateTime<FixedOffset>) -> Trade {
        Trade {
            direction: Direction::Long,
            contracts: 1,
            entry_price: 100.0,
            exit_price: 100.0 + net_pnl / 50.0,
            gross_pnl: net_pnl,
            costs: CostBreakdown::default(),
            net_pnl,
            exit_reason: ExitReason::TakeProfit,
            entry_time: time,
            exit_time: time,
            entry_bar_index: 0,
            exit_bar_index: 1,
            pattern: "test".into(),
            regime: Regime::Sideways,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::trade_in_year;
    use super::*;

    fn trades(pnls: &[f64]) -> Vec<Trade> {
        pnls.iter().map(|&p| trade_in_year(p, 2024)).collect()
    }

    fn window(index: usize, net: f64, partial: bool) -> RollingWindowResult {
        let t = trade_in_year(net, 2024);
        RollingWindowResult {
            index,
            window_start: index * 10,
            window_end: index * 10 + 10,
            start_time: t.entry_time,
            end_time: t.exit_time,
            partial,
            trades: vec![t],
            net_pnl: net,
            rejected: 0,
        }
    }

    #[test]
    fn no_trades_is_all_zero() {
        let report = PerformanceReport::from_trades(&[], 100_000.0);
        assert_eq!(report.total_trades, 0);
        assert_eq!(report.win_rate_pct, 0.0);
        assert_eq!(report.profit_factor, 0.0);
        assert_eq!(report.max_drawdown_pct, 0.0);
        assert_eq!(report.consistency, 0.0);
    }

    #[test]
    fn win_loss_statistics() {
        let report = PerformanceReport::from_trades(&trades(&[100.0, -50.0, 200.0, 0.0]), 1000.0);
        assert_eq!(report.wins, 2);
        assert_eq!(report.losses, 1);
        assert_eq!(report.breakeven, 1);
        assert!((report.win_rate_pct - 50.0).abs() < 1e-9);
        assert!((report.profit_factor - 6.0).abs() < 1e-9);
        assert!((report.avg_win - 150.0).abs() < 1e-9);
        assert!((report.avg_loss - 50.0).abs() < 1e-9);
        assert!((report.net_pnl - 250.0).abs() < 1e-9);
    }

    #[test]
    fn profit_factor_sentinel_without_losses() {
        let report = PerformanceReport::from_trades(&trades(&[10.0, 20.0]), 1000.0);
        assert_eq!(report.profit_factor, PROFIT_FACTOR_SENTINEL);
        assert_eq!(profit_factor(0.0, 0.0), 0.0);
    }

    #[test]
    fn drawdown_is_percent_of_peak() {
        let curve = [100.0, 110.0, 90.0, 95.0, 80.0, 100.0];
        assert!((max_drawdown_pct(&curve) - 30.0 / 110.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn drawdown_measured_on_capital_plus_pnl() {
        // 1000 -> 1100 -> 990: 10% off the peak
        let report = PerformanceReport::from_trades(&trades(&[100.0, -110.0]), 1000.0);
        assert!((report.max_drawdown_pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn same_ledger_deeper_drawdown_on_less_capital() {
        use crate::domain::approval::{ApprovalThresholds, Criterion, evaluate};

        let ledger = trades(&[100.0, -110.0]);
        let small = PerformanceReport::from_trades(&ledger, 1000.0);
        let large = PerformanceReport::from_trades(&ledger, 10_000.0);
        // 110 off a 10100 peak
        assert!((large.max_drawdown_pct - 110.0 / 10_100.0 * 100.0).abs() < 1e-9);
        assert!(small.max_drawdown_pct > large.max_drawdown_pct);
        assert_eq!(small.net_pnl, large.net_pnl);

        let thresholds = ApprovalThresholds {
            max_drawdown_pct: Some(5.0),
            ..ApprovalThresholds::default()
        };
        let verdict = |r: &PerformanceReport| evaluate(r, &thresholds);
        assert!(!verdict(&small).per_criterion[&Criterion::MaxDrawdown].passed);
        assert!(verdict(&large).per_criterion[&Criterion::MaxDrawdown].passed);
    }

    #[test]
    fn yearly_consistency_for_single_pass() {
        let ledger = vec![
            trade_in_year(100.0, 2022),
            trade_in_year(-50.0, 2023),
            trade_in_year(30.0, 2024),
            trade_in_year(-10.0, 2024),
        ];
        let report = PerformanceReport::from_trades(&ledger, 1000.0);
        assert_eq!(report.consistency_basis, ConsistencyBasis::CalendarYears);
        assert_eq!(report.consistency_periods, 3);
        assert!((report.consistency - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn window_consistency_ignores_flagged_partials() {
        let windows = vec![
            window(0, 100.0, false),
            window(1, -20.0, false),
            window(2, 50.0, false),
            window(3, 500.0, true),
        ];
        let report = PerformanceReport::from_windows(&windows, 1000.0);
        assert_eq!(report.consistency_basis, ConsistencyBasis::Windows);
        assert_eq!(report.consistency_periods, 3);
        assert!((report.consistency - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.total_trades, 3);
    }

    #[test]
    fn overlapping_windows_count_shared_trades_per_window() {
        let shared = trade_in_year(40.0, 2024);
        let mut first = window(0, 40.0, false);
        let mut second = window(1, 40.0, false);
        first.trades = vec![shared.clone()];
        second.trades = vec![shared];
        let report = PerformanceReport::from_windows(&[first, second], 1000.0);
        assert_eq!(report.total_trades, 2);
        assert!((report.net_pnl - 80.0).abs() < 1e-9);
    }
}
