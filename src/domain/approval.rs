//! Pass/fail gate over a performance report.
//!
//! Every configured threshold must hold; an unset threshold is skipped and
//! does not appear in the breakdown. Comparisons are inclusive.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::metrics::PerformanceReport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalThresholds {
    /// Percent, 0-100.
    pub min_win_rate_pct: Option<f64>,
    pub min_profit_factor: Option<f64>,
    /// Percent, 0-100.
    pub max_drawdown_pct: Option<f64>,
    pub min_trades: Option<usize>,
    /// Fraction, 0-1.
    pub min_consistency: Option<f64>,
}

impl Default for ApprovalThresholds {
    fn default() -> Self {
        ApprovalThresholds {
            min_win_rate_pct: Some(55.0),
            min_profit_factor: Some(1.3),
            max_drawdown_pct: Some(20.0),
            min_trades: Some(50),
            min_consistency: Some(0.7),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Criterion {
    #[serde(rename = "minWinRate")]
    MinWinRate,
    #[serde(rename = "minProfitFactor")]
    MinProfitFactor,
    #[serde(rename = "maxDrawdown")]
    MaxDrawdown,
    #[serde(rename = "minTrades")]
    MinTrades,
    #[serde(rename = "minConsistency")]
    MinConsistency,
}

impl Criterion {
    pub fn name(self) -> &'static str {
        match self {
            Criterion::MinWinRate => "minWinRate",
            Criterion::MinProfitFactor => "minProfitFactor",
            Criterion::MaxDrawdown => "maxDrawdown",
            Criterion::MinTrades => "minTrades",
            Criterion::MinConsistency => "minConsistency",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriterionCheck {
    pub passed: bool,
    pub actual: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalVerdict {
    pub passed: bool,
    pub per_criterion: BTreeMap<Criterion, CriterionCheck>,
    /// One line per failed criterion.
    pub reasons: Vec<String>,
}

impl ApprovalVerdict {
    pub fn failed(&self) -> impl Iterator<Item = Criterion> + '_ {
        self.per_criterion
            .iter()
            .filter(|(_, c)| !c.passed)
            .map(|(&k, _)| k)
    }
}

pub fn evaluate(report: &PerformanceReport, thresholds: &ApprovalThresholds) -> ApprovalVerdict {
    let mut per_criterion = BTreeMap::new();
    let mut check = |criterion, actual: f64, threshold: Option<f64>, at_least: bool| {
        if let Some(threshold) = threshold {
            let passed = if at_least {
                actual >= threshold
            } else {
                actual <= threshold
            };
            per_criterion.insert(
                criterion,
                CriterionCheck {
                    passed,
                    actual,
                    threshold,
                },
            );
        }
    };

    check(
        Criterion::MinWinRate,
        report.win_rate_pct,
        thresholds.min_win_rate_pct,
        true,
    );
    check(
        Criterion::MinProfitFactor,
        report.profit_factor,
        thresholds.min_profit_factor,
        true,
    );
    check(
        Criterion::MaxDrawdown,
        report.max_drawdown_pct,
        thresholds.max_drawdown_pct,
        false,
    );
    check(
        Criterion::MinTrades,
        report.total_trades as f64,
        thresholds.min_trades.map(|n| n as f64),
        true,
    );
    check(
        Criterion::MinConsistency,
        report.consistency,
        thresholds.min_consistency,
        true,
    );

    let reasons: Vec<String> = per_criterion
        .iter()
        .filter(|(_, c)| !c.passed)
        .map(|(k, c)| match k {
            Criterion::MaxDrawdown => {
                format!("{}: {:.2} is above {:.2}", k, c.actual, c.threshold)
            }
            _ => format!("{}: {:.2} is below {:.2}", k, c.actual, c.threshold),
        })
        .collect();

    ApprovalVerdict {
        passed: reasons.is_empty(),
        per_criterion,
        reasons,
    }
}
