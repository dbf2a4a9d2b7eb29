//! File report adapter: `trades.csv`, `windows.csv` and `report.json`.

use crate::domain::approval::ApprovalVerdict;
use crate::domain::error::StuntmanError;
use crate::domain::metrics::PerformanceReport;
use crate::domain::position::Trade;
use crate::domain::strategy::StrategyConfig;
use crate::domain::walk_forward::RollingWindowResult;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub struct FileReportAdapter {
    dir: PathBuf,
}

impl FileReportAdapter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<(), StuntmanError> {
        fs::create_dir_all(&self.dir).map_err(|e| StuntmanError::Report {
            reason: format!("failed to create {}: {}", self.dir.display(), e),
        })
    }

    fn write_csv<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<(), StuntmanError> {
        self.ensure_dir()?;
        let path = self.dir.join(name);
        let report_err = |e: csv::Error| StuntmanError::Report {
            reason: format!("failed to write {}: {}", path.display(), e),
        };
        let mut wtr = csv::Writer::from_path(&path).map_err(report_err)?;
        for row in rows {
            wtr.serialize(row).map_err(report_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// One ledger line; the cost breakdown is flattened into columns.
#[derive(Serialize)]
struct TradeRow<'a> {
    entry_time: String,
    exit_time: String,
    direction: String,
    contracts: u32,
    entry_price: f64,
    exit_price: f64,
    gross_pnl: f64,
    commission: f64,
    exchange_fee: f64,
    regulatory_fee: f64,
    spread: f64,
    slippage: f64,
    net_pnl: f64,
    exit_reason: String,
    pattern: &'a str,
    regime: String,
    bars_held: usize,
}

impl<'a> From<&'a Trade> for TradeRow<'a> {
    fn from(t: &'a Trade) -> Self {
        TradeRow {
            entry_time: t.entry_time.to_rfc3339(),
            exit_time: t.exit_time.to_rfc3339(),
            direction: t.direction.to_string(),
            contracts: t.contracts,
            entry_price: t.entry_price,
            exit_price: t.exit_price,
            gross_pnl: t.gross_pnl,
            commission: t.costs.commission,
            exchange_fee: t.costs.exchange_fee,
            regulatory_fee: t.costs.regulatory_fee,
            spread: t.costs.spread,
            slippage: t.costs.slippage,
            net_pnl: t.net_pnl,
            exit_reason: t.exit_reason.to_string(),
            pattern: &t.pattern,
            regime: t.regime.to_string(),
            bars_held: t.bars_held(),
        }
    }
}

#[derive(Serialize)]
struct WindowRow {
    index: usize,
    window_start: usize,
    window_end: usize,
    start_time: String,
    end_time: String,
    partial: bool,
    trades: usize,
    net_pnl: f64,
    rejected: usize,
}

impl From<&RollingWindowResult> for WindowRow {
    fn from(w: &RollingWindowResult) -> Self {
        WindowRow {
            index: w.index,
            window_start: w.window_start,
            window_end: w.window_end,
            start_time: w.start_time.to_rfc3339(),
            end_time: w.end_time.to_rfc3339(),
            partial: w.partial,
            trades: w.trades.len(),
            net_pnl: w.net_pnl,
            rejected: w.rejected,
        }
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    strategy: &'a StrategyConfig,
    report: &'a PerformanceReport,
    verdict: &'a ApprovalVerdict,
}

impl ReportPort for FileReportAdapter {
    fn write_trades(&self, trades: &[Trade]) -> Result<(), StuntmanError> {
        let rows: Vec<TradeRow<'_>> = trades.iter().map(TradeRow::from).collect();
        self.write_csv("trades.csv", &rows)
    }

    fn write_windows(&self, windows: &[RollingWindowResult]) -> Result<(), StuntmanError> {
        let rows: Vec<WindowRow> = windows.iter().map(WindowRow::from).collect();
        self.write_csv("windows.csv", &rows)
    }

    fn write_summary(
        &self,
        strategy: &StrategyConfig,
        report: &PerformanceReport,
        verdict: &ApprovalVerdict,
    ) -> Result<(), StuntmanError> {
        self.ensure_dir()?;
        let summary = Summary {
            strategy,
            report,
            verdict,
        };
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(self.dir.join("report.json"), json)?;
        Ok(())
    }
}
