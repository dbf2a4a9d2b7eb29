//! Report output port trait.

use crate::domain::approval::ApprovalVerdict;
use crate::domain::error::StuntmanError;
use crate::domain::metrics::PerformanceReport;
use crate::domain::position::Trade;
use crate::domain::strategy::StrategyConfig;
use crate::domain::walk_forward::RollingWindowResult;

pub trait ReportPort {
    /// The closed-trade ledger, in closing order.
    fn write_trades(&self, trades: &[Trade]) -> Result<(), StuntmanError>;

    fn write_windows(&self, windows: &[RollingWindowResult]) -> Result<(), StuntmanError>;

    fn write_summary(
        &self,
        strategy: &StrategyConfig,
        report: &PerformanceReport,
        verdict: &ApprovalVerdict,
    ) -> Result<(), StuntmanError>;
}
