//! Strategy configuration and signal selection.

use serde::{Deserialize, Serialize};

use crate::domain::approval::ApprovalThresholds;
use crate::domain::backtest::BacktestConfig;
use crate::domain::cost::CostConfig;
use crate::domain::error::StuntmanError;
use crate::domain::execution::ExecutionConfig;
use crate::domain::indicator_set::IndicatorConfig;
use crate::domain::instrument::Instrument;
use crate::domain::pattern::{
    EnsembleVoter, PatternContext, PatternParams, PatternRegistry, build_pattern,
};
use crate::domain::regime::RegimeConfig;
use crate::domain::signal::Signal;
use crate::domain::walk_forward::WalkForwardConfig;

/// How the enabled patterns are combined into one signal per bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternPolicy {
    /// Patterns in declared order; the first in-scope match wins.
    FirstMatch,
    Ensemble,
}

impl PatternPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first_match" => Some(PatternPolicy::FirstMatch),
            "ensemble" => Some(PatternPolicy::Ensemble),
            _ => None,
        }
    }
}

/// Default priority order for first-match selection.
pub const DEFAULT_PATTERNS: [&str; 7] = [
    "session_low_reversal",
    "session_high_rejection",
    "macd_momentum",
    "ema_pullback",
    "vwap_reclaim",
    "opening_range_breakout",
    "bollinger_reversion",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    pub instrument: Instrument,
    pub indicators: IndicatorConfig,
    pub regime: RegimeConfig,
    pub policy: PatternPolicy,
    /// Enabled pattern ids, in priority order for first-match.
    pub patterns: Vec<String>,
    pub pattern_params: PatternParams,
    /// Ensemble only: votes needed on the winning side.
    pub min_agreement: usize,
    pub costs: CostConfig,
    pub execution: ExecutionConfig,
    pub backtest: BacktestConfig,
    pub walk_forward: WalkForwardConfig,
    pub approval: ApprovalThresholds,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            name: "default".to_string(),
            instrument: Instrument::default(),
            indicators: IndicatorConfig::default(),
            regime: RegimeConfig::default(),
            policy: PatternPolicy::FirstMatch,
            patterns: DEFAULT_PATTERNS.iter().map(|s| s.to_string()).collect(),
            pattern_params: PatternParams::default(),
            min_agreement: 3,
            costs: CostConfig::default(),
            execution: ExecutionConfig::default(),
            backtest: BacktestConfig::default(),
            walk_forward: WalkForwardConfig::default(),
            approval: ApprovalThresholds::default(),
        }
    }
}

enum SignalSource {
    FirstMatch(PatternRegistry),
    Ensemble(EnsembleVoter),
}

/// A configured strategy with its patterns instantiated.
pub struct Strategy {
    pub config: StrategyConfig,
    source: SignalSource,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy")
            .field("name", &self.config.name)
            .field("policy", &self.config.policy)
            .field("patterns", &self.config.patterns)
            .finish()
    }
}

impl Strategy {
    pub fn from_config(config: StrategyConfig) -> Result<Self, StuntmanError> {
        let params = &config.pattern_params;
        let mut patterns = Vec::with_capacity(config.patterns.len());
        for name in &config.patterns {
            let pattern = build_pattern(name, params).ok_or_else(|| {
                StuntmanError::invalid("patterns", "enabled", format!("unknown pattern '{}'", name))
            })?;
            patterns.push(pattern);
        }

        let source = match config.policy {
            PatternPolicy::FirstMatch => {
                let mut registry = PatternRegistry::new();
                for p in patterns {
                    registry.register(p);
                }
                SignalSource::FirstMatch(registry)
            }
            PatternPolicy::Ensemble => {
                let mut voter =
                    EnsembleVoter::new(config.min_agreement, params.stop_atr, params.target_atr);
                for p in patterns {
                    voter.insert(p);
                }
                SignalSource::Ensemble(voter)
            }
        };

        Ok(Strategy { config, source })
    }

    /// The one signal acted upon for this bar, if any.
    pub fn signal(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
        match &self.source {
            SignalSource::FirstMatch(registry) => registry.first_match(ctx),
            SignalSource::Ensemble(voter) => voter.decide(ctx),
        }
    }

    pub fn pattern_ids(&self) -> Vec<&str> {
        match &self.source {
            SignalSource::FirstMatch(registry) => registry.ids(),
            SignalSource::Ensemble(voter) => voter.ids(),
        }
    }
}
