//! Rule-based entry patterns.
//!
//! A pattern is a named pure predicate over the current bar, its indicator
//! snapshot, recent history and the regime. Patterns are composed either by
//! an ordered [`PatternRegistry`] (first match wins) or an [`EnsembleVoter`]
//! (directional majority with a minimum agreement).

pub mod breakout;
pub mod registry;
pub mod session;
pub mod trend;
pub mod voters;

pub use registry::{EnsembleVoter, PatternRegistry};

use serde::{Deserialize, Serialize};

use crate::domain::candle::{Candle, session_start};
use crate::domain::indicator_set::IndicatorSnapshot;
use crate::domain::regime::Regime;
use crate::domain::signal::Signal;

/// Which regimes a pattern is evaluated in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternScope {
    Universal,
    Regimes(Vec<Regime>),
}

impl PatternScope {
    pub fn admits(&self, regime: Regime) -> bool {
        match self {
            PatternScope::Universal => true,
            PatternScope::Regimes(set) => set.contains(&regime),
        }
    }

    pub fn trending() -> Self {
        PatternScope::Regimes(vec![
            Regime::StrongUp,
            Regime::Up,
            Regime::Down,
            Regime::StrongDown,
        ])
    }
}

/// Everything a pattern may look at for bar `index`. Nothing after `index`.
#[derive(Debug, Clone, Copy)]
pub struct PatternContext<'a> {
    candles: &'a [Candle],
    pub index: usize,
    pub snapshot: IndicatorSnapshot,
    /// Snapshot of the previous bar; all undefined at index 0.
    pub previous: IndicatorSnapshot,
    pub regime: Regime,
}

impl<'a> PatternContext<'a> {
    pub fn new(
        candles: &'a [Candle],
        index: usize,
        snapshot: IndicatorSnapshot,
        previous: IndicatorSnapshot,
        regime: Regime,
    ) -> Self {
        PatternContext {
            candles: &candles[..=index],
            index,
            snapshot,
            previous,
            regime,
        }
    }

    pub fn bar(&self) -> &'a Candle {
        &self.candles[self.index]
    }

    pub fn prev_bar(&self) -> Option<&'a Candle> {
        self.index.checked_sub(1).map(|i| &self.candles[i])
    }

    /// Bars of the current session up to and including the current bar.
    pub fn session_bars(&self) -> &'a [Candle] {
        &self.candles[session_start(self.candles, self.index)..]
    }

    /// The last `n` bars ending at the current bar (fewer near the start).
    pub fn recent(&self, n: usize) -> &'a [Candle] {
        let start = (self.index + 1).saturating_sub(n);
        &self.candles[start..]
    }
}

pub trait Pattern: Send + Sync {
    fn id(&self) -> &str;

    fn scope(&self) -> PatternScope {
        PatternScope::Universal
    }

    fn evaluate(&self, ctx: &PatternContext<'_>) -> Option<Signal>;

    /// -1, 0 or +1 for ensemble voting.
    fn vote(&self, ctx: &PatternContext<'_>) -> i8 {
        match self.evaluate(ctx) {
            Some(signal) => signal.direction.sign() as i8,
            None => 0,
        }
    }
}

/// Tunables shared by the built-in patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternParams {
    pub stop_atr: f64,
    pub target_atr: f64,
    /// Distance, in ATRs, that still counts as touching a level.
    pub touch_tolerance_atr: f64,
    pub opening_range_bars: usize,
    /// ORB target as a fraction of the opening range height.
    pub orb_target_fraction: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// Bollinger reversion fires at or beyond these %B levels.
    pub bb_lower_pct_b: f64,
    pub bb_upper_pct_b: f64,
    pub min_adx: f64,
}

impl Default for PatternParams {
    fn default() -> Self {
        PatternParams {
            stop_atr: 1.5,
            target_atr: 3.0,
            touch_tolerance_atr: 0.25,
            opening_range_bars: 6,
            orb_target_fraction: 0.5,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            bb_lower_pct_b: 0.0,
            bb_upper_pct_b: 1.0,
            min_adx: 25.0,
        }
    }
}

pub const PATTERN_NAMES: [&str; 12] = [
    "session_low_reversal",
    "session_high_rejection",
    "ema_pullback",
    "vwap_reclaim",
    "opening_range_breakout",
    "bollinger_reversion",
    "macd_momentum",
    "rsi",
    "macd",
    "vwap",
    "ema_alignment",
    "adx_di",
];

/// Instantiate a built-in pattern by name.
pub fn build_pattern(name: &str, params: &PatternParams) -> Option<Box<dyn Pattern>> {
    let p = params.clone();
    let pattern: Box<dyn Pattern> = match name {
        "session_low_reversal" => Box::new(session::SessionLowReversal(p)),
        "session_high_rejection" => Box::new(session::SessionHighRejection(p)),
        "ema_pullback" => Box::new(trend::EmaPullback(p)),
        "vwap_reclaim" => Box::new(trend::VwapReclaim(p)),
        "macd_momentum" => Box::new(trend::MacdMomentum(p)),
        "opening_range_breakout" => Box::new(breakout::OpeningRangeBreakout(p)),
        "bollinger_reversion" => Box::new(breakout::BollingerReversion(p)),
        "rsi" => Box::new(voters::RsiVoter(p)),
        "macd" => Box::new(voters::MacdVoter(p)),
        "vwap" => Box::new(voters::VwapVoter(p)),
        "ema_alignment" => Box::new(voters::EmaAlignmentVoter(p)),
        "adx_di" => Box::new(voters::AdxDiVoter(p)),
        _ => return None,
    };
    Some(pattern)
}
