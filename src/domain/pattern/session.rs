//! Universal session-extreme reversal patterns.

use crate::domain::pattern::{Pattern, PatternContext, PatternParams};
use crate::domain::signal::{Direction, Signal};

const CONFIDENCE: f64 = 0.6;

/// Bar tags the session low and closes bullish in the upper half of its range.
pub struct SessionLowReversal(pub PatternParams);

impl Pattern for SessionLowReversal {
    fn id(&self) -> &str {
        "session_low_reversal"
    }

    fn evaluate(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
        let atr = ctx.snapshot.atr?;
        let session = ctx.session_bars();
        let (bar, prior) = session.split_last()?;
        let session_low = prior.iter().map(|b| b.low).reduce(f64::min)?;

        let at_low = bar.low <= session_low + self.0.touch_tolerance_atr * atr;
        let strong_close = bar.close > (bar.high + bar.low) / 2.0;
        if !(at_low && bar.is_bullish() && strong_close) {
            return None;
        }

        Some(Signal::with_atr_bracket(
            self.id(),
            Direction::Long,
            bar.close,
            atr,
            self.0.stop_atr,
            self.0.target_atr,
            CONFIDENCE,
            ctx.regime,
            format!("bullish close at session low {:.2}", session_low),
        ))
    }
}

/// Bar tags the session high and closes bearish in the lower half of its range.
pub struct SessionHighRejection(pub PatternParams);

impl Pattern for SessionHighRejection {
    fn id(&self) -> &str {
        "session_high_rejection"
    }

    fn evaluate(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
        let atr = ctx.snapshot.atr?;
        let session = ctx.session_bars();
        let (bar, prior) = session.split_last()?;
        let session_high = prior.iter().map(|b| b.high).reduce(f64::max)?;

        let at_high = bar.high >= session_high - self.0.touch_tolerance_atr * atr;
        let weak_close = bar.close < (bar.high + bar.low) / 2.0;
        if !(at_high && bar.is_bearish() && weak_close) {
            return None;
        }

        Some(Signal::with_atr_bracket(
            self.id(),
            Direction::Short,
            bar.close,
            atr,
            self.0.stop_atr,
            self.0.target_atr,
            CONFIDENCE,
            ctx.regime,
            format!("bearish rejection at session high {:.2}", session_high),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::candle;
    use crate::domain::indicator_set::IndicatorSnapshot;
    use crate::domain::pattern::test_support::{ctx, with_atr};
    use crate::domain::regime::Regime;

    #[test]
    fn session_low_reversal_fires_on_bullish_close_at_low() {
        let bars = vec![
            candle(0, 100.0, 101.0, 99.0, 100.0, 1000.0),
            candle(1, 100.0, 100.5, 98.0, 98.5, 1000.0),
            candle(2, 98.2, 99.5, 97.9, 99.4, 1000.0),
        ];
        let c = ctx(&bars, with_atr(1.0), IndicatorSnapshot::default(), Regime::Down);
        let sig = SessionLowReversal(PatternParams::default())
            .evaluate(&c)
            .unwrap();
        assert_eq!(sig.direction, Direction::Long);
        assert!((sig.entry_price - 99.4).abs() < f64::EPSILON);
        assert!(sig.stop_price < sig.entry_price && sig.target_price > sig.entry_price);
        assert_eq!(sig.regime, Regime::Down);
    }

    #[test]
    fn session_low_reversal_needs_bullish_bar() {
        let bars = vec![
            candle(0, 100.0, 101.0, 99.0, 100.0, 1000.0),
            candle(1, 99.4, 99.5, 97.9, 98.2, 1000.0),
        ];
        let c = ctx(&bars, with_atr(1.0), IndicatorSnapshot::default(), Regime::Sideways);
        assert!(SessionLowReversal(PatternParams::default()).evaluate(&c).is_none());
    }

    #[test]
    fn undefined_atr_is_no_signal() {
        let bars = vec![
            candle(0, 100.0, 101.0, 99.0, 100.0, 1000.0),
            candle(1, 98.2, 99.5, 97.9, 99.4, 1000.0),
        ];
        let c = ctx(
            &bars,
            IndicatorSnapshot::default(),
            IndicatorSnapshot::default(),
            Regime::Sideways,
        );
        assert!(SessionLowReversal(PatternParams::default()).evaluate(&c).is_none());
    }

    #[test]
    fn first_bar_of_session_is_no_signal() {
        let bars = vec![candle(0, 98.2, 99.5, 97.9, 99.4, 1000.0)];
        let c = ctx(&bars, with_atr(1.0), IndicatorSnapshot::default(), Regime::Sideways);
        assert!(SessionLowReversal(PatternParams::default()).evaluate(&c).is_none());
    }

    #[test]
    fn session_high_rejection_fires_short() {
        let bars = vec![
            candle(0, 100.0, 101.0, 99.0, 100.5, 1000.0),
            candle(1, 101.0, 101.2, 100.0, 100.2, 1000.0),
        ];
        let c = ctx(&bars, with_atr(1.0), IndicatorSnapshot::default(), Regime::Up);
        let sig = SessionHighRejection(PatternParams::default())
            .evaluate(&c)
            .unwrap();
        assert_eq!(sig.direction, Direction::Short);
        assert!(sig.is_well_formed());
    }
}
