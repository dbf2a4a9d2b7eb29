//! Range patterns: opening-range breakout and Bollinger mean reversion.

use crate::domain::pattern::{Pattern, PatternContext, PatternParams, PatternScope};
use crate::domain::regime::Regime;
use crate::domain::signal::{Direction, Signal};

/// First close outside the session's opening range.
///
/// Stop at the range midpoint, target a fraction of the range height beyond
/// the entry. Long breakouts are skipped in STRONG_DOWN and short ones in
/// STRONG_UP.
pub struct OpeningRangeBreakout(pub PatternParams);

impl Pattern for OpeningRangeBreakout {
    fn id(&self) -> &str {
        "opening_range_breakout"
    }

    fn evaluate(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
        let n = self.0.opening_range_bars;
        let session = ctx.session_bars();
        if n == 0 || session.len() <= n {
            return None;
        }

        let opening = &session[..n];
        let or_high = opening.iter().map(|b| b.high).reduce(f64::max)?;
        let or_low = opening.iter().map(|b| b.low).reduce(f64::min)?;
        let height = or_high - or_low;
        if height <= 0.0 {
            return None;
        }

        let bar = ctx.bar();
        let prev_close = session[session.len() - 2].close;
        let direction = if bar.close > or_high && prev_close <= or_high {
            Direction::Long
        } else if bar.close < or_low && prev_close >= or_low {
            Direction::Short
        } else {
            return None;
        };

        let against_strong_trend = matches!(
            (direction, ctx.regime),
            (Direction::Long, Regime::StrongDown) | (Direction::Short, Regime::StrongUp)
        );
        if against_strong_trend {
            return None;
        }

        let sign = direction.sign();
        Some(Signal {
            pattern_id: self.id().to_string(),
            direction,
            entry_price: bar.close,
            stop_price: (or_high + or_low) / 2.0,
            target_price: bar.close + sign * self.0.orb_target_fraction * height,
            confidence: 0.65,
            regime: ctx.regime,
            reason: format!("{} break of opening range {:.2}-{:.2}", direction, or_low, or_high),
        })
    }
}

/// Fade a close outside the Bollinger bands with RSI confirmation, targeting
/// the middle band. Only in SIDEWAYS.
pub struct BollingerReversion(pub PatternParams);

impl Pattern for BollingerReversion {
    fn id(&self) -> &str {
        "bollinger_reversion"
    }

    fn scope(&self) -> PatternScope {
        PatternScope::Regimes(vec![Regime::Sideways])
    }

    fn evaluate(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
        let atr = ctx.snapshot.atr?;
        let percent_b = ctx.snapshot.bb_percent_b?;
        let middle = ctx.snapshot.bb_middle?;
        let rsi = ctx.snapshot.rsi?;
        let close = ctx.bar().close;

        let direction = if percent_b <= self.0.bb_lower_pct_b && rsi <= self.0.rsi_oversold {
            Direction::Long
        } else if percent_b >= self.0.bb_upper_pct_b && rsi >= self.0.rsi_overbought {
            Direction::Short
        } else {
            return None;
        };

        let signal = Signal {
            pattern_id: self.id().to_string(),
            direction,
            entry_price: close,
            stop_price: close - direction.sign() * self.0.stop_atr * atr,
            target_price: middle,
            confidence: 0.55,
            regime: ctx.regime,
            reason: format!("%B {:.2} with RSI {:.1}, reverting to {:.2}", percent_b, rsi, middle),
        };
        signal.is_well_formed().then_some(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Candle;
    use crate::domain::indicator::test_support::candle;
    use crate::domain::indicator_set::IndicatorSnapshot;
    use crate::domain::pattern::test_support::{ctx, with_atr};

    fn opening_session(last_close: f64) -> Vec<Candle> {
        let mut bars: Vec<Candle> = (0..3)
            .map(|i| candle(i, 100.0, 102.0, 98.0, 100.0, 1000.0))
            .collect();
        bars.push(candle(3, 100.0, 101.5, 99.0, 101.0, 1000.0));
        bars.push(candle(4, 101.0, 104.0, 100.5, last_close, 1000.0));
        bars
    }

    fn params() -> PatternParams {
        PatternParams {
            opening_range_bars: 3,
            ..PatternParams::default()
        }
    }

    #[test]
    fn orb_long_breakout_uses_structural_bracket() {
        let bars = opening_session(103.0);
        let c = ctx(&bars, IndicatorSnapshot::default(), IndicatorSnapshot::default(), Regime::Up);
        let sig = OpeningRangeBreakout(params()).evaluate(&c).unwrap();
        assert_eq!(sig.direction, Direction::Long);
        assert!((sig.stop_price - 100.0).abs() < f64::EPSILON);
        // target = 103 + 0.5 * (102 - 98)
        assert!((sig.target_price - 105.0).abs() < f64::EPSILON);
    }

    #[test]
    fn orb_long_skipped_in_strong_down() {
        let bars = opening_session(103.0);
        let c = ctx(
            &bars,
            IndicatorSnapshot::default(),
            IndicatorSnapshot::default(),
            Regime::StrongDown,
        );
        assert!(OpeningRangeBreakout(params()).evaluate(&c).is_none());
    }

    #[test]
    fn orb_needs_bars_after_the_range() {
        let bars: Vec<Candle> = (0..3)
            .map(|i| candle(i, 100.0, 102.0, 98.0, 100.0, 1000.0))
            .collect();
        let c = ctx(&bars, IndicatorSnapshot::default(), IndicatorSnapshot::default(), Regime::Up);
        assert!(OpeningRangeBreakout(params()).evaluate(&c).is_none());
    }

    #[test]
    fn bollinger_reversion_long_targets_middle_band() {
        let bars = vec![candle(0, 96.0, 96.5, 94.5, 95.0, 1000.0)];
        let snap = IndicatorSnapshot {
            bb_percent_b: Some(-0.1),
            bb_middle: Some(100.0),
            rsi: Some(25.0),
            ..with_atr(1.0)
        };
        let c = ctx(&bars, snap, IndicatorSnapshot::default(), Regime::Sideways);
        let sig = BollingerReversion(PatternParams::default())
            .evaluate(&c)
            .unwrap();
        assert_eq!(sig.direction, Direction::Long);
        assert!((sig.target_price - 100.0).abs() < f64::EPSILON);
        assert!((sig.stop_price - 93.5).abs() < f64::EPSILON);
    }

    #[test]
    fn bollinger_reversion_requires_rsi_confirmation() {
        let bars = vec![candle(0, 96.0, 96.5, 94.5, 95.0, 1000.0)];
        let snap = IndicatorSnapshot {
            bb_percent_b: Some(-0.1),
            bb_middle: Some(100.0),
            rsi: Some(45.0),
            ..with_atr(1.0)
        };
        let c = ctx(&bars, snap, IndicatorSnapshot::default(), Regime::Sideways);
        assert!(BollingerReversion(PatternParams::default()).evaluate(&c).is_none());
    }
}
