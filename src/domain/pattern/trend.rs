//! Trend-following patterns, scoped to trending regimes.

use crate::domain::pattern::{Pattern, PatternContext, PatternParams, PatternScope};
use crate::domain::regime::Regime;
use crate::domain::signal::{Direction, Signal};

/// Trade direction implied by a trending regime.
fn trend_direction(regime: Regime) -> Option<Direction> {
    if regime.is_bullish() {
        Some(Direction::Long)
    } else if regime.is_bearish() {
        Some(Direction::Short)
    } else {
        None
    }
}

/// Pullback to the medium EMA that holds, in the direction of the trend.
pub struct EmaPullback(pub PatternParams);

impl Pattern for EmaPullback {
    fn id(&self) -> &str {
        "ema_pullback"
    }

    fn scope(&self) -> PatternScope {
        PatternScope::trending()
    }

    fn evaluate(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
        let direction = trend_direction(ctx.regime)?;
        let atr = ctx.snapshot.atr?;
        let ema = ctx.snapshot.ema_medium?;
        let bar = ctx.bar();
        let tolerance = self.0.touch_tolerance_atr * atr;

        let holds = match direction {
            Direction::Long => bar.low <= ema + tolerance && bar.close > ema && bar.is_bullish(),
            Direction::Short => bar.high >= ema - tolerance && bar.close < ema && bar.is_bearish(),
        };
        if !holds {
            return None;
        }

        let confidence = if ctx.regime.is_strong() { 0.7 } else { 0.6 };
        Some(Signal::with_atr_bracket(
            self.id(),
            direction,
            bar.close,
            atr,
            self.0.stop_atr,
            self.0.target_atr,
            confidence,
            ctx.regime,
            format!("pullback to EMA {:.2} held in {}", ema, ctx.regime),
        ))
    }
}

/// Close crosses back through VWAP in the direction of the trend.
pub struct VwapReclaim(pub PatternParams);

impl Pattern for VwapReclaim {
    fn id(&self) -> &str {
        "vwap_reclaim"
    }

    fn scope(&self) -> PatternScope {
        PatternScope::trending()
    }

    fn evaluate(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
        let direction = trend_direction(ctx.regime)?;
        let atr = ctx.snapshot.atr?;
        let vwap = ctx.snapshot.vwap?;
        let prev_vwap = ctx.previous.vwap?;
        let bar = ctx.bar();
        let prev = ctx.prev_bar()?;
        // a reclaim across a session boundary is just the VWAP reset
        if prev.date() != bar.date() {
            return None;
        }

        let crossed = match direction {
            Direction::Long => prev.close < prev_vwap && bar.close > vwap,
            Direction::Short => prev.close > prev_vwap && bar.close < vwap,
        };
        if !crossed {
            return None;
        }

        Some(Signal::with_atr_bracket(
            self.id(),
            direction,
            bar.close,
            atr,
            self.0.stop_atr,
            self.0.target_atr,
            0.6,
            ctx.regime,
            format!("VWAP {:.2} reclaimed in {}", vwap, ctx.regime),
        ))
    }
}

/// MACD histogram flips sign in a strong trend with ADX above the floor.
pub struct MacdMomentum(pub PatternParams);

impl Pattern for MacdMomentum {
    fn id(&self) -> &str {
        "macd_momentum"
    }

    fn scope(&self) -> PatternScope {
        PatternScope::Regimes(vec![Regime::StrongUp, Regime::StrongDown])
    }

    fn evaluate(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
        let direction = trend_direction(ctx.regime)?;
        let atr = ctx.snapshot.atr?;
        let adx = ctx.snapshot.adx?;
        let hist = ctx.snapshot.macd_histogram?;
        let prev_hist = ctx.previous.macd_histogram?;
        if adx < self.0.min_adx {
            return None;
        }

        let flipped = match direction {
            Direction::Long => prev_hist <= 0.0 && hist > 0.0,
            Direction::Short => prev_hist >= 0.0 && hist < 0.0,
        };
        if !flipped {
            return None;
        }

        Some(Signal::with_atr_bracket(
            self.id(),
            direction,
            ctx.bar().close,
            atr,
            self.0.stop_atr,
            self.0.target_atr,
            0.75,
            ctx.regime,
            format!("MACD histogram flip with ADX {:.1}", adx),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::candle;
    use crate::domain::indicator_set::IndicatorSnapshot;
    use crate::domain::pattern::test_support::{ctx, with_atr};

    #[test]
    fn ema_pullback_long_in_uptrend() {
        let bars = vec![
            candle(0, 101.0, 102.0, 100.5, 101.5, 1000.0),
            candle(1, 100.2, 101.0, 99.9, 100.8, 1000.0),
        ];
        let snap = IndicatorSnapshot {
            ema_medium: Some(100.0),
            ..with_atr(1.0)
        };
        let c = ctx(&bars, snap, IndicatorSnapshot::default(), Regime::Up);
        let sig = EmaPullback(PatternParams::default()).evaluate(&c).unwrap();
        assert_eq!(sig.direction, Direction::Long);
        assert!((sig.confidence - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_pullback_silent_when_sideways() {
        let bars = vec![candle(0, 100.2, 101.0, 99.9, 100.8, 1000.0)];
        let snap = IndicatorSnapshot {
            ema_medium: Some(100.0),
            ..with_atr(1.0)
        };
        let c = ctx(&bars, snap, IndicatorSnapshot::default(), Regime::Sideways);
        assert!(EmaPullback(PatternParams::default()).evaluate(&c).is_none());
    }

    #[test]
    fn vwap_reclaim_short_in_downtrend() {
        let bars = vec![
            candle(0, 100.0, 100.8, 99.8, 100.6, 1000.0),
            candle(1, 100.5, 100.6, 99.2, 99.4, 1000.0),
        ];
        let snap = IndicatorSnapshot {
            vwap: Some(100.0),
            ..with_atr(1.0)
        };
        let prev = IndicatorSnapshot {
            vwap: Some(100.1),
            ..IndicatorSnapshot::default()
        };
        let c = ctx(&bars, snap, prev, Regime::StrongDown);
        let sig = VwapReclaim(PatternParams::default()).evaluate(&c).unwrap();
        assert_eq!(sig.direction, Direction::Short);
        assert!(sig.is_well_formed());
    }

    #[test]
    fn macd_momentum_requires_adx_floor() {
        let bars = vec![
            candle(0, 100.0, 101.0, 99.0, 100.0, 1000.0),
            candle(1, 100.0, 102.0, 99.5, 101.5, 1000.0),
        ];
        let snap = |adx| IndicatorSnapshot {
            adx: Some(adx),
            macd_histogram: Some(0.2),
            ..with_atr(1.0)
        };
        let prev = IndicatorSnapshot {
            macd_histogram: Some(-0.1),
            ..IndicatorSnapshot::default()
        };
        let params = PatternParams::default();

        let weak = ctx(&bars, snap(10.0), prev, Regime::StrongUp);
        assert!(MacdMomentum(params.clone()).evaluate(&weak).is_none());

        let strong = ctx(&bars, snap(30.0), prev, Regime::StrongUp);
        let sig = MacdMomentum(params).evaluate(&strong).unwrap();
        assert_eq!(sig.direction, Direction::Long);
    }
}
