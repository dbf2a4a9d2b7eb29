//! Single-indicator directional readings, meant for ensemble voting.
//!
//! Each voter is a complete pattern with an ATR bracket, so it can also sit
//! in a first-match registry, but on its own it fires far too often.

use crate::domain::pattern::{Pattern, PatternContext, PatternParams};
use crate::domain::signal::{Direction, Signal};

fn bracket(
    id: &str,
    params: &PatternParams,
    ctx: &PatternContext<'_>,
    direction: Direction,
    reason: String,
) -> Option<Signal> {
    let atr = ctx.snapshot.atr?;
    Some(Signal::with_atr_bracket(
        id,
        direction,
        ctx.bar().close,
        atr,
        params.stop_atr,
        params.target_atr,
        0.5,
        ctx.regime,
        reason,
    ))
}

/// Long when oversold, short when overbought.
pub struct RsiVoter(pub PatternParams);

impl Pattern for RsiVoter {
    fn id(&self) -> &str {
        "rsi"
    }

    fn evaluate(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
        let rsi = ctx.snapshot.rsi?;
        let direction = if rsi <= self.0.rsi_oversold {
            Direction::Long
        } else if rsi >= self.0.rsi_overbought {
            Direction::Short
        } else {
            return None;
        };
        bracket(self.id(), &self.0, ctx, direction, format!("RSI {:.1}", rsi))
    }
}

/// Sign of the MACD histogram.
pub struct MacdVoter(pub PatternParams);

impl Pattern for MacdVoter {
    fn id(&self) -> &str {
        "macd"
    }

    fn evaluate(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
        let hist = ctx.snapshot.macd_histogram?;
        let direction = if hist > 0.0 {
            Direction::Long
        } else if hist < 0.0 {
            Direction::Short
        } else {
            return None;
        };
        bracket(self.id(), &self.0, ctx, direction, format!("MACD histogram {:.3}", hist))
    }
}

/// Close above or below session VWAP.
pub struct VwapVoter(pub PatternParams);

impl Pattern for VwapVoter {
    fn id(&self) -> &str {
        "vwap"
    }

    fn evaluate(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
        let vwap = ctx.snapshot.vwap?;
        let close = ctx.bar().close;
        let direction = if close > vwap {
            Direction::Long
        } else if close < vwap {
            Direction::Short
        } else {
            return None;
        };
        bracket(self.id(), &self.0, ctx, direction, format!("close vs VWAP {:.2}", vwap))
    }
}

/// Short, medium and long EMAs stacked in order.
pub struct EmaAlignmentVoter(pub PatternParams);

impl Pattern for EmaAlignmentVoter {
    fn id(&self) -> &str {
        "ema_alignment"
    }

    fn evaluate(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
        let s = ctx.snapshot.ema_short?;
        let m = ctx.snapshot.ema_medium?;
        let l = ctx.snapshot.ema_long?;
        let direction = if s > m && m > l {
            Direction::Long
        } else if s < m && m < l {
            Direction::Short
        } else {
            return None;
        };
        bracket(self.id(), &self.0, ctx, direction, "EMAs stacked".to_string())
    }
}

/// Dominant directional index, once ADX clears the floor.
pub struct AdxDiVoter(pub PatternParams);

impl Pattern for AdxDiVoter {
    fn id(&self) -> &str {
        "adx_di"
    }

    fn evaluate(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
        let adx = ctx.snapshot.adx?;
        let plus = ctx.snapshot.plus_di?;
        let minus = ctx.snapshot.minus_di?;
        if adx < self.0.min_adx {
            return None;
        }
        let direction = if plus > minus {
            Direction::Long
        } else if minus > plus {
            Direction::Short
        } else {
            return None;
        };
        bracket(
            self.id(),
            &self.0,
            ctx,
            direction,
            format!("ADX {:.1}, +DI {:.1} / -DI {:.1}", adx, plus, minus),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::flat_bars;
    use crate::domain::indicator_set::IndicatorSnapshot;
    use crate::domain::pattern::test_support::{ctx, with_atr};
    use crate::domain::regime::Regime;

    fn vote(pattern: &dyn Pattern, snapshot: IndicatorSnapshot, close: f64) -> i8 {
        let bars = flat_bars(&[close]);
        pattern.vote(&ctx(&bars, snapshot, IndicatorSnapshot::default(), Regime::Sideways))
    }

    #[test]
    fn rsi_extremes() {
        let p = RsiVoter(PatternParams::default());
        let at = |rsi| IndicatorSnapshot {
            rsi: Some(rsi),
            ..with_atr(1.0)
        };
        assert_eq!(vote(&p, at(25.0), 100.0), 1);
        assert_eq!(vote(&p, at(75.0), 100.0), -1);
        assert_eq!(vote(&p, at(50.0), 100.0), 0);
    }

    #[test]
    fn macd_histogram_sign() {
        let p = MacdVoter(PatternParams::default());
        let at = |h| IndicatorSnapshot {
            macd_histogram: Some(h),
            ..with_atr(1.0)
        };
        assert_eq!(vote(&p, at(0.4), 100.0), 1);
        assert_eq!(vote(&p, at(-0.4), 100.0), -1);
        assert_eq!(vote(&p, at(0.0), 100.0), 0);
    }

    #[test]
    fn vwap_side() {
        let p = VwapVoter(PatternParams::default());
        let snap = IndicatorSnapshot {
            vwap: Some(100.0),
            ..with_atr(1.0)
        };
        assert_eq!(vote(&p, snap, 101.0), 1);
        assert_eq!(vote(&p, snap, 99.0), -1);
        assert_eq!(vote(&p, snap, 100.0), 0);
    }

    #[test]
    fn ema_stack() {
        let p = EmaAlignmentVoter(PatternParams::default());
        let at = |s, m, l| IndicatorSnapshot {
            ema_short: Some(s),
            ema_medium: Some(m),
            ema_long: Some(l),
            ..with_atr(1.0)
        };
        assert_eq!(vote(&p, at(3.0, 2.0, 1.0), 100.0), 1);
        assert_eq!(vote(&p, at(1.0, 2.0, 3.0), 100.0), -1);
        assert_eq!(vote(&p, at(2.0, 3.0, 1.0), 100.0), 0);
    }

    #[test]
    fn adx_needs_floor() {
        let p = AdxDiVoter(PatternParams::default());
        let at = |adx, plus, minus| IndicatorSnapshot {
            adx: Some(adx),
            plus_di: Some(plus),
            minus_di: Some(minus),
            ..with_atr(1.0)
        };
        assert_eq!(vote(&p, at(30.0, 25.0, 10.0), 100.0), 1);
        assert_eq!(vote(&p, at(30.0, 10.0, 25.0), 100.0), -1);
        assert_eq!(vote(&p, at(15.0, 25.0, 10.0), 100.0), 0);
    }

    #[test]
    fn undefined_inputs_abstain() {
        let p = RsiVoter(PatternParams::default());
        assert_eq!(vote(&p, IndicatorSnapshot::default(), 100.0), 0);
        // defined reading but no ATR for the bracket
        let snap = IndicatorSnapshot {
            rsi: Some(10.0),
            ..IndicatorSnapshot::default()
        };
        assert_eq!(vote(&p, snap, 100.0), 0);
    }
}
