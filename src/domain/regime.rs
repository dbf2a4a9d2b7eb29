//! Trend regime classification from EMA alignment and slope.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::indicator::IndicatorSeries;
use crate::domain::indicator_set::IndicatorSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    StrongUp,
    Up,
    Sideways,
    Down,
    StrongDown,
}

impl Regime {
    pub fn is_trending(self) -> bool {
        !matches!(self, Regime::Sideways)
    }

    pub fn is_strong(self) -> bool {
        matches!(self, Regime::StrongUp | Regime::StrongDown)
    }

    pub fn is_bullish(self) -> bool {
        matches!(self, Regime::StrongUp | Regime::Up)
    }

    pub fn is_bearish(self) -> bool {
        matches!(self, Regime::StrongDown | Regime::Down)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strong_up" => Some(Regime::StrongUp),
            "up" => Some(Regime::Up),
            "sideways" => Some(Regime::Sideways),
            "down" => Some(Regime::Down),
            "strong_down" => Some(Regime::StrongDown),
            _ => None,
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Regime::StrongUp => "STRONG_UP",
            Regime::Up => "UP",
            Regime::Sideways => "SIDEWAYS",
            Regime::Down => "DOWN",
            Regime::StrongDown => "STRONG_DOWN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeConfig {
    /// Bars required before anything but SIDEWAYS is reported.
    pub min_lookback: usize,
    /// Bars over which the medium EMA slope is measured.
    pub slope_lookback: usize,
    /// Minimum |slope| in percent for UP/DOWN.
    pub slope_pct: f64,
    /// Minimum |slope| in percent for STRONG_UP/STRONG_DOWN.
    pub strong_slope_pct: f64,
    /// RSI must be above (bullish) or below (bearish) this for a strong call.
    pub rsi_midline: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        RegimeConfig {
            min_lookback: 50,
            slope_lookback: 10,
            slope_pct: 0.05,
            strong_slope_pct: 0.15,
            rsi_midline: 50.0,
        }
    }
}

/// Classify the regime at `index`.
///
/// Undefined inputs, or an index inside `min_lookback`, yield SIDEWAYS.
/// A strong call additionally needs RSI on the matching side of the
/// midline; when RSI is undefined the call is demoted to UP/DOWN.
pub fn classify(
    ema_short: &IndicatorSeries,
    ema_medium: &IndicatorSeries,
    ema_long: &IndicatorSeries,
    rsi: &IndicatorSeries,
    index: usize,
    config: &RegimeConfig,
) -> Regime {
    if index < config.min_lookback || index < config.slope_lookback {
        return Regime::Sideways;
    }

    let (Some(short), Some(medium), Some(long), Some(medium_then)) = (
        ema_short.simple_at(index),
        ema_medium.simple_at(index),
        ema_long.simple_at(index),
        ema_medium.simple_at(index - config.slope_lookback),
    ) else {
        return Regime::Sideways;
    };

    if medium_then == 0.0 {
        return Regime::Sideways;
    }
    let slope_pct = (medium - medium_then) / medium_then * 100.0;

    let bullish = short > medium && medium > long;
    let bearish = short < medium && medium < long;
    let rsi = rsi.simple_at(index);

    if bullish && slope_pct >= config.slope_pct {
        let strong = slope_pct >= config.strong_slope_pct
            && rsi.is_some_and(|r| r > config.rsi_midline);
        if strong { Regime::StrongUp } else { Regime::Up }
    } else if bearish && -slope_pct >= config.slope_pct {
        let strong = -slope_pct >= config.strong_slope_pct
            && rsi.is_some_and(|r| r < config.rsi_midline);
        if strong { Regime::StrongDown } else { Regime::Down }
    } else {
        Regime::Sideways
    }
}

/// Regime for every bar of a precomputed indicator set.
pub fn classify_all(set: &IndicatorSet, config: &RegimeConfig) -> Vec<Regime> {
    (0..set.ema_medium.len())
        .map(|i| {
            classify(
                &set.ema_short,
                &set.ema_medium,
                &set.ema_long,
                &set.rsi,
                i,
                config,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::flat_bars;
    use crate::domain::indicator::{calculate_ema, calculate_rsi};

    fn series(prices: &[f64]) -> [IndicatorSeries; 4] {
        let bars = flat_bars(prices);
        [
            calculate_ema(&bars, 5),
            calculate_ema(&bars, 10),
            calculate_ema(&bars, 20),
            calculate_rsi(&bars, 14),
        ]
    }

    fn cfg() -> RegimeConfig {
        RegimeConfig {
            min_lookback: 30,
            slope_lookback: 5,
            slope_pct: 0.1,
            strong_slope_pct: 1.0,
            rsi_midline: 50.0,
        }
    }

    fn run(prices: &[f64], index: usize, config: &RegimeConfig) -> Regime {
        let [s, m, l, r] = series(prices);
        classify(&s, &m, &l, &r, index, config)
    }

    #[test]
    fn below_min_lookback_is_sideways() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        assert_eq!(run(&prices, 29, &cfg()), Regime::Sideways);
    }

    #[test]
    fn steep_rise_is_strong_up() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 2.0).collect();
        assert_eq!(run(&prices, 59, &cfg()), Regime::StrongUp);
    }

    #[test]
    fn steep_fall_is_strong_down() {
        let prices: Vec<f64> = (0..60).map(|i| 300.0 - i as f64 * 2.0).collect();
        assert_eq!(run(&prices, 59, &cfg()), Regime::StrongDown);
    }

    #[test]
    fn gentle_rise_is_up() {
        let prices: Vec<f64> = (0..60).map(|i| 1000.0 + i as f64 * 0.5).collect();
        assert_eq!(run(&prices, 59, &cfg()), Regime::Up);
    }

    #[test]
    fn flat_is_sideways() {
        assert_eq!(run(&[100.0; 60], 59, &cfg()), Regime::Sideways);
    }

    #[test]
    fn thresholds_are_configurable() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 2.0).collect();
        let strict = RegimeConfig {
            strong_slope_pct: 50.0,
            ..cfg()
        };
        assert_eq!(run(&prices, 59, &strict), Regime::Up);
        let stricter = RegimeConfig {
            slope_pct: 50.0,
            strong_slope_pct: 60.0,
            ..cfg()
        };
        assert_eq!(run(&prices, 59, &stricter), Regime::Sideways);
    }

    #[test]
    fn undefined_rsi_demotes_strong_call() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 2.0).collect();
        let bars = flat_bars(&prices);
        let [s, m, l, _] = series(&prices);
        let no_rsi = calculate_rsi(&bars, 100);
        assert_eq!(classify(&s, &m, &l, &no_rsi, 59, &cfg()), Regime::Up);
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(Regime::parse("strong_up"), Some(Regime::StrongUp));
        assert_eq!(Regime::parse("SIDEWAYS"), Some(Regime::Sideways));
        assert_eq!(Regime::parse("north"), None);
        assert_eq!(Regime::StrongDown.to_string(), "STRONG_DOWN");
    }
}
