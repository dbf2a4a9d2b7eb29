//! Precomputed indicator series for one candle series and per-bar snapshots.
//!
//! Every series is computed once up front over the whole run; because each
//! calculator only reads the candle prefix, the snapshot at bar `i` is the
//! same as if the series had been computed on `candles[..=i]`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::candle::Candle;
use crate::domain::indicator::{
    IndicatorSeries, IndicatorValue, calculate_adx, calculate_atr, calculate_bollinger,
    calculate_ema, calculate_macd, calculate_rsi, calculate_sma, calculate_vwap,
};

/// Lookback periods for the indicators the engine computes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub ema_short: usize,
    pub ema_medium: usize,
    pub ema_long: usize,
    pub sma: usize,
    pub rsi: usize,
    pub atr: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_mult_x100: u32,
    pub adx: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            ema_short: 9,
            ema_medium: 21,
            ema_long: 50,
            sma: 20,
            rsi: 14,
            atr: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_mult_x100: 200,
            adx: 14,
        }
    }
}

impl IndicatorConfig {
    /// Number of bars before every configured indicator is defined.
    pub fn longest_warmup(&self) -> usize {
        [
            self.ema_short,
            self.ema_medium,
            self.ema_long,
            self.sma,
            self.rsi + 1,
            self.atr,
            self.macd_fast.max(self.macd_slow) + self.macd_signal - 1,
            self.bollinger_period,
            2 * self.adx,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Indicator values at one bar; `None` means undefined (warm-up).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub ema_short: Option<f64>,
    pub ema_medium: Option<f64>,
    pub ema_long: Option<f64>,
    pub sma: Option<f64>,
    pub rsi: Option<f64>,
    pub atr: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_percent_b: Option<f64>,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub vwap: Option<f64>,
}

impl IndicatorSnapshot {
    /// Look a value up by its report name (`"rsi"`, `"macd_line"`, ...).
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "ema_short" => self.ema_short,
            "ema_medium" => self.ema_medium,
            "ema_long" => self.ema_long,
            "sma" => self.sma,
            "rsi" => self.rsi,
            "atr" => self.atr,
            "macd_line" => self.macd_line,
            "macd_signal" => self.macd_signal,
            "macd_histogram" => self.macd_histogram,
            "bb_upper" => self.bb_upper,
            "bb_middle" => self.bb_middle,
            "bb_lower" => self.bb_lower,
            "bb_percent_b" => self.bb_percent_b,
            "adx" => self.adx,
            "plus_di" => self.plus_di,
            "minus_di" => self.minus_di,
            "vwap" => self.vwap,
            _ => None,
        }
    }

    /// Defined values keyed by name, for reports and the `indicators` command.
    pub fn defined(&self) -> BTreeMap<&'static str, f64> {
        SNAPSHOT_FIELDS
            .iter()
            .filter_map(|&name| self.get(name).map(|v| (name, v)))
            .collect()
    }
}

pub const SNAPSHOT_FIELDS: [&str; 17] = [
    "ema_short",
    "ema_medium",
    "ema_long",
    "sma",
    "rsi",
    "atr",
    "macd_line",
    "macd_signal",
    "macd_histogram",
    "bb_upper",
    "bb_middle",
    "bb_lower",
    "bb_percent_b",
    "adx",
    "plus_di",
    "minus_di",
    "vwap",
];

#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub ema_short: IndicatorSeries,
    pub ema_medium: IndicatorSeries,
    pub ema_long: IndicatorSeries,
    pub sma: IndicatorSeries,
    pub rsi: IndicatorSeries,
    pub atr: IndicatorSeries,
    pub macd: IndicatorSeries,
    pub bollinger: IndicatorSeries,
    pub adx: IndicatorSeries,
    pub vwap: IndicatorSeries,
}

impl IndicatorSet {
    pub fn compute(candles: &[Candle], config: &IndicatorConfig) -> Self {
        IndicatorSet {
            ema_short: calculate_ema(candles, config.ema_short),
            ema_medium: calculate_ema(candles, config.ema_medium),
            ema_long: calculate_ema(candles, config.ema_long),
            sma: calculate_sma(candles, config.sma),
            rsi: calculate_rsi(candles, config.rsi),
            atr: calculate_atr(candles, config.atr),
            macd: calculate_macd(
                candles,
                config.macd_fast,
                config.macd_slow,
                config.macd_signal,
            ),
            bollinger: calculate_bollinger(
                candles,
                config.bollinger_period,
                config.bollinger_mult_x100,
            ),
            adx: calculate_adx(candles, config.adx),
            vwap: calculate_vwap(candles),
        }
    }

    pub fn snapshot(&self, index: usize) -> IndicatorSnapshot {
        let mut snap = IndicatorSnapshot {
            ema_short: self.ema_short.simple_at(index),
            ema_medium: self.ema_medium.simple_at(index),
            ema_long: self.ema_long.simple_at(index),
            sma: self.sma.simple_at(index),
            rsi: self.rsi.simple_at(index),
            atr: self.atr.simple_at(index),
            vwap: self.vwap.simple_at(index),
            ..IndicatorSnapshot::default()
        };

        if let Some(IndicatorValue::Macd {
            line,
            signal,
            histogram,
        }) = self.macd.valid_at(index)
        {
            snap.macd_line = Some(*line);
            snap.macd_signal = Some(*signal);
            snap.macd_histogram = Some(*histogram);
        }
        if let Some(IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
            percent_b,
        }) = self.bollinger.valid_at(index)
        {
            snap.bb_upper = Some(*upper);
            snap.bb_middle = Some(*middle);
            snap.bb_lower = Some(*lower);
            snap.bb_percent_b = Some(*percent_b);
        }
        if let Some(IndicatorValue::Adx {
            adx,
            plus_di,
            minus_di,
        }) = self.adx.valid_at(index)
        {
            snap.adx = Some(*adx);
            snap.plus_di = Some(*plus_di);
            snap.minus_di = Some(*minus_di);
        }

        snap
    }
}
