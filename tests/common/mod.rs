#![allow(dead_code)]

use std::collections::HashMap;

use chrono::FixedOffset;
use stuntman::domain::candle::{Candle, CandleSeries, RawCandle};
use stuntman::domain::cost::CostConfig;
use stuntman::domain::error::StuntmanError;
use stuntman::domain::strategy::{PatternPolicy, StrategyConfig};
use stuntman::ports::data_port::MarketDataPort;

/// 2024-01-02 09:30 New York time.
pub const SESSION_OPEN_TS: i64 = 1_704_205_800;
pub const BAR_SECONDS: i64 = 300;
/// 09:30 to 16:00 in 5-minute bars.
pub const BARS_PER_SESSION: usize = 78;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<RawCandle>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<RawCandle>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockDataPort {
    fn fetch_candles(&self, symbol: &str) -> Result<Vec<RawCandle>, StuntmanError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(StuntmanError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }
}

pub fn eastern() -> FixedOffset {
    FixedOffset::west_opt(5 * 3600).unwrap()
}

/// Unix timestamp of bar `i`, counting only regular-session bars.
pub fn bar_timestamp(i: usize) -> i64 {
    let day = (i / BARS_PER_SESSION) as i64;
    let slot = (i % BARS_PER_SESSION) as i64;
    SESSION_OPEN_TS + day * 86_400 + slot * BAR_SECONDS
}

/// Deterministic intraday series: two overlapping swings plus drift,
/// rounded to the 0.25 tick.
pub fn raw_session_bars(sessions: usize, drift: f64) -> Vec<RawCandle> {
    let n = sessions * BARS_PER_SESSION;
    let tick = |p: f64| (p * 4.0).round() / 4.0;
    let price = |i: usize| {
        let x = i as f64;
        4700.0 + 25.0 * (x / 45.0).sin() + 6.0 * (x / 6.0).sin() + drift * x
    };

    (0..n)
        .map(|i| {
            let open = tick(if i == 0 { price(0) } else { price(i - 1) });
            let close = tick(price(i));
            let wick = 0.5 + 0.25 * ((i % 4) as f64);
            RawCandle {
                timestamp: bar_timestamp(i),
                open: Some(open),
                high: Some(open.max(close) + wick),
                low: Some(open.min(close) - wick),
                close: Some(close),
                volume: Some(800.0 + 400.0 * ((i as f64) / 11.0).cos().abs()),
            }
        })
        .collect()
}

pub fn session_candles(sessions: usize, drift: f64) -> Vec<Candle> {
    CandleSeries::from_raw("ES", &raw_session_bars(sessions, drift), eastern())
        .unwrap()
        .candles
}

/// A strategy that signals on nearly every bar: close against session VWAP.
pub fn busy_strategy_config() -> StrategyConfig {
    StrategyConfig {
        policy: PatternPolicy::Ensemble,
        patterns: vec!["vwap".to_string()],
        min_agreement: 1,
        ..StrategyConfig::default()
    }
}

pub fn frictionless(mut config: StrategyConfig) -> StrategyConfig {
    config.costs = CostConfig::frictionless();
    config
}
