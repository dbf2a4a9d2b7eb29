//! Transaction cost model: order rejection, slippage, fees and spread.
//!
//! All randomness comes from the caller's RNG so a seeded run is
//! reproducible draw for draw.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::instrument::Instrument;
use crate::domain::signal::Direction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostConfig {
    /// Probability an entry attempt is rejected outright.
    pub reject_probability: f64,
    pub base_slippage_ticks: f64,
    /// Extra slippage ticks per tick of volatility (ATR, or bar range).
    pub volatility_factor: f64,
    pub max_slippage_ticks: f64,
    /// Slippage is scaled by 1 + U(-jitter, +jitter).
    pub jitter: f64,
    /// Round-trip commission per contract.
    pub commission: f64,
    /// Round-trip exchange fee per contract.
    pub exchange_fee: f64,
    /// Round-trip regulatory fee per contract.
    pub regulatory_fee: f64,
    /// Spread paid on entry, in ticks.
    pub spread_ticks: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        CostConfig {
            reject_probability: 0.02,
            base_slippage_ticks: 1.0,
            volatility_factor: 0.1,
            max_slippage_ticks: 4.0,
            jitter: 0.25,
            commission: 4.0,
            exchange_fee: 2.56,
            regulatory_fee: 0.04,
            spread_ticks: 1.0,
        }
    }
}

impl CostConfig {
    /// Cost model with no friction at all; useful for checking raw pattern P&L.
    pub fn frictionless() -> Self {
        CostConfig {
            reject_probability: 0.0,
            base_slippage_ticks: 0.0,
            volatility_factor: 0.0,
            max_slippage_ticks: 0.0,
            jitter: 0.0,
            commission: 0.0,
            exchange_fee: 0.0,
            regulatory_fee: 0.0,
            spread_ticks: 0.0,
        }
    }
}

/// Currency costs attached to a closed trade.
///
/// `slippage` is already inside the fill prices (and so the gross P&L); it is
/// reported for attribution only and not deducted again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub commission: f64,
    pub exchange_fee: f64,
    pub regulatory_fee: f64,
    pub spread: f64,
    pub slippage: f64,
}

impl CostBreakdown {
    /// Costs deducted from gross P&L.
    pub fn charged(&self) -> f64 {
        self.commission + self.exchange_fee + self.regulatory_fee + self.spread
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    pub config: CostConfig,
    pub instrument: Instrument,
}

impl CostModel {
    pub fn new(config: CostConfig, instrument: Instrument) -> Self {
        CostModel { config, instrument }
    }

    /// Draw whether this entry attempt is rejected.
    pub fn rejects<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        let p = self.config.reject_probability.clamp(0.0, 1.0);
        rng.gen_bool(p)
    }

    /// Slippage in whole ticks for one fill; `volatility` is in price units.
    pub fn slippage_ticks<R: Rng + ?Sized>(&self, volatility: f64, rng: &mut R) -> f64 {
        let cfg = &self.config;
        let vol_ticks = self.instrument.price_to_ticks(volatility.max(0.0));
        let raw = cfg.base_slippage_ticks + cfg.volatility_factor * vol_ticks;
        let scale = if cfg.jitter > 0.0 {
            1.0 + rng.gen_range(-cfg.jitter..=cfg.jitter)
        } else {
            1.0
        };
        (raw * scale).round().clamp(0.0, cfg.max_slippage_ticks.max(0.0))
    }

    /// Price actually filled when `side` trades at `reference`, `ticks` adverse.
    ///
    /// Buying (long entry, short exit) fills higher; selling fills lower.
    pub fn adverse_fill(&self, reference: f64, side: Direction, ticks: f64) -> f64 {
        reference + side.sign() * self.instrument.ticks_to_price(ticks)
    }

    pub fn spread_cost(&self, contracts: u32) -> f64 {
        self.config.spread_ticks * self.instrument.tick_value() * contracts as f64
    }

    pub fn slippage_cost(&self, ticks: f64, contracts: u32) -> f64 {
        ticks * self.instrument.tick_value() * contracts as f64
    }

    /// Full breakdown for a closed round trip.
    pub fn round_trip(&self, contracts: u32, slippage_ticks: f64) -> CostBreakdown {
        let n = contracts as f64;
        CostBreakdown {
            commission: self.config.commission * n,
            exchange_fee: self.config.exchange_fee * n,
            regulatory_fee: self.config.regulatory_fee * n,
            spread: self.spread_cost(contracts),
            slippage: self.slippage_cost(slippage_ticks, contracts),
        }
    }
}
