//! Contract specification for the traded instrument.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    /// Minimum price increment.
    pub tick_size: f64,
    /// Currency value of a one-point move for one contract.
    pub point_value: f64,
}

impl Default for Instrument {
    fn default() -> Self {
        // E-mini S&P 500
        Instrument {
            symbol: "ES".to_string(),
            tick_size: 0.25,
            point_value: 50.0,
        }
    }
}

impl Instrument {
    /// Currency value of one tick for one contract.
    pub fn tick_value(&self) -> f64 {
        self.tick_size * self.point_value
    }

    pub fn ticks_to_price(&self, ticks: f64) -> f64 {
        ticks * self.tick_size
    }

    pub fn price_to_ticks(&self, price_delta: f64) -> f64 {
        if self.tick_size > 0.0 {
            price_delta / self.tick_size
        } else {
            0.0
        }
    }
}
