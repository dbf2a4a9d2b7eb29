//! Market data port trait.

use crate::domain::candle::RawCandle;
use crate::domain::error::StuntmanError;

/// A provider of historical bars for one instrument and bar interval.
///
/// Bars come back as delivered, unvalidated; they enter the engine through
/// [`CandleSeries::from_raw`](crate::domain::candle::CandleSeries::from_raw).
pub trait MarketDataPort {
    fn fetch_candles(&self, symbol: &str) -> Result<Vec<RawCandle>, StuntmanError>;
}
