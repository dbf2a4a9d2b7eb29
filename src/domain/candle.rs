//! Candle (OHLCV bar) representation and boundary validation.
//!
//! External feeds hand over [`RawCandle`]s whose price fields may be missing
//! or nonsensical. [`CandleSeries::from_raw`] is the only way to turn them into
//! [`Candle`]s: malformed bars are dropped, the rest are sorted by time and
//! duplicate timestamps are discarded (first occurrence wins).

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

use crate::domain::error::StuntmanError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time in the exchange's time zone.
    pub time: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Calendar date of the bar in exchange time; sessions are keyed by it.
    pub fn date(&self) -> NaiveDate {
        self.time.date_naive()
    }

    /// Hour of day (0-23) in exchange time.
    pub fn hour(&self) -> u32 {
        self.time.hour()
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Loosely-typed bar as delivered by a market-data provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCandle {
    /// Unix timestamp (seconds, UTC).
    pub timestamp: i64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl RawCandle {
    /// Validate and convert into a [`Candle`] in the given exchange offset.
    ///
    /// Returns `None` for bars with missing or non-finite OHLC, a high below
    /// the low, an open/close outside the high-low range, or negative volume.
    /// A missing volume is treated as zero.
    pub fn validate(&self, offset: FixedOffset) -> Option<Candle> {
        let open = self.open.filter(|v| v.is_finite())?;
        let high = self.high.filter(|v| v.is_finite())?;
        let low = self.low.filter(|v| v.is_finite())?;
        let close = self.close.filter(|v| v.is_finite())?;
        let volume = self.volume.unwrap_or(0.0);

        if !volume.is_finite() || volume < 0.0 {
            return None;
        }
        if high < low || open > high || open < low || close > high || close < low {
            return None;
        }

        let time = DateTime::from_timestamp(self.timestamp, 0)?.with_timezone(&offset);

        Some(Candle {
            time,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// A validated, strictly ascending candle series for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    pub symbol: String,
    pub candles: Vec<Candle>,
    /// Bars dropped at ingestion (malformed or duplicate timestamps).
    pub filtered: usize,
}

impl CandleSeries {
    pub fn from_raw(
        symbol: &str,
        raw: &[RawCandle],
        offset: FixedOffset,
    ) -> Result<Self, StuntmanError> {
        let mut candles: Vec<Candle> = raw.iter().filter_map(|r| r.validate(offset)).collect();
        let malformed = raw.len() - candles.len();

        candles.sort_by_key(|c| c.time);
        let before_dedup = candles.len();
        candles.dedup_by_key(|c| c.time);
        let duplicates = before_dedup - candles.len();

        let filtered = malformed + duplicates;
        if filtered > 0 {
            tracing::warn!(
                symbol,
                malformed,
                duplicates,
                "dropped candles at ingestion"
            );
        }

        if candles.is_empty() {
            return Err(StuntmanError::NoData {
                symbol: symbol.to_string(),
            });
        }

        Ok(Self {
            symbol: symbol.to_string(),
            candles,
            filtered,
        })
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

/// Index of the first bar of the session containing `index`.
///
/// A session is the run of consecutive bars sharing a calendar date.
pub fn session_start(candles: &[Candle], index: usize) -> usize {
    let date = candles[index].date();
    let mut start = index;
    while start > 0 && candles[start - 1].date() == date {
        start -= 1;
    }
    start
}

/// True when `index` is the last bar of its session (or of the data).
pub fn is_session_last_bar(candles: &[Candle], index: usize) -> bool {
    match candles.get(index + 1) {
        Some(next) => next.date() != candles[index].date(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn raw(ts: i64, o: f64, h: f64, l: f64, c: f64) -> RawCandle {
        RawCandle {
            timestamp: ts,
            open: Some(o),
            high: Some(h),
            low: Some(l),
            close: Some(c),
            volume: Some(1000.0),
        }
    }

    fn sample_candle() -> Candle {
        raw(1_704_103_200, 100.0, 110.0, 90.0, 105.0)
            .validate(utc())
            .unwrap()
    }

    #[test]
    fn typical_price() {
        let bar = sample_candle();
        let expected = (110.0 + 90.0 + 105.0) / 3.0;
        assert!((bar.typical_price() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_candle();
        // high-low=20, |110-70|=40, |90-70|=20 → 40
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = sample_candle();
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn date_and_hour_follow_exchange_offset() {
        // 2024-01-02 03:00 UTC is 2024-01-01 21:00 at UTC-6
        let central = FixedOffset::west_opt(6 * 3600).unwrap();
        let candle = raw(1_704_164_400, 1.0, 1.0, 1.0, 1.0)
            .validate(central)
            .unwrap();
        assert_eq!(candle.date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(candle.hour(), 21);
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let mut r = raw(0, 1.0, 2.0, 0.5, 1.5);
        r.close = None;
        assert!(r.validate(utc()).is_none());
    }

    #[test]
    fn validate_rejects_inverted_range() {
        assert!(raw(0, 1.0, 0.5, 2.0, 1.0).validate(utc()).is_none());
        assert!(raw(0, 3.0, 2.0, 1.0, 1.5).validate(utc()).is_none());
    }

    #[test]
    fn validate_rejects_nan_and_negative_volume() {
        assert!(raw(0, f64::NAN, 2.0, 1.0, 1.5).validate(utc()).is_none());
        let mut r = raw(0, 1.5, 2.0, 1.0, 1.5);
        r.volume = Some(-1.0);
        assert!(r.validate(utc()).is_none());
    }

    #[test]
    fn missing_volume_is_zero() {
        let mut r = raw(0, 1.5, 2.0, 1.0, 1.5);
        r.volume = None;
        assert_eq!(r.validate(utc()).unwrap().volume, 0.0);
    }

    #[test]
    fn from_raw_sorts_filters_and_dedups() {
        let mut bad = raw(120, 1.0, 2.0, 0.5, 1.5);
        bad.high = None;
        let input = vec![
            raw(180, 1.0, 2.0, 0.5, 1.5),
            raw(60, 1.0, 2.0, 0.5, 1.2),
            bad,
            raw(60, 1.0, 2.0, 0.5, 1.9),
        ];
        let series = CandleSeries::from_raw("ES", &input, utc()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.filtered, 2);
        assert!(series.candles[0].time < series.candles[1].time);
        assert_eq!(series.candles[0].close, 1.2);
    }

    #[test]
    fn from_raw_empty_is_no_data() {
        let err = CandleSeries::from_raw("ES", &[], utc()).unwrap_err();
        assert!(matches!(err, StuntmanError::NoData { .. }));
    }

    #[test]
    fn session_boundaries() {
        let day = 86_400;
        let input = vec![
            raw(0, 1.0, 1.0, 1.0, 1.0),
            raw(3600, 1.0, 1.0, 1.0, 1.0),
            raw(day, 1.0, 1.0, 1.0, 1.0),
            raw(day + 3600, 1.0, 1.0, 1.0, 1.0),
        ];
        let series = CandleSeries::from_raw("ES", &input, utc()).unwrap();
        let c = &series.candles;
        assert_eq!(session_start(c, 1), 0);
        assert_eq!(session_start(c, 3), 2);
        assert!(is_session_last_bar(c, 1));
        assert!(!is_session_last_bar(c, 2));
        assert!(is_session_last_bar(c, 3));
    }
}
