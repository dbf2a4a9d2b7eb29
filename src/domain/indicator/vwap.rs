//! Session VWAP.
//!
//! VWAP[i] = sum(typical * volume) / sum(volume) over the bars of the session
//! (calendar date) containing `i`. The accumulator resets on the first bar of
//! each date. While the session has traded no volume the typical price of the
//! current bar is reported instead.
//! Defined from the first bar; there is no warm-up.

use chrono::NaiveDate;

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_vwap(bars: &[Candle]) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut session: Option<NaiveDate> = None;
    let mut pv_sum = 0.0;
    let mut volume_sum = 0.0;

    for bar in bars {
        let date = bar.date();
        if session != Some(date) {
            session = Some(date);
            pv_sum = 0.0;
            volume_sum = 0.0;
        }

        let typical = bar.typical_price();
        pv_sum += typical * bar.volume;
        volume_sum += bar.volume;

        let vwap = if volume_sum > 0.0 {
            pv_sum / volume_sum
        } else {
            typical
        };

        values.push(IndicatorPoint {
            time: bar.time,
            valid: true,
            value: IndicatorValue::Simple(vwap),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Vwap,
        values,
    }
}
