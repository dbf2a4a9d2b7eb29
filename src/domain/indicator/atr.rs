//! Average True Range (Wilder).
//!
//! TR[0] = high - low; TR[i] = max(high-low, |high-prevClose|, |low-prevClose|).
//! Seed at index n-1 is the simple mean of TR[0..n], then Wilder-smoothed.

use crate::domain::candle::Candle;
use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, wilder_step,
};

pub fn calculate_atr(bars: &[Candle], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Atr(period));
    }

    let tr_values = true_ranges(bars);
    let mut results: Vec<IndicatorPoint> = Vec::with_capacity(bars.len());
    let mut atr = 0.0;

    for i in 0..bars.len() {
        let valid = i + 1 >= period;
        if i + 1 == period {
            atr = tr_values[0..=i].iter().sum::<f64>() / period as f64;
        } else if i + 1 > period {
            atr = wilder_step(atr, tr_values[i], period);
        }

        results.push(IndicatorPoint {
            time: bars[i].time,
            valid,
            value: IndicatorValue::Simple(if valid { atr } else { 0.0 }),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values: results,
    }
}

pub(crate) fn true_ranges(bars: &[Candle]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.range()
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect()
}
