//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//! - %B: (close - lower) / (upper - lower), 0.5 when the bands collapse
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are invalid.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_bollinger(
    bars: &[Candle],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Bollinger {
        period,
        stddev_mult_x100,
    };
    if period == 0 {
        return IndicatorSeries::empty(indicator_type);
    }

    let mut values = Vec::with_capacity(bars.len());
    let warmup = period - 1;
    let mult = stddev_mult_x100 as f64 / 100.0;

    for (i, bar) in bars.iter().enumerate() {
        let valid = i >= warmup;

        let value = if valid {
            let (middle, stddev) = close_window_stats(&bars[i + 1 - period..=i]);
            let upper = middle + mult * stddev;
            let lower = middle - mult * stddev;
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
                percent_b: percent_b(bar.close, upper, lower),
            }
        } else {
            IndicatorValue::Bollinger {
                upper: 0.0,
                middle: 0.0,
                lower: 0.0,
                percent_b: 0.0,
            }
        };

        values.push(IndicatorPoint {
            time: bar.time,
            valid,
            value,
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

fn percent_b(close: f64, upper: f64, lower: f64) -> f64 {
    let width = upper - lower;
    if width.abs() < f64::EPSILON {
        0.5
    } else {
        (close - lower) / width
    }
}

/// (mean, population stddev) of the closes in `window`.
fn close_window_stats(window: &[Candle]) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().map(|b| b.close).sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|b| {
            let diff = b.close - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}
