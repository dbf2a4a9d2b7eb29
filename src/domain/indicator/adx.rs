//! Average Directional Index (Wilder).
//!
//! +DM = high - prevHigh when it exceeds prevLow - low and is positive, else 0
//! (mirrored for -DM). +DM, -DM and TR are Wilder-smoothed like ATR, seeded
//! with their mean over the first `period` changes:
//!
//! - DI+ = 100 * smoothed(+DM) / smoothed(TR), 0 when smoothed TR is 0
//! - DX  = 100 * |DI+ - DI-| / (DI+ + DI-), 0 when both DIs are 0
//! - ADX = mean of the first `period` DX values, then Wilder-smoothed
//!
//! DX is first defined at index `period`, so ADX is valid from `2 * period - 1`.

use crate::domain::candle::Candle;
use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, wilder_step,
};

pub fn calculate_adx(bars: &[Candle], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Adx(period));
    }

    let mut values = Vec::with_capacity(bars.len());
    values.push(invalid(&bars[0]));

    let (mut plus_dm_sum, mut minus_dm_sum, mut tr_sum) = (0.0, 0.0, 0.0);
    let (mut s_plus, mut s_minus, mut s_tr) = (0.0, 0.0, 0.0);
    let mut dx_sum = 0.0;
    let mut adx = 0.0;

    for i in 1..bars.len() {
        let (plus_dm, minus_dm) = directional_movement(&bars[i - 1], &bars[i]);
        let tr = bars[i].true_range(bars[i - 1].close);

        if i < period {
            plus_dm_sum += plus_dm;
            minus_dm_sum += minus_dm;
            tr_sum += tr;
            values.push(invalid(&bars[i]));
            continue;
        }

        if i == period {
            let n = period as f64;
            s_plus = (plus_dm_sum + plus_dm) / n;
            s_minus = (minus_dm_sum + minus_dm) / n;
            s_tr = (tr_sum + tr) / n;
        } else {
            s_plus = wilder_step(s_plus, plus_dm, period);
            s_minus = wilder_step(s_minus, minus_dm, period);
            s_tr = wilder_step(s_tr, tr, period);
        }

        let plus_di = directional_index(s_plus, s_tr);
        let minus_di = directional_index(s_minus, s_tr);
        let dx = directional_spread(plus_di, minus_di);

        // DX values seen so far, counting this one
        let dx_count = i - period + 1;
        if dx_count < period {
            dx_sum += dx;
            values.push(invalid(&bars[i]));
            continue;
        }
        adx = if dx_count == period {
            (dx_sum + dx) / period as f64
        } else {
            wilder_step(adx, dx, period)
        };

        values.push(IndicatorPoint {
            time: bars[i].time,
            valid: true,
            value: IndicatorValue::Adx {
                adx,
                plus_di,
                minus_di,
            },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Adx(period),
        values,
    }
}

fn invalid(bar: &Candle) -> IndicatorPoint {
    IndicatorPoint {
        time: bar.time,
        valid: false,
        value: IndicatorValue::Adx {
            adx: 0.0,
            plus_di: 0.0,
            minus_di: 0.0,
        },
    }
}

fn directional_movement(prev: &Candle, bar: &Candle) -> (f64, f64) {
    let up = bar.high - prev.high;
    let down = prev.low - bar.low;
    let plus = if up > down && up > 0.0 { up } else { 0.0 };
    let minus = if down > up && down > 0.0 { down } else { 0.0 };
    (plus, minus)
}

fn directional_index(smoothed_dm: f64, smoothed_tr: f64) -> f64 {
    if smoothed_tr == 0.0 {
        0.0
    } else {
        100.0 * smoothed_dm / smoothed_tr
    }
}

fn directional_spread(plus_di: f64, minus_di: f64) -> f64 {
    let total = plus_di + minus_di;
    if total == 0.0 {
        0.0
    } else {
        100.0 * (plus_di - minus_di).abs() / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::{candle, flat_bars};

    fn parts(series: &IndicatorSeries, i: usize) -> Option<(f64, f64, f64)> {
        match series.valid_at(i)? {
            IndicatorValue::Adx {
                adx,
                plus_di,
                minus_di,
            } => Some((*adx, *plus_di, *minus_di)),
            _ => None,
        }
    }

    fn uptrend(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                candle(i, base, base + 1.0, base - 1.0, base + 0.5, 1000.0)
            })
            .collect()
    }

    #[test]
    fn adx_warmup() {
        let series = calculate_adx(&uptrend(20), 5);
        assert_eq!(series.values.len(), 20);
        for i in 0..9 {
            assert!(!series.values[i].valid, "index {} should be undefined", i);
        }
        assert!(series.values[9].valid);
    }

    #[test]
    fn adx_steady_uptrend_is_one_sided() {
        let series = calculate_adx(&uptrend(40), 5);
        let (adx, plus_di, minus_di) = parts(&series, 39).unwrap();
        assert!(plus_di > 0.0);
        assert_eq!(minus_di, 0.0);
        assert!((adx - 100.0).abs() < 1e-9);
    }

    #[test]
    fn adx_flat_series_is_zero_not_nan() {
        let series = calculate_adx(&flat_bars(&[100.0; 30]), 5);
        let (adx, plus_di, minus_di) = parts(&series, 29).unwrap();
        assert_eq!((adx, plus_di, minus_di), (0.0, 0.0, 0.0));
    }

    #[test]
    fn adx_stays_within_bounds() {
        let bars: Vec<Candle> = (0..60)
            .map(|i| {
                let wave = (i as f64 * 0.7).sin() * 5.0;
                candle(i, 100.0 + wave, 102.0 + wave, 98.0 + wave, 100.5 + wave, 1000.0)
            })
            .collect();
        let series = calculate_adx(&bars, 7);
        for i in 0..bars.len() {
            if let Some((adx, plus_di, minus_di)) = parts(&series, i) {
                assert!((0.0..=100.0).contains(&adx));
                assert!((0.0..=100.0).contains(&plus_di));
                assert!((0.0..=100.0).contains(&minus_di));
            }
        }
    }

    #[test]
    fn adx_zero_period() {
        assert!(calculate_adx(&uptrend(5), 0).values.is_empty());
    }
}
