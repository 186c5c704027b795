//! Shared rolling calculations for modules and guards.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

/// Wilder ATR: seed with the mean of the first `period` true ranges, then
/// atr = (prev * (period - 1) + tr) / period. The first bar's true range is
/// high - low.
pub fn calc_atr(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < period {
        return IndicatorSeries::empty(IndicatorType::Atr(period));
    }

    let tr = true_ranges(bars);
    let mut values = Vec::with_capacity(bars.len());
    let mut atr = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        let valid = i + 1 >= period;
        if i + 1 == period {
            atr = tr[..period].iter().sum::<f64>() / period as f64;
        } else if valid {
            atr = (atr * (period - 1) as f64 + tr[i]) / period as f64;
        }
        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Simple(if valid { atr } else { 0.0 }),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}

pub fn calc_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::empty(IndicatorType::Sma(period));
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        sum += bar.close;
        if i >= period {
            sum -= bars[i - period].close;
        }
        let valid = i + 1 >= period;
        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Simple(if valid { sum / period as f64 } else { 0.0 }),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

/// True range per bar, the first bar using high - low.
pub fn true_ranges(bars: &[OhlcvBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| match i {
            0 => bar.range(),
            _ => bar.true_range(bars[i - 1].close),
        })
        .collect()
}

/// Simple mean true range over the trailing `min(period, i + 1)` bars ending
/// at each index. Defined from the first bar on, so short weekly windows still
/// get a volatility baseline.
pub fn trailing_mean_true_range(bars: &[OhlcvBar], period: usize) -> Vec<f64> {
    let tr = true_ranges(bars);
    let period = period.max(1);
    (0..tr.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(period);
            let window = &tr[start..=i];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// Mean volume of the `period` bars before the last one.
pub fn trailing_volume_mean(bars: &[OhlcvBar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let end = bars.len() - 1;
    let window = &bars[end - period..end];
    Some(window.iter().map(|b| b.volume).sum::<f64>() / period as f64)
}
