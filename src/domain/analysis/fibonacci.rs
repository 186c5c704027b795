//! Fibonacci retracement proximity.
//!
//! Takes the swing high and low of the last `lookback_days` daily candles and
//! checks whether the latest close sits near a retracement level. A pullback
//! into an upswing is a LONG setup, a bounce into a downswing a SHORT one.

use crate::domain::analysis::{AnalysisModule, insufficient, usable_daily};
use crate::domain::config::{FIBONACCI, FibonacciConfig};
use crate::domain::context::DecisionContext;
use crate::domain::error::ModuleError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::{ModuleResult, Signal};

pub const RETRACEMENT_LEVELS: [f64; 5] = [0.236, 0.382, 0.5, 0.618, 0.786];

pub struct FibonacciModule {
    config: FibonacciConfig,
}

impl FibonacciModule {
    pub fn new(config: FibonacciConfig) -> Self {
        Self { config }
    }
}

/// Golden-pocket levels carry full weight, the rest 0.8.
fn level_factor(level: f64) -> f64 {
    if level == 0.5 || level == 0.618 {
        1.0
    } else {
        0.8
    }
}

struct Swing {
    high: f64,
    low: f64,
    upswing: bool,
}

fn find_swing(window: &[OhlcvBar]) -> Option<Swing> {
    let (hi_idx, hi_bar) = window
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.high.total_cmp(&b.1.high).then(b.0.cmp(&a.0)))?;
    let (lo_idx, lo_bar) = window
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.low.total_cmp(&b.1.low).then(a.0.cmp(&b.0)))?;
    if hi_bar.high <= lo_bar.low {
        return None;
    }
    Some(Swing {
        high: hi_bar.high,
        low: lo_bar.low,
        upswing: lo_idx < hi_idx,
    })
}

impl AnalysisModule for FibonacciModule {
    fn name(&self) -> &'static str {
        FIBONACCI
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn analyze(&self, ctx: &DecisionContext) -> Result<ModuleResult, ModuleError> {
        let daily = usable_daily(ctx);
        let need = self.config.lookback_days.max(2);
        if daily.len() < need {
            return Ok(insufficient(FIBONACCI, daily.len(), need));
        }
        let window = &daily[daily.len() - need..];
        let close = window[window.len() - 1].close;

        let Some(swing) = find_swing(window) else {
            return Ok(ModuleResult::hold("fibonacci: no price swing in window"));
        };
        let range = swing.high - swing.low;

        let (level, price, distance) = RETRACEMENT_LEVELS
            .iter()
            .map(|&level| {
                let price = if swing.upswing {
                    swing.high - range * level
                } else {
                    swing.low + range * level
                };
                (level, price, (close - price).abs() / price)
            })
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .ok_or_else(|| ModuleError::Failed {
                module: FIBONACCI.to_string(),
                reason: "no retracement levels".to_string(),
            })?;

        if !distance.is_finite() {
            return Err(ModuleError::NonFinite {
                module: FIBONACCI.to_string(),
                field: "distance",
            });
        }

        let result = if distance <= self.config.proximity_pct {
            let strength = 1.0 - distance / self.config.proximity_pct;
            let confidence = strength * level_factor(level);
            let (signal, swing_name) = if swing.upswing {
                (Signal::Long, "upswing")
            } else {
                (Signal::Short, "downswing")
            };
            ModuleResult::directional(
                signal,
                strength,
                confidence,
                format!(
                    "Price {:.2} at the {:.1}% retracement ({:.2}) of the {}",
                    close,
                    level * 100.0,
                    price,
                    swing_name
                ),
            )
        } else {
            ModuleResult::hold(format!(
                "fibonacci: price {:.2}% from the nearest level",
                distance * 100.0
            ))
        };

        Ok(result
            .with_metric("fib_level", level)
            .with_metric("fib_distance", distance)
            .with_metric("swing_high", swing.high)
            .with_metric("swing_low", swing.low))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn bars_from(closes: &[f64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| OhlcvBar {
                date: start + Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 100.0,
            })
            .collect()
    }

    /// 51 bars from `first` to `peak`, then 39 bars to `last`.
    fn swing(first: f64, peak: f64, last: f64) -> Vec<f64> {
        let mut closes: Vec<f64> = (0..=50)
            .map(|i| first + (peak - first) * i as f64 / 50.0)
            .collect();
        closes.extend((51..90).map(|i| peak + (last - peak) * (i - 50) as f64 / 39.0));
        closes
    }

    fn run(closes: &[f64]) -> ModuleResult {
        let bars = bars_from(closes);
        let as_of = bars[bars.len() - 1].date + Duration::days(1);
        let ctx = DecisionContext::new(&bars, &[], as_of);
        FibonacciModule::new(FibonacciConfig::default())
            .analyze(&ctx)
            .unwrap()
    }

    #[test]
    fn pullback_to_half_of_upswing_is_long() {
        let result = run(&swing(100.0, 200.0, 150.0));
        assert_eq!(result.signal, Signal::Long);
        assert_relative_eq!(result.confidence, 1.0, epsilon = 1e-9);
        assert_eq!(result.metrics["fib_level"], 0.5);
    }

    #[test]
    fn bounce_into_downswing_is_short() {
        let result = run(&swing(200.0, 100.0, 150.0));
        assert_eq!(result.signal, Signal::Short);
        assert!(result.reason.contains("downswing"));
    }

    #[test]
    fn shallow_level_gets_reduced_confidence() {
        // 0.236 retracement of 100..200 is 176.4
        let result = run(&swing(100.0, 200.0, 176.4));
        assert_eq!(result.signal, Signal::Long);
        assert_relative_eq!(result.confidence, 0.8, epsilon = 1e-6);
    }

    #[test]
    fn price_between_levels_holds() {
        let result = run(&swing(100.0, 200.0, 190.0));
        assert_eq!(result.signal, Signal::Hold);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn short_history_is_insufficient() {
        let result = run(&[100.0; 30]);
        assert_eq!(result.signal, Signal::Hold);
        assert!(result.reason.contains("insufficient"));
    }

    #[test]
    fn flat_window_has_no_swing() {
        let result = run(&[100.0; 90]);
        assert!(result.reason.contains("no price swing"));
    }
}
