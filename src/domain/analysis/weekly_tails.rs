//! Weekly tail (wick rejection) analyzer.
//!
//! Scans the last `lookback_weeks` closed weekly candles for a dominant wick
//! that is large against the trailing ATR, sits on a small body, and closes
//! back toward the opposite extreme. A long lower wick is buyers rejecting
//! lower prices (LONG); a long upper wick is sellers rejecting higher prices
//! (SHORT). The most recent qualifying candle decides.
//!
//! Corrupt rows are dropped before the scan and never abort it.

use crate::domain::analysis::AnalysisModule;
use crate::domain::config::{TailConfig, WEEKLY_TAILS};
use crate::domain::context::DecisionContext;
use crate::domain::error::ModuleError;
use crate::domain::indicator_helpers::trailing_mean_true_range;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::{ModuleResult, Signal};
use tracing::{debug, warn};

pub struct WeeklyTailAnalyzer {
    config: TailConfig,
}

impl WeeklyTailAnalyzer {
    pub fn new(config: TailConfig) -> Self {
        Self { config }
    }
}

impl AnalysisModule for WeeklyTailAnalyzer {
    fn name(&self) -> &'static str {
        WEEKLY_TAILS
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn analyze(&self, ctx: &DecisionContext) -> Result<ModuleResult, ModuleError> {
        Ok(calculate_tail_strength(ctx.weekly(), &self.config))
    }
}

/// Geometry of one candle measured against its ATR baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TailMeasure {
    pub direction: Signal,
    pub ratio: f64,
    pub body_atr: f64,
    /// Close position measured from the wick's extreme: (close - low) / range
    /// for a lower wick, (high - close) / range for an upper wick.
    pub rejection_pos: f64,
    pub atr: f64,
}

impl TailMeasure {
    pub fn qualifies(&self, config: &TailConfig) -> bool {
        self.ratio >= config.min_tail_ratio
            && self.body_atr <= config.max_body_atr
            && self.rejection_pos >= config.min_close_pos
    }
}

/// Measure a candle's dominant wick. `None` for zero-range candles, a
/// non-positive ATR, or equal wicks (no direction).
pub fn measure_tail(bar: &OhlcvBar, atr: f64) -> Option<TailMeasure> {
    let range = bar.range();
    if range <= 0.0 || !(atr > 0.0) {
        return None;
    }

    let upper = bar.upper_wick();
    let lower = bar.lower_wick();
    let (direction, wick, rejection_pos) = if lower > upper {
        (Signal::Long, lower, (bar.close - bar.low) / range)
    } else if upper > lower {
        (Signal::Short, upper, (bar.high - bar.close) / range)
    } else {
        return None;
    };

    Some(TailMeasure {
        direction,
        ratio: wick / atr,
        body_atr: bar.body() / atr,
        rejection_pos,
        atr,
    })
}

struct Candidate {
    index: usize,
    measure: TailMeasure,
}

pub fn calculate_tail_strength(weekly: &[OhlcvBar], config: &TailConfig) -> ModuleResult {
    let usable: Vec<OhlcvBar> = weekly.iter().filter(|b| b.is_valid()).cloned().collect();
    let excluded = weekly.len() - usable.len();
    if excluded > 0 {
        warn!(excluded, "weekly tails: excluded corrupt candles");
    }

    let lookback = config.lookback_weeks.max(1);
    if usable.len() < lookback {
        return ModuleResult::hold(format!(
            "insufficient data: {} usable weekly candles, need {}",
            usable.len(),
            lookback
        ))
        .with_metric("excluded_rows", excluded as f64);
    }

    let atr = trailing_mean_true_range(&usable, config.atr_period);
    let start = usable.len() - lookback;

    let best = (start..usable.len())
        .filter_map(|index| {
            let measure = measure_tail(&usable[index], atr[index])?;
            measure
                .qualifies(config)
                .then_some(Candidate { index, measure })
        })
        .max_by(|a, b| {
            a.index
                .cmp(&b.index)
                .then(a.measure.ratio.total_cmp(&b.measure.ratio))
        });

    let Some(Candidate { index, measure }) = best else {
        debug!(window = lookback, "weekly tails: no qualifying candle");
        return ModuleResult::hold("no qualifying tails found in lookback window")
            .with_metric("excluded_rows", excluded as f64);
    };

    let bar = &usable[index];
    let weeks_ago = usable.len() - 1 - index;
    let strength = (measure.ratio / config.min_tail_strength).min(1.0);

    let prior = &usable[index.saturating_sub(lookback)..index];
    let volume_ratio = if prior.is_empty() {
        None
    } else {
        let mean = prior.iter().map(|b| b.volume).sum::<f64>() / prior.len() as f64;
        (mean > 0.0).then(|| bar.volume / mean)
    };
    let volume_confirmed = volume_ratio.is_some_and(|r| r > 1.0);
    let confidence = if volume_confirmed {
        (strength * config.volume_bonus).min(1.0)
    } else {
        strength
    };

    let (label, wick) = match measure.direction {
        Signal::Long => ("Bullish", "lower"),
        _ => ("Bearish", "upper"),
    };
    let reason = format!(
        "{} weekly tail rejection {} week(s) ago: {} wick {:.2}x ATR, close {:.0}% off the extreme{}",
        label,
        weeks_ago,
        wick,
        measure.ratio,
        measure.rejection_pos * 100.0,
        if volume_confirmed { ", volume confirmed" } else { "" }
    );

    debug!(
        direction = %measure.direction,
        ratio = measure.ratio,
        strength,
        confidence,
        weeks_ago,
        "weekly tails: qualifying candle"
    );

    let mut result = ModuleResult::directional(measure.direction, strength, confidence, reason)
        .with_metric("tail_ratio", measure.ratio)
        .with_metric("body_atr", measure.body_atr)
        .with_metric("close_position", bar.close_position())
        .with_metric("atr", measure.atr)
        .with_metric("weeks_ago", weeks_ago as f64)
        .with_metric("excluded_rows", excluded as f64);
    if let Some(ratio) = volume_ratio {
        result = result.with_metric("volume_ratio", ratio);
    }
    result
}
