//! Market regime classification from the daily trend.

use crate::domain::config::RegimeConfig;
use crate::domain::indicator_helpers::calc_sma;
use crate::domain::ohlcv::OhlcvBar;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    StrongBull,
    Bull,
    Neutral,
    Bear,
    StrongBear,
}

impl MarketRegime {
    /// Ordinal used in metrics: 2 strong bull .. -2 strong bear.
    pub fn score(self) -> f64 {
        match self {
            MarketRegime::StrongBull => 2.0,
            MarketRegime::Bull => 1.0,
            MarketRegime::Neutral => 0.0,
            MarketRegime::Bear => -1.0,
            MarketRegime::StrongBear => -2.0,
        }
    }
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarketRegime::StrongBull => "strong bull",
            MarketRegime::Bull => "bull",
            MarketRegime::Neutral => "neutral",
            MarketRegime::Bear => "bear",
            MarketRegime::StrongBear => "strong bear",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeReading {
    pub regime: MarketRegime,
    pub close: f64,
    pub fast_sma: f64,
    pub slow_sma: f64,
    /// (fast - slow) / slow
    pub spread: f64,
}

/// Classify the regime at the last daily bar. `None` until the slow SMA has
/// warmed up.
pub fn classify(daily: &[OhlcvBar], config: &RegimeConfig) -> Option<RegimeReading> {
    let close = daily.last()?.close;
    let fast_sma = calc_sma(daily, config.fast_period).latest_simple()?;
    let slow_sma = calc_sma(daily, config.slow_period).latest_simple()?;
    if slow_sma <= 0.0 {
        return None;
    }
    let spread = (fast_sma - slow_sma) / slow_sma;

    let regime = if close > fast_sma && fast_sma > slow_sma {
        if spread >= config.strong_spread {
            MarketRegime::StrongBull
        } else {
            MarketRegime::Bull
        }
    } else if close < fast_sma && fast_sma < slow_sma {
        if -spread >= config.strong_spread {
            MarketRegime::StrongBear
        } else {
            MarketRegime::Bear
        }
    } else if close > slow_sma && fast_sma > slow_sma {
        MarketRegime::Bull
    } else if close < slow_sma && fast_sma < slow_sma {
        MarketRegime::Bear
    } else {
        MarketRegime::Neutral
    };

    Some(RegimeReading {
        regime,
        close,
        fast_sma,
        slow_sma,
        spread,
    })
}
