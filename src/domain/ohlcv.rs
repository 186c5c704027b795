//! OHLCV bar representation and timeframe handling.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Daily,
    Weekly,
}

impl Timeframe {
    /// Length of one bucket. A bar dated `d` is closed once `d + span <= as_of`.
    pub fn span(self) -> Duration {
        match self {
            Timeframe::Daily => Duration::days(1),
            Timeframe::Weekly => Duration::days(7),
        }
    }

    pub fn is_closed(self, bar_date: NaiveDate, as_of: NaiveDate) -> bool {
        bar_date + self.span() <= as_of
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::Daily => write!(f, "daily"),
            Timeframe::Weekly => write!(f, "weekly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Why a bar is considered corrupt.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BarDefect {
    #[error("non-finite value")]
    NonFinite,
    #[error("non-positive price")]
    NonPositivePrice,
    #[error("negative volume")]
    NegativeVolume,
    #[error("low above body")]
    LowAboveBody,
    #[error("high below body")]
    HighBelowBody,
}

impl OhlcvBar {
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// (close - low) / (high - low), 0.5 for a zero-range bar.
    pub fn close_position(&self) -> f64 {
        let range = self.range();
        if range <= 0.0 {
            0.5
        } else {
            (self.close - self.low) / range
        }
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    pub fn check(&self) -> Result<(), BarDefect> {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(BarDefect::NonFinite);
        }
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(BarDefect::NonPositivePrice);
        }
        if self.volume < 0.0 {
            return Err(BarDefect::NegativeVolume);
        }
        if self.low > self.open.min(self.close) {
            return Err(BarDefect::LowAboveBody);
        }
        if self.high < self.open.max(self.close) {
            return Err(BarDefect::HighBelowBody);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }
}

/// Keep only bars that are fully elapsed at `as_of`.
pub fn closed_bars(bars: &[OhlcvBar], timeframe: Timeframe, as_of: NaiveDate) -> Vec<OhlcvBar> {
    bars.iter()
        .filter(|b| timeframe.is_closed(b.date, as_of))
        .cloned()
        .collect()
}

/// Aggregate daily bars into ISO weeks dated by their Monday.
///
/// Input must be sorted by date. A week is emitted even if partially filled;
/// callers that need closed weeks filter with [`closed_bars`]. Corrupt days
/// are left out of the aggregate.
pub fn resample_weekly(daily: &[OhlcvBar]) -> Vec<OhlcvBar> {
    let mut weeks: Vec<OhlcvBar> = Vec::new();

    for bar in daily.iter().filter(|b| b.is_valid()) {
        let monday = bar.date - Duration::days(bar.date.weekday().num_days_from_monday() as i64);
        match weeks.last_mut() {
            Some(week) if week.date == monday => {
                week.high = week.high.max(bar.high);
                week.low = week.low.min(bar.low);
                week.close = bar.close;
                week.volume += bar.volume;
            }
            _ => weeks.push(OhlcvBar {
                date: monday,
                ..bar.clone()
            }),
        }
    }

    weeks
}
