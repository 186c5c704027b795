//! Decision context: the closed-candle view handed to every analysis module.
//!
//! Both the live path and the backtest path go through [`DecisionContext::new`],
//! which drops every candle not fully elapsed at `as_of`. Evaluation never
//! sees anything else, which is what makes the two paths agree.

use crate::domain::error::ContextError;
use crate::domain::ohlcv::{OhlcvBar, Timeframe, closed_bars};
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionContext {
    daily: Vec<OhlcvBar>,
    weekly: Vec<OhlcvBar>,
    as_of: NaiveDate,
}

impl DecisionContext {
    /// Build a context from series that may extend past `as_of`.
    pub fn new(daily: &[OhlcvBar], weekly: &[OhlcvBar], as_of: NaiveDate) -> Self {
        Self {
            daily: closed_bars(daily, Timeframe::Daily, as_of),
            weekly: closed_bars(weekly, Timeframe::Weekly, as_of),
            as_of,
        }
    }

    /// Build a context from series taken as-is. [`validate`](Self::validate)
    /// rejects it if any candle is still open at `as_of`.
    pub fn from_parts(daily: Vec<OhlcvBar>, weekly: Vec<OhlcvBar>, as_of: NaiveDate) -> Self {
        Self {
            daily,
            weekly,
            as_of,
        }
    }

    pub fn daily(&self) -> &[OhlcvBar] {
        &self.daily
    }

    pub fn weekly(&self) -> &[OhlcvBar] {
        &self.weekly
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn latest_daily(&self) -> Option<&OhlcvBar> {
        self.daily.last()
    }

    pub fn validate(&self) -> Result<(), ContextError> {
        if self.weekly.is_empty() {
            return Err(ContextError::EmptySeries {
                timeframe: Timeframe::Weekly,
            });
        }
        check_series(&self.daily, Timeframe::Daily, self.as_of)?;
        check_series(&self.weekly, Timeframe::Weekly, self.as_of)?;
        Ok(())
    }
}

fn check_series(
    bars: &[OhlcvBar],
    timeframe: Timeframe,
    as_of: NaiveDate,
) -> Result<(), ContextError> {
    for pair in bars.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(ContextError::Unordered {
                timeframe,
                date: pair[1].date,
            });
        }
    }
    if let Some(last) = bars.last() {
        if !timeframe.is_closed(last.date, as_of) {
            return Err(ContextError::LookAhead {
                timeframe,
                date: last.date,
                as_of,
            });
        }
    }
    Ok(())
}
