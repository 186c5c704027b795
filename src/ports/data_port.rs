//! Candle data access port trait.

use crate::domain::error::TailSignalError;
use crate::domain::ohlcv::{OhlcvBar, Timeframe};
use chrono::NaiveDate;

pub trait DataPort {
    /// Candles of `timeframe` dated within `start..=end`, ascending by date.
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TailSignalError>;

    /// First date, last date and candle count, or `None` with no data.
    fn get_data_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TailSignalError>;
}
