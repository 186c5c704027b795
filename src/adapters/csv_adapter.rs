//! CSV file data adapter.
//!
//! Reads `<base>/<SYMBOL>_<daily|weekly>.csv` with header
//! `date,open,high,low,close,volume`. When the weekly file is absent the
//! weekly series is resampled from the daily file.
//!
//! Rows that parse but break candle geometry are kept and logged. Analysis
//! excludes them, so one bad candle never aborts a run.

use crate::domain::error::TailSignalError;
use crate::domain::ohlcv::{OhlcvBar, Timeframe, resample_weekly};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{debug, warn};

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, timeframe))
    }

    fn load(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<OhlcvBar>, TailSignalError> {
        let path = self.csv_path(symbol, timeframe);
        if !path.exists() {
            if timeframe == Timeframe::Weekly {
                debug!(symbol, "no weekly file, resampling daily candles");
                let daily = self.load(symbol, Timeframe::Daily)?;
                return Ok(resample_weekly(&daily));
            }
            return Err(TailSignalError::NoData {
                symbol: symbol.to_string(),
                timeframe,
            });
        }

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)?;
        let mut bars = Vec::new();
        let mut corrupt = 0usize;
        for row in rdr.deserialize::<OhlcvBar>() {
            let bar: OhlcvBar = row?;
            if let Err(defect) = bar.check() {
                warn!(symbol, %timeframe, date = %bar.date, %defect, "corrupt candle");
                corrupt += 1;
            }
            bars.push(bar);
        }
        if corrupt > 0 {
            warn!(
                symbol,
                %timeframe,
                corrupt,
                path = %path.display(),
                "corrupt candles left for analysis to exclude"
            );
        }

        bars.sort_by_key(|b| b.date);
        if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(TailSignalError::Data {
                reason: format!(
                    "duplicate {} candle for {} on {} in {}",
                    timeframe,
                    symbol,
                    pair[1].date,
                    path.display()
                ),
            });
        }
        debug!(symbol, %timeframe, bars = bars.len(), path = %path.display(), "loaded candles");
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TailSignalError> {
        let mut bars = self.load(symbol, timeframe)?;
        bars.retain(|b| b.date >= start && b.date <= end);
        Ok(bars)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TailSignalError> {
        let bars = match self.load(symbol, timeframe) {
            Ok(bars) => bars,
            Err(TailSignalError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::BarDefect;
    use std::fs;
    use tempfile::TempDir;

    const DAILY: &str = "date,open,high,low,close,volume\n\
        2024-01-03,42000.0,43000.0,41500.0,42800.0,1200.5\n\
        2024-01-01,40000.0,41000.0,39500.0,40800.0,1000.0\n\
        2024-01-02,40800.0,42100.0,40500.0,42000.0,1500.0\n\
        2024-01-08,43000.0,44000.0,42000.0,43500.0,900.0\n";

    fn setup(files: &[(&str, &str)]) -> (TempDir, CsvAdapter) {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        (dir, adapter)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn fetch_daily_sorts_and_parses() {
        let (_dir, adapter) = setup(&[("BTC_daily.csv", DAILY)]);
        let bars = adapter
            .fetch_ohlcv("BTC", Timeframe::Daily, NaiveDate::MIN, date(2024, 12, 31))
            .unwrap();
        assert_eq!(bars.len(), 4);
        assert_eq!(bars[0].date, date(2024, 1, 1));
        assert_eq!(bars[0].open, 40000.0);
        assert_eq!(bars[2].volume, 1200.5);
    }

    #[test]
    fn fetch_filters_by_date() {
        let (_dir, adapter) = setup(&[("BTC_daily.csv", DAILY)]);
        let bars = adapter
            .fetch_ohlcv("BTC", Timeframe::Daily, date(2024, 1, 2), date(2024, 1, 3))
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date(2024, 1, 2));
    }

    #[test]
    fn missing_weekly_file_resamples_daily() {
        let (_dir, adapter) = setup(&[("BTC_daily.csv", DAILY)]);
        let weekly = adapter
            .fetch_ohlcv("BTC", Timeframe::Weekly, NaiveDate::MIN, date(2024, 12, 31))
            .unwrap();
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].date, date(2024, 1, 1));
        assert_eq!(weekly[0].open, 40000.0);
        assert_eq!(weekly[0].close, 42800.0);
        assert_eq!(weekly[0].high, 43000.0);
        assert_eq!(weekly[0].low, 39500.0);
        assert_eq!(weekly[0].volume, 3700.5);
    }

    #[test]
    fn weekly_file_is_preferred() {
        let weekly_csv = "date,open,high,low,close,volume\n2024-01-01,1.0,2.0,0.5,1.5,10\n";
        let (_dir, adapter) = setup(&[("BTC_daily.csv", DAILY), ("BTC_weekly.csv", weekly_csv)]);
        let weekly = adapter
            .fetch_ohlcv("BTC", Timeframe::Weekly, NaiveDate::MIN, date(2024, 12, 31))
            .unwrap();
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].close, 1.5);
    }

    #[test]
    fn missing_symbol_is_no_data() {
        let (_dir, adapter) = setup(&[]);
        let err = adapter
            .fetch_ohlcv("ETH", Timeframe::Daily, NaiveDate::MIN, date(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(
            err,
            TailSignalError::NoData {
                timeframe: Timeframe::Daily,
                ..
            }
        ));
        assert_eq!(adapter.get_data_range("ETH", Timeframe::Daily).unwrap(), None);
    }

    #[test]
    fn corrupt_candle_does_not_fail_the_load() {
        let csv = "date,open,high,low,close,volume\n\
            2024-01-01,40000.0,41000.0,39500.0,40800.0,1000.0\n\
            2024-01-02,100.0,99.0,95.0,98.0,10\n\
            2024-01-03,42000.0,43000.0,41500.0,42800.0,1200.5\n";
        let (_dir, adapter) = setup(&[("BTC_daily.csv", csv)]);
        let daily = adapter
            .fetch_ohlcv("BTC", Timeframe::Daily, NaiveDate::MIN, date(2024, 1, 31))
            .unwrap();
        assert_eq!(daily.len(), 3);
        assert_eq!(daily[1].check(), Err(BarDefect::HighBelowBody));
        assert!(daily[0].is_valid() && daily[2].is_valid());

        // the resampled week is built from the two good days only
        let weekly = adapter
            .fetch_ohlcv("BTC", Timeframe::Weekly, NaiveDate::MIN, date(2024, 1, 31))
            .unwrap();
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].volume, 2200.5);
        assert_eq!(weekly[0].low, 39500.0);
    }

    #[test]
    fn unparsable_row_is_csv_error() {
        let csv = "date,open,high,low,close,volume\n2024-01-01,abc,99.0,95.0,98.0,10\n";
        let (_dir, adapter) = setup(&[("BTC_daily.csv", csv)]);
        let err = adapter
            .fetch_ohlcv("BTC", Timeframe::Daily, NaiveDate::MIN, date(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(err, TailSignalError::Csv(_)));
    }

    #[test]
    fn duplicate_dates_are_rejected() {
        let csv = "date,open,high,low,close,volume\n\
            2024-01-01,1.0,2.0,0.5,1.5,10\n\
            2024-01-01,1.0,2.0,0.5,1.5,10\n";
        let (_dir, adapter) = setup(&[("BTC_daily.csv", csv)]);
        let err = adapter
            .fetch_ohlcv("BTC", Timeframe::Daily, NaiveDate::MIN, date(2024, 1, 31))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate daily candle"));
    }

    #[test]
    fn data_range_reports_span() {
        let (_dir, adapter) = setup(&[("BTC_daily.csv", DAILY)]);
        assert_eq!(
            adapter.get_data_range("BTC", Timeframe::Daily).unwrap(),
            Some((date(2024, 1, 1), date(2024, 1, 8), 4))
        );
    }
}
