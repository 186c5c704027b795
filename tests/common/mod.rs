#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use tailsignal::domain::config::{GateConfig, ModuleWeights, SignalConfig, WEEKLY_TAILS};
use tailsignal::domain::error::TailSignalError;
pub use tailsignal::domain::ohlcv::OhlcvBar;
use tailsignal::domain::ohlcv::Timeframe;
use tailsignal::ports::data_port::DataPort;

/// In-memory data port keyed by `(symbol, timeframe)`.
pub struct MockDataPort {
    pub data: HashMap<(String, Timeframe), Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, timeframe: Timeframe, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert((symbol.to_string(), timeframe), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    fn bars(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<OhlcvBar>, TailSignalError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TailSignalError::Data {
                reason: reason.clone(),
            });
        }
        self.data
            .get(&(symbol.to_string(), timeframe))
            .cloned()
            .ok_or_else(|| TailSignalError::NoData {
                symbol: symbol.to_string(),
                timeframe,
            })
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TailSignalError> {
        let mut bars = self.bars(symbol, timeframe)?;
        bars.retain(|b| b.date >= start && b.date <= end);
        Ok(bars)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TailSignalError> {
        let bars = match self.bars(symbol, timeframe) {
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

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// First Monday of 2024.
pub fn origin() -> NaiveDate {
    date(2024, 1, 1)
}

pub fn bar(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> OhlcvBar {
    OhlcvBar {
        date,
        open,
        high,
        low,
        close,
        volume,
    }
}

/// `count` weekly candles from `origin()`, each open=close=500 with a
/// symmetric 10-point range and volume 100.
pub fn flat_weeks(count: usize) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| {
            bar(
                origin() + Duration::weeks(i as i64),
                500.0,
                510.0,
                490.0,
                500.0,
                100.0,
            )
        })
        .collect()
}

/// Eleven flat weeks followed by a hammer: O=500 C=495 L=450 H=520, at twice
/// the trailing volume.
pub fn hammer_weeks() -> Vec<OhlcvBar> {
    let mut weeks = flat_weeks(11);
    weeks.push(bar(
        origin() + Duration::weeks(11),
        500.0,
        520.0,
        450.0,
        495.0,
        200.0,
    ));
    weeks
}

/// Date at which every candle in `weeks` is closed.
pub fn after_weeks(weeks: &[OhlcvBar]) -> NaiveDate {
    weeks.last().unwrap().date + Duration::weeks(1)
}

/// Deterministic daily walk with a few weekly cycles of drift.
pub fn wavy_daily(count: usize, start_price: f64) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            let close = start_price + 15.0 * (t / 9.0).sin() + 0.2 * t;
            let open = close - 2.0 * (t / 4.0).cos();
            bar(
                origin() + Duration::days(i as i64),
                open,
                open.max(close) + 3.0 + (t / 5.0).sin().abs(),
                open.min(close) - 3.0 - (t / 7.0).cos().abs(),
                close,
                1000.0 + 200.0 * (t / 3.0).sin(),
            )
        })
        .collect()
}

/// Flat daily series with open=close=`price` and a 2% range.
pub fn flat_daily(count: usize, price: f64) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| {
            bar(
                origin() + Duration::days(i as i64),
                price,
                price * 1.01,
                price * 0.99,
                price,
                1000.0,
            )
        })
        .collect()
}

/// Only the tail analyzer carries weight, and the guards never penalize.
pub fn tails_only_config(threshold: f64) -> SignalConfig {
    SignalConfig {
        weights: ModuleWeights::new().with(WEEKLY_TAILS, 1.0),
        gates: GateConfig {
            threshold,
            volume_penalty: 1.0,
            volatility_penalty: 1.0,
            ..GateConfig::default()
        },
        ..SignalConfig::default()
    }
}

/// Render bars in the CSV adapter's file layout.
pub fn to_csv(bars: &[OhlcvBar]) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.volume
        ));
    }
    out
}
