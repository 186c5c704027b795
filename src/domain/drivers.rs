//! Live and backtest drivers.
//!
//! Both paths end in [`DecisionContext::new`] over the same candle series,
//! differing only in where the series come from: the live path fetches up to
//! `now` from a [`DataPort`], the backtest path slices a preloaded history.
//! Full history is always used so path-dependent indicators (EMA, Wilder
//! smoothing) seed identically on both paths.

use crate::domain::config_validation::{parse_date, validate_backtest_config};
use crate::domain::context::DecisionContext;
use crate::domain::engine::DecisionEngine;
use crate::domain::error::TailSignalError;
use crate::domain::ohlcv::{OhlcvBar, Timeframe, closed_bars};
use crate::domain::signal::{AggregateDecision, Signal};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct MarketHistory {
    pub symbol: String,
    pub daily: Vec<OhlcvBar>,
    pub weekly: Vec<OhlcvBar>,
}

impl MarketHistory {
    /// First and last evaluation dates at which the latest daily candle is
    /// closed.
    pub fn evaluation_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.daily.first()?.date.checked_add_days(Days::new(1))?;
        let last = self.daily.last()?.date.checked_add_days(Days::new(1))?;
        Some((first, last))
    }
}

/// Fetch every daily and weekly candle up to and including `end`.
pub fn load_history(
    port: &dyn DataPort,
    symbol: &str,
    end: NaiveDate,
) -> Result<MarketHistory, TailSignalError> {
    let daily = port.fetch_ohlcv(symbol, Timeframe::Daily, NaiveDate::MIN, end)?;
    let weekly = port.fetch_ohlcv(symbol, Timeframe::Weekly, NaiveDate::MIN, end)?;
    debug!(
        symbol,
        daily = daily.len(),
        weekly = weekly.len(),
        "history loaded"
    );
    Ok(MarketHistory {
        symbol: symbol.to_string(),
        daily,
        weekly,
    })
}

/// Context for a live evaluation at `now`: only candles closed by `now`.
///
/// Only fetch failures are errors. A context with nothing closed yet is
/// still returned so [`DecisionEngine::decide`] rejects it exactly as it
/// would on the backtest path.
pub fn live_context(
    port: &dyn DataPort,
    symbol: &str,
    now: NaiveDate,
) -> Result<DecisionContext, TailSignalError> {
    let daily = port.fetch_ohlcv(symbol, Timeframe::Daily, NaiveDate::MIN, now)?;
    let weekly = port.fetch_ohlcv(symbol, Timeframe::Weekly, NaiveDate::MIN, now)?;
    let weekly = closed_bars(&weekly, Timeframe::Weekly, now);
    Ok(DecisionContext::new(&daily, &weekly, now))
}

/// Context for a historical evaluation at `as_of`.
pub fn backtest_context(history: &MarketHistory, as_of: NaiveDate) -> DecisionContext {
    DecisionContext::new(&history.daily, &history.weekly, as_of)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSettings {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub step_days: u64,
    pub horizon_days: u64,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            step_days: 1,
            horizon_days: 7,
        }
    }
}

impl BacktestSettings {
    /// Read the optional `[backtest]` section.
    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, TailSignalError> {
        validate_backtest_config(port)?;
        let defaults = Self::default();
        Ok(Self {
            start: parse_date(port, "start_date")?,
            end: parse_date(port, "end_date")?,
            step_days: port
                .get_int("backtest", "step_days", defaults.step_days as i64)
                .max(1) as u64,
            horizon_days: port
                .get_int("backtest", "horizon_days", defaults.horizon_days as i64)
                .max(1) as u64,
        })
    }
}

/// One evaluation point of a backtest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub date: NaiveDate,
    /// Close of the latest closed daily candle.
    pub close: f64,
    pub decision: AggregateDecision,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BacktestSummary {
    pub decisions: usize,
    pub longs: usize,
    pub shorts: usize,
    pub holds: usize,
    /// Mean confidence of directional decisions.
    pub mean_confidence: Option<f64>,
    /// Directional decisions with a closed candle `horizon_days` later.
    pub evaluated: usize,
    pub hits: usize,
    pub hit_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReport {
    pub records: Vec<DecisionRecord>,
    pub summary: BacktestSummary,
}

/// Walk forward from `start` to `end` inclusive, deciding every `step_days`.
/// Dates before the first closed daily candle are skipped.
pub fn run_backtest(
    engine: &DecisionEngine,
    history: &MarketHistory,
    settings: &BacktestSettings,
) -> Result<BacktestReport, TailSignalError> {
    let Some((first, last)) = history.evaluation_span() else {
        return Err(TailSignalError::NoData {
            symbol: history.symbol.clone(),
            timeframe: Timeframe::Daily,
        });
    };
    let start = settings.start.unwrap_or(first).max(first);
    let end = settings.end.unwrap_or(last);
    info!(symbol = %history.symbol, %start, %end, step = settings.step_days, "backtest started");

    let mut records = Vec::new();
    let mut date = start;
    while date <= end {
        let ctx = backtest_context(history, date);
        if let Some(close) = ctx.latest_daily().map(|b| b.close) {
            let decision = engine.decide(&ctx);
            records.push(DecisionRecord {
                date,
                close,
                decision,
            });
        }
        match date.checked_add_days(Days::new(settings.step_days.max(1))) {
            Some(next) => date = next,
            None => break,
        }
    }

    let summary = summarize(&records, history, settings.horizon_days);
    info!(
        symbol = %history.symbol,
        decisions = summary.decisions,
        longs = summary.longs,
        shorts = summary.shorts,
        hit_rate = summary.hit_rate.unwrap_or(f64::NAN),
        "backtest finished"
    );
    Ok(BacktestReport { records, summary })
}

/// Close of the latest daily candle closed by `date`.
fn close_at(daily: &[OhlcvBar], date: NaiveDate) -> Option<(NaiveDate, f64)> {
    daily
        .iter()
        .rev()
        .find(|b| Timeframe::Daily.is_closed(b.date, date))
        .map(|b| (b.date, b.close))
}

pub fn summarize(
    records: &[DecisionRecord],
    history: &MarketHistory,
    horizon_days: u64,
) -> BacktestSummary {
    let mut summary = BacktestSummary {
        decisions: records.len(),
        ..BacktestSummary::default()
    };
    let mut confidence_sum = 0.0;
    let last_eval = history.evaluation_span().map(|(_, last)| last);

    for record in records {
        let signal = record.decision.signal;
        match signal {
            Signal::Long => summary.longs += 1,
            Signal::Short => summary.shorts += 1,
            Signal::Hold => {
                summary.holds += 1;
                continue;
            }
        }
        confidence_sum += record.decision.confidence;

        let Some(exit_date) = record.date.checked_add_days(Days::new(horizon_days)) else {
            continue;
        };
        let entry = close_at(&history.daily, record.date);
        let exit = close_at(&history.daily, exit_date);
        let (Some((entry_day, entry_close)), Some((exit_day, exit_close))) = (entry, exit) else {
            continue;
        };
        if exit_day <= entry_day || last_eval.is_some_and(|last| exit_date > last) {
            continue;
        }
        summary.evaluated += 1;
        let hit = match signal {
            Signal::Long => exit_close > entry_close,
            _ => exit_close < entry_close,
        };
        if hit {
            summary.hits += 1;
        }
    }

    let directional = summary.longs + summary.shorts;
    if directional > 0 {
        summary.mean_confidence = Some(confidence_sum / directional as f64);
    }
    if summary.evaluated > 0 {
        summary.hit_rate = Some(summary.hits as f64 / summary.evaluated as f64);
    }
    summary
}
