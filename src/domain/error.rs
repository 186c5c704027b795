//! Domain error types.

use crate::domain::ohlcv::Timeframe;
use chrono::NaiveDate;

/// Top-level error type for tailsignal.
///
/// Only raised outside the decision core (loading data, reading config,
/// writing reports). [`crate::domain::engine::DecisionEngine::decide`] never
/// returns it.
#[derive(Debug, thiserror::Error)]
pub enum TailSignalError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no {timeframe} data for {symbol}")]
    NoData { symbol: String, timeframe: Timeframe },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TailSignalError {
    pub(crate) fn missing(section: &str, key: &str) -> Self {
        TailSignalError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TailSignalError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TailSignalError> for std::process::ExitCode {
    fn from(err: &TailSignalError) -> Self {
        let code: u8 = match err {
            TailSignalError::Io(_) => 1,
            TailSignalError::ConfigParse { .. }
            | TailSignalError::ConfigMissing { .. }
            | TailSignalError::ConfigInvalid { .. } => 2,
            TailSignalError::Data { .. } | TailSignalError::Csv(_) => 3,
            TailSignalError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Failure inside one analysis module. Mapped to an `Error` module result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModuleError {
    #[error("{module}: {reason}")]
    Failed { module: String, reason: String },

    #[error("{module}: produced non-finite {field}")]
    NonFinite { module: String, field: &'static str },
}

/// Failure while evaluating a gate. Forces the decision to HOLD/0.0.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GateError {
    #[error("gate {gate}: {reason}")]
    InvalidInput { gate: &'static str, reason: String },
}

/// A context that breaks the closed-candle visibility contract.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContextError {
    #[error("{timeframe} series is empty")]
    EmptySeries { timeframe: Timeframe },

    #[error("{timeframe} series not strictly increasing at {date}")]
    Unordered { timeframe: Timeframe, date: NaiveDate },

    #[error("{timeframe} candle {date} is not closed at {as_of}")]
    LookAhead {
        timeframe: Timeframe,
        date: NaiveDate,
        as_of: NaiveDate,
    },
}
