//! Configuration validation.
//!
//! Validates raw config values before the typed config is built, so a bad
//! file is rejected at construction rather than mid-run.

use crate::domain::config::{MODULE_NAMES, WEEKLY_TAILS};
use crate::domain::error::TailSignalError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_signal_config(config: &dyn ConfigPort) -> Result<(), TailSignalError> {
    validate_weights(config)?;
    validate_tails(config)?;
    validate_gates(config)?;
    validate_regime(config)?;
    validate_modules(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TailSignalError> {
    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;
    check_date_range(start, end)?;
    if read_int(config, "backtest", "horizon_days", 7)? < 1 {
        return Err(TailSignalError::invalid(
            "backtest",
            "horizon_days",
            "horizon_days must be at least 1",
        ));
    }
    if read_int(config, "backtest", "step_days", 1)? < 1 {
        return Err(TailSignalError::invalid(
            "backtest",
            "step_days",
            "step_days must be at least 1",
        ));
    }
    Ok(())
}

/// Backtest ranges are inclusive, so `start == end` is a single-day run.
pub fn check_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), TailSignalError> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(TailSignalError::invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        )),
        _ => Ok(()),
    }
}

pub(crate) fn parse_date(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<NaiveDate>, TailSignalError> {
    match config.get_string("backtest", key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                TailSignalError::invalid(
                    "backtest",
                    key,
                    format!("invalid {} format, expected YYYY-MM-DD", key),
                )
            }),
    }
}

/// Parse a numeric key from its raw text. Absent or blank keys take
/// `default`; anything else must parse in full.
fn read_number<T: std::str::FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, TailSignalError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            TailSignalError::invalid(section, key, format!("{} must be a number", key))
        }),
    }
}

fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, TailSignalError> {
    read_number(config, section, key, default)
}

fn read_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, TailSignalError> {
    read_number(config, section, key, default)
}

fn require_unit(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<(), TailSignalError> {
    let value = read_double(config, section, key, default)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(TailSignalError::invalid(
            section,
            key,
            format!("{} must be between 0 and 1", key),
        ));
    }
    Ok(())
}

fn require_positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<(), TailSignalError> {
    let value = read_double(config, section, key, default)?;
    if !(value.is_finite() && value > 0.0) {
        return Err(TailSignalError::invalid(
            section,
            key,
            format!("{} must be positive", key),
        ));
    }
    Ok(())
}

fn require_period(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<(), TailSignalError> {
    if read_int(config, section, key, default)? < 1 {
        return Err(TailSignalError::invalid(
            section,
            key,
            format!("{} must be at least 1", key),
        ));
    }
    Ok(())
}

fn validate_weights(config: &dyn ConfigPort) -> Result<(), TailSignalError> {
    match config.get_string("weights", WEEKLY_TAILS) {
        Some(s) if !s.trim().is_empty() => {}
        _ => return Err(TailSignalError::missing("weights", WEEKLY_TAILS)),
    }

    for name in MODULE_NAMES {
        let Some(raw) = config.get_string("weights", name) else {
            continue;
        };
        match raw.trim().parse::<f64>() {
            Ok(w) if w >= 0.0 && w.is_finite() => {}
            _ => {
                return Err(TailSignalError::invalid(
                    "weights",
                    name,
                    "weight must be a non-negative number",
                ));
            }
        }
    }
    Ok(())
}

fn validate_tails(config: &dyn ConfigPort) -> Result<(), TailSignalError> {
    require_period(config, WEEKLY_TAILS, "lookback_weeks", 8)?;
    require_period(config, WEEKLY_TAILS, "atr_period", 14)?;
    require_positive(config, WEEKLY_TAILS, "min_tail_ratio", 1.0)?;
    require_positive(config, WEEKLY_TAILS, "max_body_atr", 0.5)?;
    require_unit(config, WEEKLY_TAILS, "min_close_pos", 0.6)?;
    require_positive(config, WEEKLY_TAILS, "min_tail_strength", 2.5)?;
    if read_double(config, WEEKLY_TAILS, "volume_bonus", 1.2)? < 1.0 {
        return Err(TailSignalError::invalid(
            WEEKLY_TAILS,
            "volume_bonus",
            "volume_bonus must be at least 1",
        ));
    }
    Ok(())
}

fn validate_gates(config: &dyn ConfigPort) -> Result<(), TailSignalError> {
    if read_int(config, "gates", "min_confirmations", 1)? < 0 {
        return Err(TailSignalError::invalid(
            "gates",
            "min_confirmations",
            "min_confirmations must be non-negative",
        ));
    }
    require_unit(config, "gates", "threshold", 0.8)?;
    for key in ["long_threshold", "short_threshold"] {
        if let Some(raw) = config.get_string("gates", key) {
            match raw.trim().parse::<f64>() {
                Ok(v) if (0.0..=1.0).contains(&v) => {}
                _ => {
                    return Err(TailSignalError::invalid(
                        "gates",
                        key,
                        format!("{} must be between 0 and 1", key),
                    ));
                }
            }
        }
    }
    require_period(config, "gates", "volume_period", 20)?;
    require_positive(config, "gates", "volume_multiple", 1.3)?;
    require_unit(config, "gates", "volume_penalty", 0.7)?;
    require_period(config, "gates", "atr_period", 14)?;
    require_unit(config, "gates", "min_atr_pct", 0.02)?;
    require_unit(config, "gates", "volatility_penalty", 0.8)?;
    Ok(())
}

fn validate_regime(config: &dyn ConfigPort) -> Result<(), TailSignalError> {
    require_period(config, "regime", "fast_period", 50)?;
    require_period(config, "regime", "slow_period", 200)?;
    if read_int(config, "regime", "fast_period", 50)? >= read_int(config, "regime", "slow_period", 200)? {
        return Err(TailSignalError::invalid(
            "regime",
            "fast_period",
            "fast_period must be shorter than slow_period",
        ));
    }
    require_unit(config, "regime", "strong_spread", 0.05)?;
    Ok(())
}

fn validate_modules(config: &dyn ConfigPort) -> Result<(), TailSignalError> {
    require_period(config, "fibonacci", "lookback_days", 90)?;
    require_positive(config, "fibonacci", "proximity_pct", 0.015)?;
    require_unit(config, "trend", "confidence", 0.6)?;
    require_unit(config, "trend", "strong_confidence", 0.85)?;
    require_period(config, "rsi", "period", 14)?;

    let oversold = read_double(config, "rsi", "oversold", 30.0)?;
    let overbought = read_double(config, "rsi", "overbought", 70.0)?;
    if !(0.0 < oversold && oversold < overbought && overbought < 100.0) {
        return Err(TailSignalError::invalid(
            "rsi",
            "oversold",
            "expected 0 < oversold < overbought < 100",
        ));
    }

    require_period(config, "macd", "fast", 12)?;
    require_period(config, "macd", "slow", 26)?;
    require_period(config, "macd", "signal", 9)?;
    require_positive(config, "macd", "scale_pct", 0.01)?;
    require_period(config, "bollinger", "period", 20)?;
    require_positive(config, "bollinger", "stddev_mult", 2.0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn invalid_key(content: &str) -> String {
        match validate_signal_config(&make_config(content)).unwrap_err() {
            TailSignalError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {other}"),
        }
    }

    #[test]
    fn valid_signal_config_passes() {
        let config = make_config(
            r#"
[weights]
weekly_tails = 0.40
fibonacci = 0.35

[weekly_tails]
lookback_weeks = 12
min_tail_ratio = 1.2

[gates]
threshold = 0.8
long_threshold = 0.88
"#,
        );
        assert!(validate_signal_config(&config).is_ok());
    }

    #[test]
    fn missing_tail_weight_fails() {
        let err = validate_signal_config(&make_config("[weights]\nfibonacci = 0.35\n")).unwrap_err();
        assert!(matches!(err, TailSignalError::ConfigMissing { key, .. } if key == "weekly_tails"));
    }

    #[test]
    fn negative_weight_fails() {
        assert_eq!(
            invalid_key("[weights]\nweekly_tails = 0.4\nrsi = -0.1\n"),
            "rsi"
        );
    }

    #[test]
    fn non_numeric_weight_fails() {
        assert_eq!(invalid_key("[weights]\nweekly_tails = heavy\n"), "weekly_tails");
    }

    #[test]
    fn threshold_out_of_range_fails() {
        assert_eq!(
            invalid_key("[weights]\nweekly_tails = 0.4\n[gates]\nthreshold = 1.5\n"),
            "threshold"
        );
    }

    #[test]
    fn direction_threshold_out_of_range_fails() {
        assert_eq!(
            invalid_key("[weights]\nweekly_tails = 0.4\n[gates]\nlong_threshold = abc\n"),
            "long_threshold"
        );
    }

    #[test]
    fn zero_lookback_fails() {
        assert_eq!(
            invalid_key("[weights]\nweekly_tails = 0.4\n[weekly_tails]\nlookback_weeks = 0\n"),
            "lookback_weeks"
        );
    }

    #[test]
    fn close_position_above_one_fails() {
        assert_eq!(
            invalid_key("[weights]\nweekly_tails = 0.4\n[weekly_tails]\nmin_close_pos = 1.2\n"),
            "min_close_pos"
        );
    }

    #[test]
    fn regime_periods_must_be_ordered() {
        assert_eq!(
            invalid_key("[weights]\nweekly_tails = 0.4\n[regime]\nfast_period = 200\nslow_period = 50\n"),
            "fast_period"
        );
    }

    #[test]
    fn rsi_bounds_must_be_ordered() {
        assert_eq!(
            invalid_key("[weights]\nweekly_tails = 0.4\n[rsi]\noversold = 80\n"),
            "oversold"
        );
    }

    #[test]
    fn non_numeric_threshold_fails() {
        assert_eq!(
            invalid_key("[weights]\nweekly_tails = 0.4\n[gates]\nthreshold = 0.9x\n"),
            "threshold"
        );
    }

    #[test]
    fn non_numeric_period_fails() {
        assert_eq!(
            invalid_key("[weights]\nweekly_tails = 0.4\n[weekly_tails]\nlookback_weeks = ten\n"),
            "lookback_weeks"
        );
        assert_eq!(
            invalid_key("[weights]\nweekly_tails = 0.4\n[rsi]\noverbought = high\n"),
            "overbought"
        );
    }

    #[test]
    fn blank_numeric_key_takes_default() {
        let config = make_config("[weights]\nweekly_tails = 0.4\n[gates]\nthreshold =\n");
        assert!(validate_signal_config(&config).is_ok());
    }

    #[test]
    fn backtest_non_numeric_step_fails() {
        let err = validate_backtest_config(&make_config("[backtest]\nstep_days = weekly\n"))
            .unwrap_err();
        assert!(matches!(err, TailSignalError::ConfigInvalid { key, .. } if key == "step_days"));
    }

    #[test]
    fn single_day_range_is_allowed() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1);
        assert!(check_date_range(day, day).is_ok());
        assert!(check_date_range(day, None).is_ok());
        let config = make_config("[backtest]\nstart_date = 2024-06-01\nend_date = 2024-06-01\n");
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn backtest_dates_are_optional_but_ordered() {
        assert!(validate_backtest_config(&make_config("[backtest]\n")).is_ok());
        let err = validate_backtest_config(&make_config(
            "[backtest]\nstart_date = 2024-12-31\nend_date = 2024-01-01\n",
        ))
        .unwrap_err();
        assert!(matches!(err, TailSignalError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn backtest_bad_date_format_fails() {
        let err = validate_backtest_config(&make_config("[backtest]\nstart_date = 2024/01/01\n"))
            .unwrap_err();
        assert!(matches!(err, TailSignalError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn backtest_zero_horizon_fails() {
        let err = validate_backtest_config(&make_config("[backtest]\nhorizon_days = 0\n"))
            .unwrap_err();
        assert!(matches!(err, TailSignalError::ConfigInvalid { key, .. } if key == "horizon_days"));
    }
}
