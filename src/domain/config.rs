//! Typed configuration for the decision core.
//!
//! Built once from a [`ConfigPort`] and threaded explicitly into the engine;
//! every optional key falls back to the defaults below.

use crate::domain::config_validation::validate_signal_config;
use crate::domain::error::TailSignalError;
use crate::domain::signal::Signal;
use crate::ports::config_port::ConfigPort;
use std::collections::BTreeMap;

pub const WEEKLY_TAILS: &str = "weekly_tails";
pub const FIBONACCI: &str = "fibonacci";
pub const TREND: &str = "trend";
pub const RSI: &str = "rsi";
pub const MACD: &str = "macd";
pub const BOLLINGER: &str = "bollinger";

/// All analysis module names, in evaluation order.
pub const MODULE_NAMES: [&str; 6] = [WEEKLY_TAILS, FIBONACCI, TREND, RSI, MACD, BOLLINGER];

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleWeights(BTreeMap<String, f64>);

impl ModuleWeights {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, module: &str, weight: f64) -> Self {
        self.0.insert(module.to_string(), weight);
        self
    }

    /// Weight of `module`, 0.0 when it has none.
    pub fn get(&self, module: &str) -> f64 {
        self.0.get(module).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Default for ModuleWeights {
    fn default() -> Self {
        Self::new()
            .with(WEEKLY_TAILS, 0.40)
            .with(FIBONACCI, 0.35)
            .with(TREND, 0.10)
            .with(RSI, 0.05)
            .with(MACD, 0.05)
            .with(BOLLINGER, 0.05)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TailConfig {
    pub enabled: bool,
    pub lookback_weeks: usize,
    pub atr_period: usize,
    pub min_tail_ratio: f64,
    pub max_body_atr: f64,
    pub min_close_pos: f64,
    /// Tail ratio at or above which strength saturates at 1.0.
    pub min_tail_strength: f64,
    pub volume_bonus: f64,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback_weeks: 8,
            atr_period: 14,
            min_tail_ratio: 1.0,
            max_body_atr: 0.5,
            min_close_pos: 0.6,
            min_tail_strength: 2.5,
            volume_bonus: 1.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateConfig {
    pub min_confirmations: usize,
    pub threshold: f64,
    pub long_threshold: Option<f64>,
    pub short_threshold: Option<f64>,
    pub volume_period: usize,
    pub volume_multiple: f64,
    pub volume_penalty: f64,
    pub atr_period: usize,
    pub min_atr_pct: f64,
    pub volatility_penalty: f64,
    pub block_shorts_in_strong_bull: bool,
}

impl GateConfig {
    pub fn threshold_for(&self, signal: Signal) -> f64 {
        match signal {
            Signal::Long => self.long_threshold.unwrap_or(self.threshold),
            Signal::Short => self.short_threshold.unwrap_or(self.threshold),
            Signal::Hold => self.threshold,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_confirmations: 1,
            threshold: 0.8,
            long_threshold: None,
            short_threshold: None,
            volume_period: 20,
            volume_multiple: 1.3,
            volume_penalty: 0.7,
            atr_period: 14,
            min_atr_pct: 0.02,
            volatility_penalty: 0.8,
            block_shorts_in_strong_bull: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    pub strong_spread: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            fast_period: 50,
            slow_period: 200,
            strong_spread: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FibonacciConfig {
    pub enabled: bool,
    pub lookback_days: usize,
    pub proximity_pct: f64,
}

impl Default for FibonacciConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback_days: 90,
            proximity_pct: 0.015,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendConfig {
    pub enabled: bool,
    pub confidence: f64,
    pub strong_confidence: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence: 0.6,
            strong_confidence: 0.85,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RsiConfig {
    pub enabled: bool,
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for RsiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacdConfig {
    pub enabled: bool,
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
    pub scale_pct: f64,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fast: 12,
            slow: 26,
            signal: 9,
            scale_pct: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerConfig {
    pub enabled: bool,
    pub period: usize,
    pub stddev_mult: f64,
}

impl Default for BollingerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period: 20,
            stddev_mult: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalConfig {
    pub weights: ModuleWeights,
    pub tails: TailConfig,
    pub gates: GateConfig,
    pub regime: RegimeConfig,
    pub fibonacci: FibonacciConfig,
    pub trend: TrendConfig,
    pub rsi: RsiConfig,
    pub macd: MacdConfig,
    pub bollinger: BollingerConfig,
}

fn get_usize(port: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    port.get_int(section, key, default as i64).max(0) as usize
}

fn get_optional_double(port: &dyn ConfigPort, section: &str, key: &str) -> Option<f64> {
    port.get_string(section, key)
        .and_then(|s| s.trim().parse::<f64>().ok())
}

impl SignalConfig {
    /// Validate then build. Fails fast on missing required keys or
    /// out-of-range values.
    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, TailSignalError> {
        validate_signal_config(port)?;

        let defaults = SignalConfig::default();

        let mut weights = ModuleWeights::new();
        for name in MODULE_NAMES {
            let weight = port.get_double("weights", name, defaults.weights.get(name));
            weights = weights.with(name, weight);
        }

        let t = &defaults.tails;
        let tails = TailConfig {
            enabled: port.get_bool(WEEKLY_TAILS, "enabled", t.enabled),
            lookback_weeks: get_usize(port, WEEKLY_TAILS, "lookback_weeks", t.lookback_weeks),
            atr_period: get_usize(port, WEEKLY_TAILS, "atr_period", t.atr_period),
            min_tail_ratio: port.get_double(WEEKLY_TAILS, "min_tail_ratio", t.min_tail_ratio),
            max_body_atr: port.get_double(WEEKLY_TAILS, "max_body_atr", t.max_body_atr),
            min_close_pos: port.get_double(WEEKLY_TAILS, "min_close_pos", t.min_close_pos),
            min_tail_strength: port.get_double(
                WEEKLY_TAILS,
                "min_tail_strength",
                t.min_tail_strength,
            ),
            volume_bonus: port.get_double(WEEKLY_TAILS, "volume_bonus", t.volume_bonus),
        };

        let g = &defaults.gates;
        let gates = GateConfig {
            min_confirmations: get_usize(port, "gates", "min_confirmations", g.min_confirmations),
            threshold: port.get_double("gates", "threshold", g.threshold),
            long_threshold: get_optional_double(port, "gates", "long_threshold"),
            short_threshold: get_optional_double(port, "gates", "short_threshold"),
            volume_period: get_usize(port, "gates", "volume_period", g.volume_period),
            volume_multiple: port.get_double("gates", "volume_multiple", g.volume_multiple),
            volume_penalty: port.get_double("gates", "volume_penalty", g.volume_penalty),
            atr_period: get_usize(port, "gates", "atr_period", g.atr_period),
            min_atr_pct: port.get_double("gates", "min_atr_pct", g.min_atr_pct),
            volatility_penalty: port.get_double(
                "gates",
                "volatility_penalty",
                g.volatility_penalty,
            ),
            block_shorts_in_strong_bull: port.get_bool(
                "gates",
                "block_shorts_in_strong_bull",
                g.block_shorts_in_strong_bull,
            ),
        };

        let r = &defaults.regime;
        let regime = RegimeConfig {
            fast_period: get_usize(port, "regime", "fast_period", r.fast_period),
            slow_period: get_usize(port, "regime", "slow_period", r.slow_period),
            strong_spread: port.get_double("regime", "strong_spread", r.strong_spread),
        };

        let f = &defaults.fibonacci;
        let fibonacci = FibonacciConfig {
            enabled: port.get_bool(FIBONACCI, "enabled", f.enabled),
            lookback_days: get_usize(port, FIBONACCI, "lookback_days", f.lookback_days),
            proximity_pct: port.get_double(FIBONACCI, "proximity_pct", f.proximity_pct),
        };

        let tr = &defaults.trend;
        let trend = TrendConfig {
            enabled: port.get_bool(TREND, "enabled", tr.enabled),
            confidence: port.get_double(TREND, "confidence", tr.confidence),
            strong_confidence: port.get_double(TREND, "strong_confidence", tr.strong_confidence),
        };

        let rs = &defaults.rsi;
        let rsi = RsiConfig {
            enabled: port.get_bool(RSI, "enabled", rs.enabled),
            period: get_usize(port, RSI, "period", rs.period),
            oversold: port.get_double(RSI, "oversold", rs.oversold),
            overbought: port.get_double(RSI, "overbought", rs.overbought),
        };

        let m = &defaults.macd;
        let macd = MacdConfig {
            enabled: port.get_bool(MACD, "enabled", m.enabled),
            fast: get_usize(port, MACD, "fast", m.fast),
            slow: get_usize(port, MACD, "slow", m.slow),
            signal: get_usize(port, MACD, "signal", m.signal),
            scale_pct: port.get_double(MACD, "scale_pct", m.scale_pct),
        };

        let b = &defaults.bollinger;
        let bollinger = BollingerConfig {
            enabled: port.get_bool(BOLLINGER, "enabled", b.enabled),
            period: get_usize(port, BOLLINGER, "period", b.period),
            stddev_mult: port.get_double(BOLLINGER, "stddev_mult", b.stddev_mult),
        };

        Ok(SignalConfig {
            weights,
            tails,
            gates,
            regime,
            fibonacci,
            trend,
            rsi,
            macd,
            bollinger,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn defaults_match_documented_weights() {
        let w = ModuleWeights::default();
        assert_eq!(w.get(WEEKLY_TAILS), 0.40);
        assert_eq!(w.get(FIBONACCI), 0.35);
        assert_eq!(w.get("unknown"), 0.0);
    }

    #[test]
    fn minimal_config_falls_back_to_defaults() {
        let config = SignalConfig::from_port(&make_config("[weights]\nweekly_tails = 0.4\n")).unwrap();
        assert_eq!(config, SignalConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = SignalConfig::from_port(&make_config(
            r#"
[weights]
weekly_tails = 0.5
rsi = 0.0

[weekly_tails]
lookback_weeks = 10
min_close_pos = 0.65

[gates]
threshold = 0.7
long_threshold = 0.88
block_shorts_in_strong_bull = false

[macd]
enabled = false
"#,
        ))
        .unwrap();

        assert_eq!(config.weights.get(WEEKLY_TAILS), 0.5);
        assert_eq!(config.weights.get(RSI), 0.0);
        assert_eq!(config.tails.lookback_weeks, 10);
        assert_eq!(config.tails.min_close_pos, 0.65);
        assert_eq!(config.gates.threshold_for(Signal::Long), 0.88);
        assert_eq!(config.gates.threshold_for(Signal::Short), 0.7);
        assert!(!config.gates.block_shorts_in_strong_bull);
        assert!(!config.macd.enabled);
    }

    #[test]
    fn missing_tail_weight_fails_fast() {
        let err = SignalConfig::from_port(&make_config("[gates]\nthreshold = 0.8\n")).unwrap_err();
        assert!(matches!(
            err,
            TailSignalError::ConfigMissing { ref section, ref key }
                if section == "weights" && key == WEEKLY_TAILS
        ));
    }
}
