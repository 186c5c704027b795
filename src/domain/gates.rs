//! Gate chain: ordered vetoes and confidence multipliers applied to the
//! aggregated signal.
//!
//! Gates only report [`GateOutcome`]s. The chain applies them in order:
//! the first veto ends evaluation, penalties multiply into the effective
//! confidence, and the direction threshold is re-checked once all guards
//! have run.

use crate::domain::config::GateConfig;
use crate::domain::error::GateError;
use crate::domain::indicator_helpers::{calc_atr, trailing_volume_mean};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::regime::MarketRegime;
use crate::domain::signal::{GateOutcome, Signal};
use tracing::{debug, warn};

/// What a gate sees: the aggregated direction and the evidence behind it.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub signal: Signal,
    pub confidence: f64,
    pub confirmations: usize,
    /// Usable closed daily candles.
    pub daily: &'a [OhlcvBar],
    pub regime: Option<MarketRegime>,
}

pub trait Gate: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, input: &GateInput<'_>) -> Result<GateOutcome, GateError>;
}

pub struct MinConfirmationsGate {
    pub min_confirmations: usize,
}

impl Gate for MinConfirmationsGate {
    fn name(&self) -> &'static str {
        "confirmations"
    }

    fn evaluate(&self, input: &GateInput<'_>) -> Result<GateOutcome, GateError> {
        if input.confirmations < self.min_confirmations {
            return Ok(GateOutcome::veto(format!(
                "only {} module(s) confirm {}, need {}",
                input.confirmations, input.signal, self.min_confirmations
            )));
        }
        Ok(GateOutcome::pass(format!(
            "{} module(s) confirm {}",
            input.confirmations, input.signal
        )))
    }
}

pub struct ThresholdGate {
    pub config: GateConfig,
}

impl Gate for ThresholdGate {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn evaluate(&self, input: &GateInput<'_>) -> Result<GateOutcome, GateError> {
        if !(0.0..=1.0).contains(&input.confidence) {
            return Err(GateError::InvalidInput {
                gate: self.name(),
                reason: format!("confidence {} outside [0, 1]", input.confidence),
            });
        }
        let threshold = self.config.threshold_for(input.signal);
        if input.confidence < threshold {
            return Ok(GateOutcome::veto(below_threshold(
                input.signal,
                input.confidence,
                threshold,
            )));
        }
        Ok(GateOutcome::pass(format!(
            "confidence {:.3} meets {} threshold {:.2}",
            input.confidence, input.signal, threshold
        )))
    }
}

fn below_threshold(signal: Signal, confidence: f64, threshold: f64) -> String {
    format!(
        "confidence {:.3} below {} threshold {:.2}",
        confidence, signal, threshold
    )
}

pub struct VolumeGuard {
    pub period: usize,
    pub multiple: f64,
    pub penalty: f64,
}

impl Gate for VolumeGuard {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn evaluate(&self, input: &GateInput<'_>) -> Result<GateOutcome, GateError> {
        let (Some(latest), Some(mean)) = (
            input.daily.last(),
            trailing_volume_mean(input.daily, self.period),
        ) else {
            return Ok(GateOutcome::pass("volume: not enough history"));
        };
        if !mean.is_finite() {
            return Err(GateError::InvalidInput {
                gate: self.name(),
                reason: "non-finite volume average".to_string(),
            });
        }

        let required = self.multiple * mean;
        if latest.volume < required {
            return Ok(GateOutcome::penalize(
                self.penalty,
                format!(
                    "thin volume {:.0} < {:.1}x {}-day average {:.0}",
                    latest.volume, self.multiple, self.period, mean
                ),
            ));
        }
        Ok(GateOutcome::pass("volume confirmed"))
    }
}

pub struct VolatilityGuard {
    pub atr_period: usize,
    pub min_atr_pct: f64,
    pub penalty: f64,
}

impl Gate for VolatilityGuard {
    fn name(&self) -> &'static str {
        "volatility"
    }

    fn evaluate(&self, input: &GateInput<'_>) -> Result<GateOutcome, GateError> {
        let Some(atr) = calc_atr(input.daily, self.atr_period).latest_simple() else {
            return Ok(GateOutcome::pass("volatility: not enough history"));
        };
        let close = input.daily.last().map(|b| b.close).unwrap_or(0.0);
        if !(close > 0.0) || !atr.is_finite() {
            return Err(GateError::InvalidInput {
                gate: self.name(),
                reason: format!("cannot normalize ATR {} by close {}", atr, close),
            });
        }

        let atr_pct = atr / close;
        if atr_pct < self.min_atr_pct {
            return Ok(GateOutcome::penalize(
                self.penalty,
                format!(
                    "low volatility: ATR {:.2}% of price < {:.2}%",
                    atr_pct * 100.0,
                    self.min_atr_pct * 100.0
                ),
            ));
        }
        Ok(GateOutcome::pass(format!(
            "ATR {:.2}% of price",
            atr_pct * 100.0
        )))
    }
}

pub struct RegimeGuard {
    pub block_shorts_in_strong_bull: bool,
}

impl Gate for RegimeGuard {
    fn name(&self) -> &'static str {
        "regime"
    }

    fn evaluate(&self, input: &GateInput<'_>) -> Result<GateOutcome, GateError> {
        if input.signal == Signal::Short
            && self.block_shorts_in_strong_bull
            && input.regime == Some(MarketRegime::StrongBull)
        {
            return Ok(GateOutcome::veto("SHORT blocked in strong bull regime"));
        }
        Ok(GateOutcome::pass("regime allows direction"))
    }
}

/// Result of running the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct GateVerdict {
    pub signal: Signal,
    pub confidence: f64,
    /// Why the signal was forced to HOLD, if it was.
    pub blocked_by: Option<String>,
    /// Penalty reasons, in gate order.
    pub penalties: Vec<String>,
    /// Multiplier applied by each gate that ran.
    pub multipliers: Vec<(&'static str, f64)>,
}

impl GateVerdict {
    fn hold(confidence: f64, reason: String, multipliers: Vec<(&'static str, f64)>) -> Self {
        Self {
            signal: Signal::Hold,
            confidence,
            blocked_by: Some(reason),
            penalties: Vec::new(),
            multipliers,
        }
    }
}

pub struct GateChain {
    gates: Vec<Box<dyn Gate>>,
    config: GateConfig,
}

impl GateChain {
    pub fn new(gates: Vec<Box<dyn Gate>>, config: GateConfig) -> Self {
        Self { gates, config }
    }

    /// Confirmations, threshold, volume, volatility, regime.
    pub fn from_config(config: &GateConfig) -> Self {
        let gates: Vec<Box<dyn Gate>> = vec![
            Box::new(MinConfirmationsGate {
                min_confirmations: config.min_confirmations,
            }),
            Box::new(ThresholdGate {
                config: config.clone(),
            }),
            Box::new(VolumeGuard {
                period: config.volume_period,
                multiple: config.volume_multiple,
                penalty: config.volume_penalty,
            }),
            Box::new(VolatilityGuard {
                atr_period: config.atr_period,
                min_atr_pct: config.min_atr_pct,
                penalty: config.volatility_penalty,
            }),
            Box::new(RegimeGuard {
                block_shorts_in_strong_bull: config.block_shorts_in_strong_bull,
            }),
        ];
        Self::new(gates, config.clone())
    }

    pub fn apply(&self, input: &GateInput<'_>) -> GateVerdict {
        let mut multiplier = 1.0;
        let mut multipliers = Vec::with_capacity(self.gates.len());
        let mut penalties = Vec::new();

        for gate in &self.gates {
            let outcome = match gate.evaluate(input) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(gate = gate.name(), error = %e, "gate failed, forcing HOLD");
                    return GateVerdict::hold(0.0, format!("Error: {}", e), multipliers);
                }
            };
            debug!(
                gate = gate.name(),
                passed = outcome.passed,
                multiplier = outcome.confidence_multiplier,
                reason = %outcome.reason,
                "gate evaluated"
            );

            if !outcome.passed {
                // A threshold miss keeps its confidence for diagnostics.
                let confidence = if gate.name() == "threshold" {
                    input.confidence * multiplier
                } else {
                    0.0
                };
                return GateVerdict::hold(confidence, outcome.reason, multipliers);
            }
            multiplier *= outcome.confidence_multiplier;
            multipliers.push((gate.name(), outcome.confidence_multiplier));
            if outcome.is_penalty() {
                penalties.push(outcome.reason);
            }
        }

        let effective = (input.confidence * multiplier).clamp(0.0, 1.0);
        let threshold = self.config.threshold_for(input.signal);
        if effective < threshold {
            let reason = format!(
                "{} after guards",
                below_threshold(input.signal, effective, threshold)
            );
            let mut verdict = GateVerdict::hold(effective, reason, multipliers);
            verdict.penalties = penalties;
            return verdict;
        }

        GateVerdict {
            signal: input.signal,
            confidence: effective,
            blocked_by: None,
            penalties,
            multipliers,
        }
    }
}
