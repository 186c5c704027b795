//! Signal, module result and decision types shared across the decision core.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Auxiliary numeric diagnostics. Ordered so serialized output is stable.
pub type Metrics = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Long,
    Short,
    Hold,
}

impl Signal {
    pub fn is_directional(self) -> bool {
        self != Signal::Hold
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Long => write!(f, "LONG"),
            Signal::Short => write!(f, "SHORT"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModuleStatus {
    Ok,
    Disabled,
    Error,
}

/// Output of one analysis module for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleResult {
    pub status: ModuleStatus,
    pub signal: Signal,
    pub strength: f64,
    pub confidence: f64,
    pub reason: String,
    pub metrics: Metrics,
}

impl ModuleResult {
    pub fn directional(
        signal: Signal,
        strength: f64,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status: ModuleStatus::Ok,
            signal,
            strength: strength.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
            metrics: Metrics::new(),
        }
    }

    /// An Ok result with no directional opinion.
    pub fn hold(reason: impl Into<String>) -> Self {
        Self::directional(Signal::Hold, 0.0, 0.0, reason)
    }

    pub fn disabled(reason: impl Into<String>) -> Self {
        Self {
            status: ModuleStatus::Disabled,
            ..Self::hold(reason)
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: ModuleStatus::Error,
            ..Self::hold(reason)
        }
    }

    pub fn with_metric(mut self, key: &str, value: f64) -> Self {
        self.metrics.insert(key.to_string(), value);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ModuleStatus::Ok
    }

    /// True when this result counts as evidence for `signal`.
    pub fn supports(&self, signal: Signal) -> bool {
        self.is_ok() && signal.is_directional() && self.signal == signal
    }
}

/// Veto or multiplier produced by one gate. The engine applies it.
#[derive(Debug, Clone, PartialEq)]
pub struct GateOutcome {
    pub passed: bool,
    pub confidence_multiplier: f64,
    pub reason: String,
}

impl GateOutcome {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            passed: true,
            confidence_multiplier: 1.0,
            reason: reason.into(),
        }
    }

    pub fn penalize(multiplier: f64, reason: impl Into<String>) -> Self {
        Self {
            passed: true,
            confidence_multiplier: multiplier.max(0.0),
            reason: reason.into(),
        }
    }

    pub fn veto(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            confidence_multiplier: 0.0,
            reason: reason.into(),
        }
    }

    pub fn is_penalty(&self) -> bool {
        self.passed && self.confidence_multiplier < 1.0
    }
}

/// The sole externally visible output of the decision core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDecision {
    pub signal: Signal,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub metrics: Metrics,
}

impl AggregateDecision {
    /// HOLD with zero confidence, used for every failure path.
    pub fn hold_with(reason: impl Into<String>) -> Self {
        Self {
            signal: Signal::Hold,
            confidence: 0.0,
            reasons: vec![reason.into()],
            metrics: Metrics::new(),
        }
    }

    pub fn primary_reason(&self) -> &str {
        self.reasons.first().map(String::as_str).unwrap_or("")
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_clamp_scores() {
        let r = ModuleResult::directional(Signal::Long, 1.4, -0.2, "x");
        assert_eq!(r.strength, 1.0);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.status, ModuleStatus::Ok);
    }

    #[test]
    fn disabled_and_error_are_neutral() {
        for r in [ModuleResult::disabled("off"), ModuleResult::error("boom")] {
            assert_eq!(r.signal, Signal::Hold);
            assert_eq!(r.strength, 0.0);
            assert_eq!(r.confidence, 0.0);
            assert!(!r.is_ok());
        }
    }

    #[test]
    fn supports_requires_ok_status() {
        let ok = ModuleResult::directional(Signal::Short, 0.5, 0.5, "s");
        assert!(ok.supports(Signal::Short));
        assert!(!ok.supports(Signal::Long));
        assert!(!ModuleResult::hold("h").supports(Signal::Hold));
    }

    #[test]
    fn decision_serializes_with_uppercase_signal() {
        let mut decision = AggregateDecision::hold_with("Error: bad");
        decision.metrics.insert("b".into(), 2.0);
        decision.metrics.insert("a".into(), 1.0);
        assert_eq!(
            decision.to_json(),
            r#"{"signal":"HOLD","confidence":0.0,"reasons":["Error: bad"],"metrics":{"a":1.0,"b":2.0}}"#
        );
        assert_eq!(decision.primary_reason(), "Error: bad");
    }

    #[test]
    fn gate_outcome_kinds() {
        assert!(GateOutcome::pass("ok").passed);
        assert!(GateOutcome::penalize(0.7, "thin").is_penalty());
        assert!(!GateOutcome::veto("no").passed);
        assert_eq!(GateOutcome::penalize(-1.0, "neg").confidence_multiplier, 0.0);
    }
}
