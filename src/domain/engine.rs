//! Decision engine: modules → aggregator → gate chain → decision.
//!
//! `decide` never fails. Invalid contexts, module errors and gate errors all
//! degrade to HOLD with a reason, and the engine holds no mutable state, so
//! the same context always serializes to the same bytes.

use crate::domain::aggregator::{Combined, combine, confirmations, dominant};
use crate::domain::analysis::{AnalysisModule, default_modules};
use crate::domain::config::{SignalConfig, WEEKLY_TAILS};
use crate::domain::context::DecisionContext;
use crate::domain::gates::{GateChain, GateInput};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::regime::classify;
use crate::domain::signal::{AggregateDecision, Metrics, ModuleResult, ModuleStatus, Signal};
use tracing::{debug, info, warn};

pub struct DecisionEngine {
    config: SignalConfig,
    modules: Vec<Box<dyn AnalysisModule>>,
    gates: GateChain,
}

impl DecisionEngine {
    pub fn new(config: SignalConfig) -> Self {
        let modules = default_modules(&config);
        let gates = GateChain::from_config(&config.gates);
        Self {
            config,
            modules,
            gates,
        }
    }

    /// Engine with a custom module set and gate chain.
    pub fn with_parts(
        config: SignalConfig,
        modules: Vec<Box<dyn AnalysisModule>>,
        gates: GateChain,
    ) -> Self {
        Self {
            config,
            modules,
            gates,
        }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub fn decide(&self, ctx: &DecisionContext) -> AggregateDecision {
        if let Err(e) = ctx.validate() {
            warn!(as_of = %ctx.as_of(), error = %e, "rejecting invalid context");
            return AggregateDecision::hold_with(format!("Invalid context: {}", e));
        }

        let results: Vec<(&str, ModuleResult)> = self
            .modules
            .iter()
            .map(|module| (module.name(), run_module(module.as_ref(), ctx)))
            .collect();

        let weights = &self.config.weights;
        let combined = combine(&results, weights);
        let mut metrics = base_metrics(&results, &combined);

        let decision = if combined.signal == Signal::Hold {
            let reason = if combined.is_tie() {
                format!(
                    "LONG and SHORT evidence tied at {:.3}, no consensus",
                    combined.long
                )
            } else {
                "no directional consensus among modules".to_string()
            };
            AggregateDecision {
                signal: Signal::Hold,
                confidence: 0.0,
                reasons: vec![reason],
                metrics,
            }
        } else {
            let daily: Vec<OhlcvBar> = ctx
                .daily()
                .iter()
                .filter(|b| b.is_valid())
                .cloned()
                .collect();
            let regime = classify(&daily, &self.config.regime).map(|r| r.regime);
            let agreeing = confirmations(&results, combined.signal);
            let verdict = self.gates.apply(&GateInput {
                signal: combined.signal,
                confidence: combined.confidence,
                confirmations: agreeing,
                daily: &daily,
                regime,
            });

            metrics.insert("confirmations".to_string(), agreeing as f64);
            if let Some(regime) = regime {
                metrics.insert("regime".to_string(), regime.score());
            }
            for (gate, multiplier) in &verdict.multipliers {
                metrics.insert(format!("{}_multiplier", gate), *multiplier);
            }

            let mut reasons = Vec::new();
            if let Some(blocked) = verdict.blocked_by.clone() {
                reasons.push(blocked);
            }
            let mut supporting: Vec<(&str, &ModuleResult)> = results
                .iter()
                .filter(|(_, r)| r.supports(combined.signal))
                .map(|(name, r)| (*name, r))
                .collect();
            if let Some((lead, _)) = dominant(&results, weights, combined.signal) {
                supporting.sort_by_key(|(name, _)| *name != lead);
            }
            reasons.extend(supporting.into_iter().map(|(_, r)| r.reason.clone()));
            reasons.extend(verdict.penalties.iter().cloned());

            AggregateDecision {
                signal: verdict.signal,
                confidence: verdict.confidence.clamp(0.0, 1.0),
                reasons,
                metrics,
            }
        };

        info!(
            as_of = %ctx.as_of(),
            signal = %decision.signal,
            confidence = decision.confidence,
            reason = decision.primary_reason(),
            "decision"
        );
        decision
    }
}

fn run_module(module: &dyn AnalysisModule, ctx: &DecisionContext) -> ModuleResult {
    let name = module.name();
    if !module.enabled() {
        return ModuleResult::disabled(format!("{} disabled", name));
    }
    let result = match module.analyze(ctx) {
        Ok(result) if is_sane(&result) => result,
        Ok(_) => {
            warn!(module = name, "module returned out-of-range values");
            ModuleResult::error(format!("{}: out-of-range result", name))
        }
        Err(e) => {
            warn!(module = name, error = %e, "module failed");
            ModuleResult::error(e.to_string())
        }
    };
    debug!(
        module = name,
        signal = %result.signal,
        confidence = result.confidence,
        reason = %result.reason,
        "module evaluated"
    );
    result
}

fn is_sane(result: &ModuleResult) -> bool {
    let unit = |v: f64| (0.0..=1.0).contains(&v);
    unit(result.strength)
        && unit(result.confidence)
        && result.metrics.values().all(|v| v.is_finite())
        && (result.status == ModuleStatus::Ok || result.signal == Signal::Hold)
}

fn base_metrics(results: &[(&str, ModuleResult)], combined: &Combined) -> Metrics {
    let mut metrics = Metrics::new();
    metrics.insert("raw_long".to_string(), combined.long);
    metrics.insert("raw_short".to_string(), combined.short);
    for (name, result) in results {
        if result.is_ok() {
            metrics.insert(format!("{}_confidence", name), result.confidence);
        }
    }
    if let Some((_, tails)) = results
        .iter()
        .find(|(name, r)| *name == WEEKLY_TAILS && r.is_ok())
    {
        metrics.insert("tail_strength".to_string(), tails.strength);
    }
    let errors = results
        .iter()
        .filter(|(_, r)| r.status == ModuleStatus::Error)
        .count();
    metrics.insert("module_errors".to_string(), errors as f64);
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{FIBONACCI, GateConfig, ModuleWeights};
    use crate::domain::error::ModuleError;
    use chrono::{Duration, NaiveDate};

    struct Fixed {
        name: &'static str,
        result: Result<ModuleResult, ModuleError>,
    }

    impl AnalysisModule for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn analyze(&self, _: &DecisionContext) -> Result<ModuleResult, ModuleError> {
            self.result.clone()
        }
    }

    fn fixed(name: &'static str, result: ModuleResult) -> Box<dyn AnalysisModule> {
        Box::new(Fixed {
            name,
            result: Ok(result),
        })
    }

    fn ctx() -> DecisionContext {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let weekly = vec![OhlcvBar {
            date: monday,
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 10.0,
        }];
        DecisionContext::new(&[], &weekly, monday + Duration::weeks(1))
    }

    fn engine(threshold: f64, modules: Vec<Box<dyn AnalysisModule>>) -> DecisionEngine {
        let config = SignalConfig {
            weights: ModuleWeights::default(),
            gates: GateConfig {
                threshold,
                ..GateConfig::default()
            },
            ..SignalConfig::default()
        };
        let gates = GateChain::from_config(&config.gates);
        DecisionEngine::with_parts(config, modules, gates)
    }

    fn long(confidence: f64, reason: &str) -> ModuleResult {
        ModuleResult::directional(Signal::Long, confidence, confidence, reason)
    }

    #[test]
    fn agreeing_modules_produce_long() {
        let engine = engine(
            0.6,
            vec![
                fixed(WEEKLY_TAILS, long(0.9, "tail")),
                fixed(FIBONACCI, long(0.8, "fib")),
            ],
        );
        let decision = engine.decide(&ctx());
        assert_eq!(decision.signal, Signal::Long);
        assert!((decision.confidence - 0.64).abs() < 1e-12);
        assert_eq!(decision.reasons[0], "tail");
        assert_eq!(decision.metrics["tail_strength"], 0.9);
        assert_eq!(decision.metrics["confirmations"], 2.0);
    }

    #[test]
    fn module_error_is_neutralized() {
        let engine = engine(
            0.3,
            vec![
                Box::new(Fixed {
                    name: WEEKLY_TAILS,
                    result: Err(ModuleError::Failed {
                        module: WEEKLY_TAILS.to_string(),
                        reason: "boom".to_string(),
                    }),
                }),
                fixed(FIBONACCI, long(1.0, "fib")),
            ],
        );
        let decision = engine.decide(&ctx());
        assert_eq!(decision.signal, Signal::Long);
        assert!((decision.confidence - 0.35).abs() < 1e-12);
        assert_eq!(decision.metrics["module_errors"], 1.0);
        assert!(!decision.metrics.contains_key("tail_strength"));
    }

    #[test]
    fn out_of_range_result_is_treated_as_error() {
        let mut wild = long(0.9, "wild");
        wild.confidence = 7.0;
        let engine = engine(0.1, vec![fixed(WEEKLY_TAILS, wild)]);
        let decision = engine.decide(&ctx());
        assert_eq!(decision.signal, Signal::Hold);
        assert_eq!(decision.metrics["module_errors"], 1.0);
    }

    #[test]
    fn invalid_context_holds() {
        let engine = engine(0.1, vec![fixed(WEEKLY_TAILS, long(1.0, "tail"))]);
        let empty = DecisionContext::new(&[], &[], NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let decision = engine.decide(&empty);
        assert_eq!(decision.signal, Signal::Hold);
        assert_eq!(decision.confidence, 0.0);
        assert!(decision.primary_reason().starts_with("Invalid context:"));
    }

    #[test]
    fn veto_reason_comes_first() {
        let engine = engine(0.8, vec![fixed(WEEKLY_TAILS, long(0.9, "tail"))]);
        let decision = engine.decide(&ctx());
        assert_eq!(decision.signal, Signal::Hold);
        assert!(decision.primary_reason().contains("threshold"));
        assert_eq!(decision.reasons[1], "tail");
    }

    #[test]
    fn disabled_module_is_skipped() {
        struct Off;
        impl AnalysisModule for Off {
            fn name(&self) -> &'static str {
                WEEKLY_TAILS
            }
            fn enabled(&self) -> bool {
                false
            }
            fn analyze(&self, _: &DecisionContext) -> Result<ModuleResult, ModuleError> {
                Ok(ModuleResult::directional(Signal::Long, 1.0, 1.0, "never"))
            }
        }
        let engine = engine(0.1, vec![Box::new(Off)]);
        let decision = engine.decide(&ctx());
        assert_eq!(decision.signal, Signal::Hold);
        assert_eq!(
            decision.primary_reason(),
            "no directional consensus among modules"
        );
    }

    #[test]
    fn tie_is_reported() {
        let engine = engine(
            0.1,
            vec![
                fixed(WEEKLY_TAILS, long(0.5, "tail")),
                fixed(
                    FIBONACCI,
                    ModuleResult::directional(Signal::Short, 0.5, 0.2 / 0.35, "fib"),
                ),
            ],
        );
        let decision = engine.decide(&ctx());
        assert_eq!(decision.signal, Signal::Hold);
        assert!(decision.primary_reason().contains("tied"));
    }
}
