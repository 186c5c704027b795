//! Weighted combination of module results into one directional score.
//!
//! raw[d] = sum of weight × confidence over Ok modules signalling d. The
//! larger side wins and its raw sum is the confidence, without
//! renormalizing, so weak agreement stays weak.

use crate::domain::config::ModuleWeights;
use crate::domain::signal::{ModuleResult, Signal};

/// Raw sums closer than this are a tie.
pub const TIE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combined {
    pub signal: Signal,
    pub confidence: f64,
    pub long: f64,
    pub short: f64,
}

impl Combined {
    /// Both sides carry evidence and neither wins.
    pub fn is_tie(&self) -> bool {
        self.signal == Signal::Hold && self.long > 0.0 && self.short > 0.0
    }
}

/// Weighted contribution of one module to its own direction.
pub fn contribution(name: &str, result: &ModuleResult, weights: &ModuleWeights) -> f64 {
    if result.is_ok() && result.signal.is_directional() {
        weights.get(name) * result.confidence
    } else {
        0.0
    }
}

pub fn combine(results: &[(&str, ModuleResult)], weights: &ModuleWeights) -> Combined {
    let mut long = 0.0;
    let mut short = 0.0;
    for (name, result) in results {
        let c = contribution(name, result, weights);
        match result.signal {
            Signal::Long => long += c,
            Signal::Short => short += c,
            Signal::Hold => {}
        }
    }

    let (signal, raw) = if (long - short).abs() <= TIE_TOLERANCE {
        (Signal::Hold, 0.0)
    } else if long > short {
        (Signal::Long, long)
    } else {
        (Signal::Short, short)
    };

    Combined {
        signal,
        confidence: raw.clamp(0.0, 1.0),
        long,
        short,
    }
}

/// Ok modules agreeing with `signal`.
pub fn confirmations(results: &[(&str, ModuleResult)], signal: Signal) -> usize {
    results.iter().filter(|(_, r)| r.supports(signal)).count()
}

/// The module contributing most to `signal`; earlier modules win ties.
pub fn dominant<'a>(
    results: &'a [(&'a str, ModuleResult)],
    weights: &ModuleWeights,
    signal: Signal,
) -> Option<(&'a str, &'a ModuleResult)> {
    let mut best: Option<(&str, &ModuleResult, f64)> = None;
    for (name, result) in results.iter().filter(|(_, r)| r.supports(signal)) {
        let c = contribution(name, result, weights);
        if best.is_none_or(|(_, _, b)| c > b) {
            best = Some((*name, result, c));
        }
    }
    best.map(|(name, result, _)| (name, result))
}
