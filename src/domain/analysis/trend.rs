//! Trend module: maps the daily market regime to a directional opinion.

use crate::domain::analysis::{AnalysisModule, insufficient, usable_daily};
use crate::domain::config::{RegimeConfig, TREND, TrendConfig};
use crate::domain::context::DecisionContext;
use crate::domain::error::ModuleError;
use crate::domain::regime::{MarketRegime, classify};
use crate::domain::signal::{ModuleResult, Signal};

pub struct TrendModule {
    config: TrendConfig,
    regime: RegimeConfig,
}

impl TrendModule {
    pub fn new(config: TrendConfig, regime: RegimeConfig) -> Self {
        Self { config, regime }
    }
}

impl AnalysisModule for TrendModule {
    fn name(&self) -> &'static str {
        TREND
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn analyze(&self, ctx: &DecisionContext) -> Result<ModuleResult, ModuleError> {
        let daily = usable_daily(ctx);
        let Some(reading) = classify(&daily, &self.regime) else {
            return Ok(insufficient(TREND, daily.len(), self.regime.slow_period));
        };

        let (signal, confidence) = match reading.regime {
            MarketRegime::StrongBull => (Signal::Long, self.config.strong_confidence),
            MarketRegime::Bull => (Signal::Long, self.config.confidence),
            MarketRegime::Neutral => (Signal::Hold, 0.0),
            MarketRegime::Bear => (Signal::Short, self.config.confidence),
            MarketRegime::StrongBear => (Signal::Short, self.config.strong_confidence),
        };

        let reason = format!(
            "{} regime: SMA{} {:.2} vs SMA{} {:.2}",
            reading.regime,
            self.regime.fast_period,
            reading.fast_sma,
            self.regime.slow_period,
            reading.slow_sma
        );
        Ok(ModuleResult::directional(signal, confidence, confidence, reason)
            .with_metric("regime", reading.regime.score())
            .with_metric("sma_spread", reading.spread))
    }
}
