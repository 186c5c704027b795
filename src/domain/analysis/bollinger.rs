//! Bollinger band auxiliary module.
//!
//! Mean reversion off the bands: a close under the lower band leans LONG,
//! over the upper band SHORT.

use crate::domain::analysis::{AnalysisModule, insufficient, usable_daily};
use crate::domain::config::{BOLLINGER, BollingerConfig};
use crate::domain::context::DecisionContext;
use crate::domain::error::ModuleError;
use crate::domain::indicator::{IndicatorValue, calculate_bollinger};
use crate::domain::signal::{ModuleResult, Signal};

pub struct BollingerModule {
    config: BollingerConfig,
}

impl BollingerModule {
    pub fn new(config: BollingerConfig) -> Self {
        Self { config }
    }
}

impl AnalysisModule for BollingerModule {
    fn name(&self) -> &'static str {
        BOLLINGER
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn analyze(&self, ctx: &DecisionContext) -> Result<ModuleResult, ModuleError> {
        let daily = usable_daily(ctx);
        let mult_x100 = (self.config.stddev_mult * 100.0).round() as u32;
        let series = calculate_bollinger(&daily, self.config.period, mult_x100);
        let Some(IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        }) = series.latest()
        else {
            return Ok(insufficient(BOLLINGER, daily.len(), self.config.period));
        };
        let close = daily[daily.len() - 1].close;

        let width = upper - lower;
        if width <= 0.0 {
            return Ok(ModuleResult::hold("bollinger: bands collapsed"));
        }

        let result = if close < lower {
            let strength = ((lower - close) / width).min(1.0);
            ModuleResult::directional(
                Signal::Long,
                strength,
                strength,
                format!("Close {:.2} below lower band {:.2}", close, lower),
            )
        } else if close > upper {
            let strength = ((close - upper) / width).min(1.0);
            ModuleResult::directional(
                Signal::Short,
                strength,
                strength,
                format!("Close {:.2} above upper band {:.2}", close, upper),
            )
        } else {
            ModuleResult::hold("bollinger: close inside bands")
        };
        Ok(result
            .with_metric("bb_upper", upper)
            .with_metric("bb_middle", middle)
            .with_metric("bb_lower", lower))
    }
}
