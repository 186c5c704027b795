//! MACD auxiliary module.
//!
//! Histogram sign gives direction; magnitude is scaled against a fraction of
//! the close so the reading is comparable across price levels.

use crate::domain::analysis::{AnalysisModule, insufficient, usable_daily};
use crate::domain::config::{MACD, MacdConfig};
use crate::domain::context::DecisionContext;
use crate::domain::error::ModuleError;
use crate::domain::indicator::{IndicatorValue, calculate_macd};
use crate::domain::signal::{ModuleResult, Signal};

/// Histograms within this fraction of the close are rounding noise.
const FLAT_EPSILON: f64 = 1e-12;

pub struct MacdModule {
    config: MacdConfig,
}

impl MacdModule {
    pub fn new(config: MacdConfig) -> Self {
        Self { config }
    }

    fn warmup(&self) -> usize {
        self.config.fast.max(self.config.slow) + self.config.signal - 1
    }
}

impl AnalysisModule for MacdModule {
    fn name(&self) -> &'static str {
        MACD
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn analyze(&self, ctx: &DecisionContext) -> Result<ModuleResult, ModuleError> {
        let daily = usable_daily(ctx);
        let series = calculate_macd(
            &daily,
            self.config.fast,
            self.config.slow,
            self.config.signal,
        );
        let Some(IndicatorValue::Macd {
            line, histogram, ..
        }) = series.latest()
        else {
            return Ok(insufficient(MACD, daily.len(), self.warmup()));
        };
        let close = daily[daily.len() - 1].close;

        let scale = close * self.config.scale_pct;
        let strength = (histogram.abs() / scale).min(1.0);
        if !strength.is_finite() {
            return Err(ModuleError::NonFinite {
                module: MACD.to_string(),
                field: "strength",
            });
        }

        let result = if histogram.abs() <= close * FLAT_EPSILON {
            ModuleResult::hold("MACD histogram flat")
        } else if histogram > 0.0 {
            ModuleResult::directional(
                Signal::Long,
                strength,
                strength,
                format!("MACD histogram positive ({:+.4})", histogram),
            )
        } else {
            ModuleResult::directional(
                Signal::Short,
                strength,
                strength,
                format!("MACD histogram negative ({:+.4})", histogram),
            )
        };
        Ok(result
            .with_metric("macd_line", line)
            .with_metric("macd_histogram", histogram))
    }
}
