//! RSI auxiliary module.
//!
//! Oversold RSI leans LONG, overbought leans SHORT. Strength is how far past
//! the bound the reading sits, relative to the room left beyond it.

use crate::domain::analysis::{AnalysisModule, insufficient, usable_daily};
use crate::domain::config::{RSI, RsiConfig};
use crate::domain::context::DecisionContext;
use crate::domain::error::ModuleError;
use crate::domain::indicator::calculate_rsi;
use crate::domain::signal::{ModuleResult, Signal};

pub struct RsiModule {
    config: RsiConfig,
}

impl RsiModule {
    pub fn new(config: RsiConfig) -> Self {
        Self { config }
    }
}

impl AnalysisModule for RsiModule {
    fn name(&self) -> &'static str {
        RSI
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn analyze(&self, ctx: &DecisionContext) -> Result<ModuleResult, ModuleError> {
        let daily = usable_daily(ctx);
        let Some(rsi) = calculate_rsi(&daily, self.config.period).latest_simple() else {
            return Ok(insufficient(RSI, daily.len(), self.config.period + 1));
        };
        if !rsi.is_finite() {
            return Err(ModuleError::NonFinite {
                module: RSI.to_string(),
                field: "rsi",
            });
        }

        let RsiConfig {
            oversold,
            overbought,
            ..
        } = self.config;
        let result = if rsi < oversold {
            let strength = (oversold - rsi) / oversold;
            ModuleResult::directional(
                Signal::Long,
                strength,
                strength,
                format!("RSI {:.1} oversold (< {:.0})", rsi, oversold),
            )
        } else if rsi > overbought {
            let strength = (rsi - overbought) / (100.0 - overbought);
            ModuleResult::directional(
                Signal::Short,
                strength,
                strength,
                format!("RSI {:.1} overbought (> {:.0})", rsi, overbought),
            )
        } else {
            ModuleResult::hold(format!("RSI {:.1} neutral", rsi))
        };
        Ok(result.with_metric("rsi", rsi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::{Duration, NaiveDate};

    fn analyze(closes: impl IntoIterator<Item = f64>) -> ModuleResult {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let bars: Vec<OhlcvBar> = closes
            .into_iter()
            .enumerate()
            .map(|(i, c)| OhlcvBar {
                date: start + Duration::days(i as i64),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 10.0,
            })
            .collect();
        let as_of = bars[bars.len() - 1].date + Duration::days(1);
        RsiModule::new(RsiConfig::default())
            .analyze(&DecisionContext::new(&bars, &[], as_of))
            .unwrap()
    }

    #[test]
    fn persistent_selling_is_oversold_long() {
        let result = analyze((0..30).map(|i| 200.0 - i as f64));
        assert_eq!(result.signal, Signal::Long);
        assert_eq!(result.strength, 1.0);
        assert_eq!(result.metrics["rsi"], 0.0);
    }

    #[test]
    fn persistent_buying_is_overbought_short() {
        let result = analyze((0..30).map(|i| 100.0 + i as f64));
        assert_eq!(result.signal, Signal::Short);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn chop_is_neutral() {
        let result = analyze((0..30).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }));
        assert_eq!(result.signal, Signal::Hold);
        assert!(result.reason.contains("neutral"));
    }

    #[test]
    fn warmup_is_insufficient() {
        let result = analyze((0..10).map(|i| 100.0 + i as f64));
        assert!(result.reason.contains("insufficient"));
    }
}
