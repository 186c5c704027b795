//! Analysis modules: independent, read-only siblings evaluated against the
//! same [`DecisionContext`].

pub mod bollinger;
pub mod fibonacci;
pub mod macd;
pub mod rsi;
pub mod trend;
pub mod weekly_tails;

pub use bollinger::BollingerModule;
pub use fibonacci::FibonacciModule;
pub use macd::MacdModule;
pub use rsi::RsiModule;
pub use trend::TrendModule;
pub use weekly_tails::{WeeklyTailAnalyzer, calculate_tail_strength};

use crate::domain::config::SignalConfig;
use crate::domain::context::DecisionContext;
use crate::domain::error::ModuleError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::ModuleResult;

/// Contract every analysis module satisfies.
///
/// Modules must not keep state between calls and must not read outside the
/// context they are given.
pub trait AnalysisModule: Send + Sync {
    /// Key used for weights and in decision metrics.
    fn name(&self) -> &'static str;

    /// Disabled modules are reported as `Disabled` without being run.
    fn enabled(&self) -> bool {
        true
    }

    fn analyze(&self, ctx: &DecisionContext) -> Result<ModuleResult, ModuleError>;
}

/// The standard module set, in evaluation order.
pub fn default_modules(config: &SignalConfig) -> Vec<Box<dyn AnalysisModule>> {
    vec![
        Box::new(WeeklyTailAnalyzer::new(config.tails.clone())),
        Box::new(FibonacciModule::new(config.fibonacci.clone())),
        Box::new(TrendModule::new(config.trend.clone(), config.regime.clone())),
        Box::new(RsiModule::new(config.rsi.clone())),
        Box::new(MacdModule::new(config.macd.clone())),
        Box::new(BollingerModule::new(config.bollinger.clone())),
    ]
}

/// Daily bars with corrupt rows removed. Auxiliary modules compute on this.
pub(crate) fn usable_daily(ctx: &DecisionContext) -> Vec<OhlcvBar> {
    ctx.daily().iter().filter(|b| b.is_valid()).cloned().collect()
}

pub(crate) fn insufficient(module: &str, have: usize, need: usize) -> ModuleResult {
    ModuleResult::hold(format!(
        "{}: insufficient data ({} daily candles, need {})",
        module, have, need
    ))
}
