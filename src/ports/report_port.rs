//! Report output port trait.

use crate::domain::drivers::DecisionRecord;
use crate::domain::error::TailSignalError;
use std::path::Path;

/// Port for writing backtest decisions.
pub trait ReportPort {
    fn write_decisions(
        &self,
        records: &[DecisionRecord],
        output_path: &Path,
    ) -> Result<(), TailSignalError>;
}
