//! CSV backtest report adapter: one row per evaluation point.

use crate::domain::drivers::DecisionRecord;
use crate::domain::error::TailSignalError;
use crate::domain::signal::Signal;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;

pub const REPORT_HEADER: [&str; 5] = ["date", "close", "signal", "confidence", "reason"];

#[derive(Serialize)]
struct DecisionRow<'a> {
    date: NaiveDate,
    close: f64,
    signal: Signal,
    confidence: f64,
    reason: &'a str,
}

pub struct CsvReportAdapter;

impl ReportPort for CsvReportAdapter {
    fn write_decisions(
        &self,
        records: &[DecisionRecord],
        output_path: &Path,
    ) -> Result<(), TailSignalError> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(output_path)?;
        wtr.write_record(REPORT_HEADER)?;
        for record in records {
            wtr.serialize(DecisionRow {
                date: record.date,
                close: record.close,
                signal: record.decision.signal,
                confidence: record.decision.confidence,
                reason: record.decision.primary_reason(),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }
}
