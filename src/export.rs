//! Tabular export of session history.
//!
//! Column contract: `type, result, confidence, timestamp, image_name`, then
//! one column per feature key seen in any record (sorted), left empty for
//! records that do not carry that key.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::{format_measurement, AnalysisRecord};

pub const BASE_COLUMNS: [&str; 5] = ["type", "result", "confidence", "timestamp", "image_name"];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Header row plus one row per record, all cells rendered as text.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn history_table(records: &[AnalysisRecord]) -> HistoryTable {
    let detail_keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.verdict().details().keys())
        .collect();

    let headers = BASE_COLUMNS
        .iter()
        .copied()
        .chain(detail_keys.iter().copied())
        .map(String::from)
        .collect();

    let rows = records
        .iter()
        .map(|record| {
            let verdict = record.verdict();
            let mut row = vec![
                verdict.subject_type().analysis_label().to_string(),
                verdict.condition().label().to_string(),
                format_measurement(verdict.confidence()),
                verdict.timestamp_display(),
                verdict.source_name().to_string(),
            ];
            row.extend(
                detail_keys
                    .iter()
                    .map(|key| verdict.details().display_value(key).unwrap_or_default()),
            );
            row
        })
        .collect();

    HistoryTable { headers, rows }
}

/// Write the history as CSV (header row first) to any writer.
pub fn write_csv<W: Write>(records: &[AnalysisRecord], writer: W) -> Result<(), ExportError> {
    let table = history_table(records);
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(&table.headers)?;
    for row in &table.rows {
        csv_writer.write_record(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn export_to_path(records: &[AnalysisRecord], path: &Path) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_csv(records, std::io::BufWriter::new(file))?;
    tracing::info!(rows = records.len(), path = %path.display(), "History exported");
    Ok(())
}

/// `plant_soil_analysis_<YYYYmmdd_HHMMSS>.csv`
pub fn export_file_name(now: NaiveDateTime) -> String {
    format!("plant_soil_analysis_{}.csv", now.format("%Y%m%d_%H%M%S"))
}
