#![warn(missing_docs)]
//! diffbench Report - Results Output
//!
//! Everything a run leaves on disk:
//! - CSV rows, one per repetition, flushed periodically
//! - JSONL failure log for cells that could not be measured
//! - JSON run report with per-cell convergence and totals

mod csv;
mod failures;
mod json;
mod report;
mod row;

pub use csv::{CsvRowWriter, escape_field};
pub use failures::{FailureLog, FailureRecord, read_failure_log};
pub use json::{generate_json_report, read_json_report, write_json_report};
pub use report::{
    CellResult, REPORT_SCHEMA_VERSION, Report, ReportConfig, ReportMeta, ReportSummary, SystemInfo,
};
pub use row::{BenchmarkRow, RowLayout};

/// Errors writing or reading run output
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Data does not match the expected layout or version
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
}
