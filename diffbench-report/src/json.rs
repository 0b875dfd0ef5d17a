//! JSON Output

use crate::ReportError;
use crate::report::{REPORT_SCHEMA_VERSION, Report};
use std::path::Path;

/// Generate a prettified JSON report.
pub fn generate_json_report(report: &Report) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write the report to `path`, creating parent directories.
pub fn write_json_report(path: impl AsRef<Path>, report: &Report) -> Result<(), ReportError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, generate_json_report(report)?)?;
    Ok(())
}

/// Load a report, rejecting other schema versions.
pub fn read_json_report(path: impl AsRef<Path>) -> Result<Report, ReportError> {
    let text = std::fs::read_to_string(path)?;
    let report: Report = serde_json::from_str(&text)?;
    if report.meta.schema_version != REPORT_SCHEMA_VERSION {
        return Err(ReportError::SchemaMismatch(format!(
            "report schema version {} (expected {})",
            report.meta.schema_version, REPORT_SCHEMA_VERSION
        )));
    }
    Ok(report)
}
