//! Failure Log
//!
//! Cells that could not be measured are appended as JSON lines next to the
//! result rows, so a sweep can continue and failures can be inspected later.

use crate::ReportError;
use chrono::{DateTime, Utc};
use diffbench_gen::GenerationConfig;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// One failed (config, program) cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub timestamp: DateTime<Utc>,
    pub diff_program: String,
    pub generation_config_i: usize,
    pub regen_i: usize,
    pub config: GenerationConfig,
    pub error: String,
}

/// Append-only JSONL failure log
pub struct FailureLog {
    out: BufWriter<File>,
    count: usize,
}

impl FailureLog {
    /// Create (truncating) the log at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            out: BufWriter::new(file),
            count: 0,
        })
    }

    /// Append and flush one record. Failures are rare, so each is flushed.
    pub fn record(&mut self, record: &FailureRecord) -> Result<(), ReportError> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.count += 1;
        Ok(())
    }

    /// Records written so far
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Read every record of a failure log.
pub fn read_failure_log(path: impl AsRef<Path>) -> Result<Vec<FailureRecord>, ReportError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}
