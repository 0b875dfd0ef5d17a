//! CSV Row Output
//!
//! Append-only writer. The header is taken from the first row; every later
//! row must have the same columns. Buffers are flushed once per
//! `flush_interval` of wall-clock time, bounding what an abrupt exit loses.

use crate::ReportError;
use crate::row::{BenchmarkRow, RowLayout};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

/// Quote a field when it contains a delimiter, quote or line break.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Buffered CSV writer with periodic flushing
pub struct CsvRowWriter<W: Write> {
    out: BufWriter<W>,
    header: Option<Vec<String>>,
    flush_interval: Duration,
    last_flush: Instant,
    rows_written: usize,
}

impl CsvRowWriter<File> {
    /// Create (truncating) a CSV file at `path`.
    pub fn create(path: impl AsRef<Path>, flush_interval: Duration) -> Result<Self, ReportError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(File::create(path)?, flush_interval))
    }
}

impl<W: Write> CsvRowWriter<W> {
    /// Wrap any writer
    pub fn new(inner: W, flush_interval: Duration) -> Self {
        Self {
            out: BufWriter::new(inner),
            header: None,
            flush_interval,
            last_flush: Instant::now(),
            rows_written: 0,
        }
    }

    /// Data rows written so far
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Write one record given as (column, value) pairs.
    pub fn write_record<K: AsRef<str>, V: AsRef<str>>(
        &mut self,
        record: &[(K, V)],
    ) -> Result<(), ReportError> {
        let columns: Vec<&str> = record.iter().map(|(k, _)| k.as_ref()).collect();
        match &self.header {
            None => {
                self.write_line(columns.iter().copied())?;
                self.header = Some(columns.iter().map(|c| c.to_string()).collect());
            }
            Some(header) => {
                if header.len() != columns.len() || header.iter().zip(&columns).any(|(h, c)| h != c) {
                    return Err(ReportError::SchemaMismatch(format!(
                        "row columns [{}] differ from header [{}]",
                        columns.join(","),
                        header.join(",")
                    )));
                }
            }
        }

        self.write_line(record.iter().map(|(_, v)| v.as_ref()))?;
        self.rows_written += 1;
        self.maybe_flush()
    }

    /// Write a benchmark row under `layout`.
    pub fn write_row(&mut self, row: &BenchmarkRow, layout: RowLayout) -> Result<(), ReportError> {
        let record: Vec<(&str, String)> = BenchmarkRow::columns(layout)
            .into_iter()
            .zip(row.values(layout))
            .collect();
        self.write_record(&record)
    }

    /// Flush buffered rows to the underlying writer.
    pub fn flush(&mut self) -> Result<(), ReportError> {
        self.out.flush()?;
        self.last_flush = Instant::now();
        Ok(())
    }

    /// Flush and return the inner writer
    pub fn into_inner(mut self) -> Result<W, ReportError> {
        self.out.flush()?;
        self.out
            .into_inner()
            .map_err(|e| ReportError::Io(e.into_error()))
    }

    fn maybe_flush(&mut self) -> Result<(), ReportError> {
        if self.last_flush.elapsed() >= self.flush_interval {
            self.flush()?;
        }
        Ok(())
    }

    fn write_line<'a>(&mut self, fields: impl Iterator<Item = &'a str>) -> Result<(), ReportError> {
        let line: Vec<String> = fields.map(escape_field).collect();
        writeln!(self.out, "{}", line.join(","))?;
        Ok(())
    }
}
