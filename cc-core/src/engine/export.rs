//! History export
//!
//! After each tick the controller hands every zone's latest samples to an
//! `ExportSink`. The sink decides where they go; `CsvExportSink` appends
//! them to `<dir>/<zone>.cooling.csv`.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde::Serialize;

use crate::constants::paths::EXPORT_SUFFIX;
use crate::engine::history::{Operation, Sample, Timestamp};
use crate::error::{CoolingError, Result};

/// One exported sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub timestamp: Timestamp,
    pub object: String,
    pub operation: Operation,
    pub value: f32,
}

impl ExportRow {
    pub fn new(object: &str, operation: Operation, sample: Sample) -> Self {
        Self {
            timestamp: sample.timestamp,
            object: object.to_string(),
            operation,
            value: sample.value,
        }
    }
}

/// Append-only destination for exported rows
#[cfg_attr(test, mockall::automock)]
pub trait ExportSink: Send {
    fn append(&mut self, zone: &str, rows: &[ExportRow]) -> Result<()>;
}

/// Appends rows to one CSV file per zone
#[derive(Debug, Clone)]
pub struct CsvExportSink {
    dir: PathBuf,
}

impl CsvExportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn zone_path(&self, zone: &str) -> PathBuf {
        self.dir.join(format!("{}{}", zone, EXPORT_SUFFIX))
    }
}

impl ExportSink for CsvExportSink {
    fn append(&mut self, zone: &str, rows: &[ExportRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let path = self.zone_path(zone);
        let export_err = |source| CoolingError::Export {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(export_err)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(export_err)?;

        let mut writer = BufWriter::new(file);
        for row in rows {
            writeln!(writer, "{}", csv_line(row)).map_err(export_err)?;
        }
        writer.flush().map_err(export_err)?;
        Ok(())
    }
}

// Every field quoted, embedded quotes doubled
fn csv_line(row: &ExportRow) -> String {
    [
        row.timestamp.to_string(),
        row.object.clone(),
        row.operation.as_str().to_string(),
        row.value.to_string(),
    ]
    .iter()
    .map(|field| format!("\"{}\"", field.replace('"', "\"\"")))
    .collect::<Vec<_>>()
    .join(",")
}
