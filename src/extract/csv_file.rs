//! CSV extraction via the csv crate.
//!
//! Every field is kept as text; numeric coercion belongs to the
//! transformers.

use super::spreadsheet::ensure_exists;
use super::table::{Cell, RawSheet, RawTable};
use crate::error::{NexusError, Result};
use csv::StringRecord;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

fn csv_error(source_name: &str, path: &Path, reason: impl ToString) -> NexusError {
    NexusError::Csv {
        source_name: source_name.to_string(),
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn record_cells(record: &StringRecord) -> Vec<Cell> {
    record
        .iter()
        .map(|field| Cell::text(field.trim_start_matches('\u{feff}')))
        .collect()
}

fn open_reader(source_name: &str, path: &Path) -> Result<csv::Reader<std::fs::File>> {
    ensure_exists(source_name, path)?;
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(source_name, path, e))
}

/// Read a whole CSV file; the header stays on row 0
pub fn read_csv(source_name: &str, path: &Path) -> Result<RawSheet> {
    let mut reader = open_reader(source_name, path)?;
    let mut rows = Vec::new();
    let mut record = StringRecord::new();

    while reader
        .read_record(&mut record)
        .map_err(|e| csv_error(source_name, path, e))?
    {
        rows.push(record_cells(&record));
    }

    debug!("Read {} CSV rows from {}", rows.len(), path.display());
    Ok(RawSheet::new(file_label(path), RawTable::new(rows)))
}

/// Stream a CSV file keeping the header and only rows whose `key_column`
/// value is in `keep`. Used for the multi-gigabyte WDI dump.
pub fn read_csv_filtered(
    source_name: &str,
    path: &Path,
    key_column: &str,
    keep: &[String],
) -> Result<RawSheet> {
    let mut reader = open_reader(source_name, path)?;
    let mut record = StringRecord::new();

    if !reader
        .read_record(&mut record)
        .map_err(|e| csv_error(source_name, path, e))?
    {
        return Err(csv_error(source_name, path, "file is empty"));
    }
    let header = record_cells(&record);
    let key_index = header
        .iter()
        .position(|c| c.as_label().as_deref() == Some(key_column))
        .ok_or_else(|| {
            NexusError::malformed(source_name, format!("missing column '{}'", key_column))
        })?;

    let keep: HashSet<&str> = keep.iter().map(String::as_str).collect();
    let mut rows = vec![header];
    let mut scanned = 0usize;

    while reader
        .read_record(&mut record)
        .map_err(|e| csv_error(source_name, path, e))?
    {
        scanned += 1;
        if record.get(key_index).is_some_and(|k| keep.contains(k.trim())) {
            rows.push(record_cells(&record));
        }
    }

    debug!(
        "Kept {} of {} rows from {}",
        rows.len() - 1,
        scanned,
        path.display()
    );
    Ok(RawSheet::new(file_label(path), RawTable::new(rows)))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
