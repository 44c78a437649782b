//! Untyped tabular snapshot shared by every extractor.
//!
//! Spreadsheet sheets, CSV files and API pages are all captured as a grid
//! of [`Cell`]s with absolute row/column positions, so transformers can
//! address header rows the same way the source documents them.

use calamine::Data;
use std::fmt;

/// A single raw cell value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    /// True for empty cells and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed text form, `None` when blank
    pub fn as_label(&self) -> Option<String> {
        if self.is_blank() {
            None
        } else {
            Some(self.to_string().trim().to_string())
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            // Spreadsheet years arrive as floats; print 2019.0 as 2019
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
            Cell::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) => Cell::text(s.clone()),
            Data::Bool(b) => Cell::Bool(*b),
            other => Cell::text(other.to_string()),
        }
    }
}

/// A rectangular-ish grid of cells; rows may be ragged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Build a table from string rows; empty strings become [`Cell::Empty`]
    pub fn from_strings<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Cell::text).collect())
                .collect(),
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell at (row, col); out-of-range positions read as empty
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Header labels of a row, trimmed, blanks as empty strings
    pub fn header(&self, row: usize) -> Vec<String> {
        (0..self.width())
            .map(|col| self.cell(row, col).as_label().unwrap_or_default())
            .collect()
    }

    /// Rows strictly below `header_row`
    pub fn data_rows(&self, header_row: usize) -> &[Vec<Cell>] {
        self.rows.get(header_row + 1..).unwrap_or(&[])
    }
}

/// A merged cell region, zero-based and inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MergedRange {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

/// One named table from a source file
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub name: String,
    pub table: RawTable,
    pub merged: Vec<MergedRange>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, table: RawTable) -> Self {
        Self {
            name: name.into(),
            table,
            merged: Vec::new(),
        }
    }

    pub fn with_merged(mut self, mut merged: Vec<MergedRange>) -> Self {
        merged.sort();
        self.merged = merged;
        self
    }
}

/// Everything extracted for one descriptor, in a fixed sheet order
#[derive(Debug, Clone, Default)]
pub struct RawSource {
    pub descriptor: String,
    pub sheets: Vec<RawSheet>,
}

impl RawSource {
    pub fn new(descriptor: impl Into<String>, sheets: Vec<RawSheet>) -> Self {
        Self {
            descriptor: descriptor.into(),
            sheets,
        }
    }

    pub fn sheet(&self, name: &str) -> Option<&RawSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}
