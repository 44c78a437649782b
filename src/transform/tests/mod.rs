//! Tests for the source transformers
//!
//! Raw sources are built in memory, so no spreadsheet fixtures are needed.

pub mod wide_sources;

use crate::country::CountryCoder;
use crate::extract::{MergedRange, RawSheet, RawSource, RawTable};
use crate::registry::{SourceDescriptor, SourceLayout, SourceRegistry};

/// Coder knowing the handful of countries used in fixtures
pub fn test_coder() -> CountryCoder {
    let mut coder = CountryCoder::with_aliases();
    coder.extend([
        ("Kenya", "KEN"),
        ("Chile", "CHL"),
        ("Syrian Arab Republic", "SYR"),
        ("Côte d'Ivoire", "CIV"),
    ]);
    coder
}

pub fn sheet(name: &str, rows: Vec<Vec<&str>>) -> RawSheet {
    RawSheet::new(name, RawTable::from_strings(rows))
}

pub fn source(descriptor: &SourceDescriptor, sheets: Vec<RawSheet>) -> RawSource {
    RawSource::new(descriptor.name.clone(), sheets)
}

pub fn builtin(name: &str) -> SourceDescriptor {
    SourceRegistry::default().lookup(name).unwrap().clone()
}

pub fn descriptor(name: &str, layout: SourceLayout) -> SourceDescriptor {
    SourceDescriptor::new(name, "Test", "test.xlsx", layout)
}

pub fn merged(start_row: usize, start_col: usize, end_row: usize, end_col: usize) -> MergedRange {
    MergedRange {
        start_row,
        start_col,
        end_row,
        end_col,
    }
}
