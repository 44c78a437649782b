//! Per-source transformation into canonical observations
//!
//! Transformers reshape raw tables (wide year columns, indicator columns,
//! merged indicator blocks) into one [`Observation`] per country, year and
//! indicator. Structural problems such as a missing sheet or column are
//! errors; problems confined to one row are counted in [`TransformStats`]
//! and the row is dropped.

use crate::constants::{BOOLEAN_VALUE_TOKENS, MISSING_VALUE_TOKENS};
use crate::country::CountryCoder;
use crate::error::{NexusError, Result};
use crate::extract::{Cell, RawSheet, RawSource, RawTable};
use crate::models::{Observation, SeriesMeta};
use crate::registry::{SourceDescriptor, SourceLayout};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

mod fsi;
mod gfi;
mod isora;
pub mod stats;
mod unodc;
mod usaid;
mod world_bank;

#[cfg(test)]
mod tests;

pub use stats::TransformStats;

/// Observations and counts produced for one source
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub observations: Vec<Observation>,
    pub stats: TransformStats,
}

/// Reshape one extracted source according to its layout
pub fn transform(
    raw: &RawSource,
    descriptor: &SourceDescriptor,
    coder: &CountryCoder,
) -> Result<TransformOutput> {
    let mut out = Collector::new(coder);

    match &descriptor.layout {
        SourceLayout::IsoraWorkbook { sheets, .. } => {
            isora::transform(raw, descriptor, sheets, &mut out)?
        }
        SourceLayout::PefaWorkbook { years, .. } => {
            world_bank::transform_pefa(raw, descriptor, years.clone(), &mut out)?
        }
        SourceLayout::TaxGapCsv {
            measure_columns, ..
        } => world_bank::transform_taxgap(raw, descriptor, measure_columns, &mut out)?,
        SourceLayout::WdiIndicators { .. } => {
            world_bank::transform_wdi(raw, descriptor, &mut out)?
        }
        SourceLayout::WgiWorkbook { labels, .. } => {
            world_bank::transform_wgi(raw, descriptor, labels, &mut out)?
        }
        SourceLayout::GfiWorkbook {
            header_row, tables, ..
        } => gfi::transform(raw, descriptor, *header_row, tables, &mut out)?,
        SourceLayout::UsaidWorkbook {
            sheet,
            indicator_columns,
            ..
        } => usaid::transform(raw, descriptor, sheet, indicator_columns.clone(), &mut out)?,
        SourceLayout::FsiCsv {
            indicator_columns, ..
        } => fsi::transform(raw, descriptor, indicator_columns.clone(), &mut out)?,
        SourceLayout::UnodcWorkbooks {
            header_row,
            indicator_code,
            indicator_label,
            ..
        } => unodc::transform(
            raw,
            descriptor,
            *header_row,
            &SeriesMeta::new(
                &descriptor.source,
                &descriptor.database,
                &descriptor.database,
                indicator_code,
                indicator_label,
            ),
            &mut out,
        )?,
    }

    let output = out.finish();
    let stats = &output.stats;
    info!(
        "Transformed '{}': {} observations, {} excluded ({} unresolved countries, {} bad years, {} bad values)",
        descriptor.name,
        stats.observations,
        stats.excluded(),
        stats.unresolved_countries,
        stats.malformed_years,
        stats.malformed_values
    );
    if !stats.unresolved_labels.is_empty() {
        debug!(
            "Unresolved country labels in '{}': {:?}",
            descriptor.name, stats.unresolved_labels
        );
    }

    Ok(output)
}

// =============================================================================
// Value and year coercion
// =============================================================================

/// A coerced cell value with its optional annotation
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedValue {
    pub value: Option<f64>,
    pub meta: Option<String>,
}

/// A number followed by a short letter or symbol marker, or a parenthesised note
static FOOTNOTED_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s*([A-Za-z*†‡]{1,3}|\([^)]*\))$")
        .unwrap()
});

/// Coerce a raw text value.
///
/// Placeholder tokens become a missing value with the token kept as meta,
/// `Yes`/`No` become 1/0, and a number followed by a footnote marker keeps
/// the marker as meta. Returns `None` for anything else, including ranges,
/// fractions, magnitude words and space-grouped digits.
pub fn parse_value(raw: &str) -> Option<ParsedValue> {
    let cleaned = raw.trim().replace(',', "");

    if MISSING_VALUE_TOKENS.contains(&cleaned.as_str()) {
        return Some(ParsedValue {
            value: None,
            meta: Some(cleaned),
        });
    }

    if let Some((_, number)) = BOOLEAN_VALUE_TOKENS.iter().find(|(token, _)| *token == cleaned) {
        return Some(ParsedValue {
            value: Some(*number),
            meta: Some(cleaned),
        });
    }

    if let Ok(number) = cleaned.parse::<f64>() {
        return number.is_finite().then_some(ParsedValue {
            value: Some(number),
            meta: None,
        });
    }

    let captures = FOOTNOTED_NUMBER.captures(&cleaned)?;
    let number = captures[1].parse::<f64>().ok().filter(|n| n.is_finite())?;
    Some(ParsedValue {
        value: Some(number),
        meta: Some(captures[2].trim().to_string()),
    })
}

/// Coerce a spreadsheet or CSV cell
pub fn parse_cell(cell: &Cell) -> Option<ParsedValue> {
    match cell {
        Cell::Empty => Some(ParsedValue {
            value: None,
            meta: None,
        }),
        Cell::Number(n) => n.is_finite().then_some(ParsedValue {
            value: Some(*n),
            meta: None,
        }),
        Cell::Bool(b) => Some(ParsedValue {
            value: Some(if *b { 1.0 } else { 0.0 }),
            meta: None,
        }),
        Cell::Text(s) => parse_value(s),
    }
}

/// Outcome of reading a year cell or label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedYear {
    Year(i32),
    Blank,
    Invalid,
}

impl ParsedYear {
    pub fn from_number(n: f64) -> Self {
        if n.fract() == 0.0 && (1000.0..=9999.0).contains(&n) {
            ParsedYear::Year(n as i32)
        } else {
            ParsedYear::Invalid
        }
    }
}

/// Read a year from a header label or data cell
pub fn parse_year(cell: &Cell) -> ParsedYear {
    match cell {
        Cell::Number(n) => ParsedYear::from_number(*n),
        Cell::Text(s) if s.trim().is_empty() => ParsedYear::Blank,
        Cell::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(ParsedYear::from_number)
            .unwrap_or(ParsedYear::Invalid),
        Cell::Empty => ParsedYear::Blank,
        Cell::Bool(_) => ParsedYear::Invalid,
    }
}

// =============================================================================
// Row collection
// =============================================================================

/// Accumulates observations and exclusion counts for one source
pub(crate) struct Collector<'a> {
    coder: &'a CountryCoder,
    observations: Vec<Observation>,
    stats: TransformStats,
    /// Drop rows whose value coerces to missing instead of keeping them
    drop_missing: bool,
}

impl<'a> Collector<'a> {
    pub(crate) fn new(coder: &'a CountryCoder) -> Self {
        Self {
            coder,
            observations: Vec::new(),
            stats: TransformStats::new(),
            drop_missing: false,
        }
    }

    pub(crate) fn drop_missing_values(&mut self, drop: bool) {
        self.drop_missing = drop;
    }

    /// Resolve a country display name, remembering failures for the log
    pub(crate) fn country_by_name(&mut self, cell: &Cell) -> Option<String> {
        let label = cell.as_label()?;
        let code = self.coder.resolve_name(&label);
        if code.is_none() {
            self.stats.unresolved_labels.insert(label);
        }
        code
    }

    /// Validate a country code cell, remembering failures for the log
    pub(crate) fn country_by_code(&mut self, cell: &Cell) -> Option<String> {
        let label = cell.as_label()?;
        let code = self.coder.resolve_code(&label);
        if code.is_none() {
            self.stats.unresolved_labels.insert(label);
        }
        code
    }

    /// Count a candidate dropped by a source rule
    pub(crate) fn filter(&mut self) {
        self.stats.candidates += 1;
        self.stats.filtered += 1;
    }

    /// Consider one raw value cell
    pub(crate) fn push(
        &mut self,
        meta: &SeriesMeta,
        country: Option<&str>,
        year: ParsedYear,
        cell: &Cell,
    ) {
        self.stats.candidates += 1;

        if cell.is_blank() {
            self.stats.empty_values += 1;
            return;
        }
        let Some(country) = country else {
            self.stats.unresolved_countries += 1;
            return;
        };
        let year = match year {
            ParsedYear::Year(y) => Some(y),
            ParsedYear::Blank => None,
            ParsedYear::Invalid => {
                self.stats.malformed_years += 1;
                return;
            }
        };
        let Some(parsed) = parse_cell(cell) else {
            self.stats.malformed_values += 1;
            return;
        };
        if self.drop_missing && parsed.value.is_none() {
            self.stats.filtered += 1;
            return;
        }

        self.emit(meta, country, year, parsed);
    }

    /// Record an already-coerced observation
    pub(crate) fn emit(
        &mut self,
        meta: &SeriesMeta,
        country: &str,
        year: Option<i32>,
        parsed: ParsedValue,
    ) {
        self.stats.observations += 1;
        self.observations.push(meta.observation(
            country.to_string(),
            year,
            parsed.value,
            parsed.meta,
        ));
    }

    pub(crate) fn stats_mut(&mut self) -> &mut TransformStats {
        &mut self.stats
    }

    pub(crate) fn finish(self) -> TransformOutput {
        TransformOutput {
            observations: self.observations,
            stats: self.stats,
        }
    }
}

// =============================================================================
// Table helpers
// =============================================================================

pub(crate) fn require_sheet<'r>(
    raw: &'r RawSource,
    descriptor: &SourceDescriptor,
    name: &str,
) -> Result<&'r RawSheet> {
    raw.sheet(name).ok_or_else(|| {
        NexusError::malformed(&descriptor.name, format!("sheet '{}' was not extracted", name))
    })
}

pub(crate) fn sheet_at<'r>(
    raw: &'r RawSource,
    descriptor: &SourceDescriptor,
    index: usize,
) -> Result<&'r RawSheet> {
    raw.sheets.get(index).ok_or_else(|| {
        NexusError::malformed(
            &descriptor.name,
            format!("expected at least {} sheet(s), got {}", index + 1, raw.sheets.len()),
        )
    })
}

/// Position of a named header column
pub(crate) fn column_index(
    header: &[String],
    descriptor: &SourceDescriptor,
    name: &str,
) -> Result<usize> {
    header.iter().position(|h| h == name).ok_or_else(|| {
        NexusError::malformed(&descriptor.name, format!("missing column '{}'", name))
    })
}

/// Wide layout: one row per country, one column per year
#[derive(Debug, Clone, Copy)]
pub(crate) struct WideYears<'h> {
    pub header_row: usize,
    pub country_column: usize,
    pub first_value_column: usize,
    /// Header labels that are not years (e.g. a trailing average)
    pub skip_labels: &'h [&'h str],
}

/// Melt a wide year table keyed by country name
pub(crate) fn melt_year_columns(
    table: &RawTable,
    layout: WideYears<'_>,
    meta: &SeriesMeta,
    out: &mut Collector<'_>,
) {
    let years: Vec<(usize, ParsedYear)> = (layout.first_value_column..table.width())
        .filter_map(|col| {
            let header = table.cell(layout.header_row, col);
            let label = header.as_label()?;
            if layout.skip_labels.contains(&label.as_str()) {
                return None;
            }
            Some((col, parse_year(header)))
        })
        .collect();

    for row in layout.header_row + 1..table.height() {
        let name = table.cell(row, layout.country_column);
        if name.is_blank() {
            continue;
        }
        let country = out.country_by_name(name);
        for (col, year) in &years {
            out.push(meta, country.as_deref(), *year, table.cell(row, *col));
        }
    }
}
