//! Financial Secrecy Index: one row per country, one column per
//! indicator and edition. The edition year is embedded in the header
//! (`fsi2020`, `ss_22`); stripping it yields the indicator code.

use super::{Collector, ParsedYear, column_index, sheet_at};
use crate::error::{NexusError, Result};
use crate::extract::RawSource;
use crate::models::SeriesMeta;
use crate::registry::SourceDescriptor;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static YEAR_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{2,4}").unwrap());

/// Year embedded in an FSI header; two-digit years pivot at 50
pub(crate) fn header_year(label: &str) -> ParsedYear {
    let Some(digits) = YEAR_DIGITS.find(label) else {
        return ParsedYear::Invalid;
    };
    let Ok(number) = digits.as_str().parse::<i32>() else {
        return ParsedYear::Invalid;
    };
    match digits.as_str().len() {
        2 if number <= 50 => ParsedYear::Year(2000 + number),
        2 => ParsedYear::Year(1900 + number),
        4 => ParsedYear::Year(number),
        _ => ParsedYear::Invalid,
    }
}

/// Header with the year digits removed
pub(crate) fn header_code(label: &str) -> String {
    YEAR_DIGITS.replace_all(label, "").into_owned()
}

pub(super) fn transform(
    raw: &RawSource,
    descriptor: &SourceDescriptor,
    indicator_columns: Range<usize>,
    out: &mut Collector<'_>,
) -> Result<()> {
    let table = &sheet_at(raw, descriptor, 0)?.table;
    let header = table.header(0);
    let iso3 = column_index(&header, descriptor, "iso3")?;

    let series: Vec<(usize, ParsedYear, SeriesMeta)> = indicator_columns
        .filter(|col| *col < header.len() && !header[*col].is_empty())
        .map(|col| {
            let label = &header[col];
            let meta = SeriesMeta::new(
                &descriptor.source,
                &descriptor.database,
                &descriptor.database,
                header_code(label),
                label,
            );
            (col, header_year(label), meta)
        })
        .collect();
    if series.is_empty() {
        return Err(NexusError::malformed(&descriptor.name, "no indicator columns"));
    }

    for row in 1..table.height() {
        let cell = table.cell(row, iso3);
        if cell.is_blank() {
            continue;
        }
        let country = out.country_by_code(cell);
        for (col, year, meta) in &series {
            out.push(meta, country.as_deref(), *year, table.cell(row, *col));
        }
    }

    Ok(())
}
