//! UNODC drug market losses.
//!
//! Seizures (kilograms) are inner-joined with typical street prices on
//! country, drug and year; `kilograms × price per kilogram` is summed per
//! country and year. Prices quoted per gram are scaled to kilograms.

use super::{Collector, ParsedValue, ParsedYear, column_index, parse_cell, parse_year, sheet_at};
use crate::error::Result;
use crate::extract::{Cell, RawSource, RawTable};
use crate::models::SeriesMeta;
use crate::registry::SourceDescriptor;
use std::collections::BTreeMap;
use tracing::debug;

const GRAMS_PER_KILOGRAM: f64 = 1000.0;

type JoinKey = (String, String, i32);

fn number_of(cell: &Cell) -> Option<f64> {
    parse_cell(cell).and_then(|p| p.value)
}

fn year_of(cell: &Cell) -> Option<i32> {
    match parse_year(cell) {
        ParsedYear::Year(y) => Some(y),
        _ => None,
    }
}

/// Price per kilogram keyed by (country, drug, year)
fn price_index(
    table: &RawTable,
    header_row: usize,
    descriptor: &SourceDescriptor,
) -> Result<BTreeMap<JoinKey, Vec<f64>>> {
    let header = table.header(header_row);
    let country_col = column_index(&header, descriptor, "Country/Territory")?;
    let drug_col = column_index(&header, descriptor, "Drug")?;
    let year_col = column_index(&header, descriptor, "Year")?;
    let price_col = column_index(&header, descriptor, "Typical_USD")?;
    let unit_col = column_index(&header, descriptor, "Unit")?;

    let mut prices: BTreeMap<JoinKey, Vec<f64>> = BTreeMap::new();
    for row in header_row + 1..table.height() {
        let (Some(country), Some(drug), Some(year), Some(price)) = (
            table.cell(row, country_col).as_label(),
            table.cell(row, drug_col).as_label(),
            year_of(table.cell(row, year_col)),
            number_of(table.cell(row, price_col)),
        ) else {
            continue;
        };

        let per_kilogram = match table.cell(row, unit_col).as_label() {
            Some(unit) if unit.eq_ignore_ascii_case("grams") => price * GRAMS_PER_KILOGRAM,
            _ => price,
        };
        prices.entry((country, drug, year)).or_default().push(per_kilogram);
    }

    Ok(prices)
}

pub(super) fn transform(
    raw: &RawSource,
    descriptor: &SourceDescriptor,
    header_row: usize,
    meta: &SeriesMeta,
    out: &mut Collector<'_>,
) -> Result<()> {
    let prices = price_index(&sheet_at(raw, descriptor, 0)?.table, header_row, descriptor)?;
    debug!("UNODC price index: {} (country, drug, year) keys", prices.len());

    let seizures = &sheet_at(raw, descriptor, 1)?.table;
    let header = seizures.header(header_row);
    let country_col = column_index(&header, descriptor, "Country")?;
    let drug_col = column_index(&header, descriptor, "DrugName")?;
    let year_col = column_index(&header, descriptor, "Reference year")?;
    let kilograms_col = column_index(&header, descriptor, "Kilograms")?;

    let mut totals: BTreeMap<(String, i32), f64> = BTreeMap::new();
    for row in header_row + 1..seizures.height() {
        let Some(country) = seizures.cell(row, country_col).as_label() else {
            let stats = out.stats_mut();
            stats.candidates += 1;
            stats.unresolved_countries += 1;
            continue;
        };

        let kilograms = seizures.cell(row, kilograms_col);
        if kilograms.is_blank() {
            // Not measured by mass
            out.filter();
            continue;
        }
        let Some(kilograms) = number_of(kilograms) else {
            let stats = out.stats_mut();
            stats.candidates += 1;
            stats.malformed_values += 1;
            continue;
        };
        let Some(year) = year_of(seizures.cell(row, year_col)) else {
            let stats = out.stats_mut();
            stats.candidates += 1;
            stats.malformed_years += 1;
            continue;
        };
        let drug = seizures.cell(row, drug_col).as_label().unwrap_or_default();

        let Some(matched) = prices.get(&(country.clone(), drug, year)) else {
            out.filter();
            continue;
        };

        *totals.entry((country, year)).or_insert(0.0) +=
            matched.iter().map(|price| kilograms * price).sum::<f64>();
    }
    debug!("UNODC: {} country-year totals", totals.len());

    for ((country, year), total) in totals {
        out.stats_mut().candidates += 1;
        let Some(code) = out.country_by_name(&Cell::Text(country)) else {
            out.stats_mut().unresolved_countries += 1;
            continue;
        };
        out.emit(
            meta,
            &code,
            Some(year),
            ParsedValue {
                value: Some(total),
                meta: None,
            },
        );
    }

    Ok(())
}
