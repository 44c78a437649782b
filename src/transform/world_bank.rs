//! World Bank sources: PEFA, tax capacity and gap, WDI and WGI

use super::{Collector, ParsedYear, column_index, parse_year, sheet_at};
use crate::classification::snake_case;
use crate::error::{NexusError, Result};
use crate::extract::{Cell, RawSource};
use crate::extract::wdi_api::WDI_API_COLUMNS;
use crate::models::SeriesMeta;
use crate::registry::SourceDescriptor;
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::debug;

const PEFA_COLLECTION: &str = "PEFA";
const TAXGAP_COLLECTION: &str = "TAXGAP";
const WDI_COLLECTION: &str = "WDI";
const WGI_COLLECTION: &str = "WGI";

/// PEFA: wide year columns, labels joined in from the metadata sheet
pub(super) fn transform_pefa(
    raw: &RawSource,
    descriptor: &SourceDescriptor,
    years: Range<i32>,
    out: &mut Collector<'_>,
) -> Result<()> {
    let data = &sheet_at(raw, descriptor, 0)?.table;
    let meta_sheet = &sheet_at(raw, descriptor, 1)?.table;

    let meta_header = meta_sheet.header(0);
    let meta_id = column_index(&meta_header, descriptor, "Indicator ID")?;
    let meta_name = column_index(&meta_header, descriptor, "Indicator Name")?;
    let names: BTreeMap<String, String> = meta_sheet
        .data_rows(0)
        .iter()
        .filter_map(|row| {
            let id = row.get(meta_id)?.as_label()?;
            let name = row.get(meta_name)?.as_label()?;
            Some((id, name))
        })
        .collect();

    let header = data.header(0);
    let iso3 = column_index(&header, descriptor, "Economy ISO3")?;
    let indicator_id = column_index(&header, descriptor, "Indicator ID")?;
    let indicator = column_index(&header, descriptor, "Indicator")?;

    let year_columns: Vec<(usize, i32)> = years
        .filter_map(|year| {
            let label = year.to_string();
            header.iter().position(|h| *h == label).map(|col| (col, year))
        })
        .collect();
    if year_columns.is_empty() {
        return Err(NexusError::malformed(
            &descriptor.name,
            "no assessment year columns found",
        ));
    }

    for row in 1..data.height() {
        let Some(code) = data.cell(row, indicator_id).as_label() else {
            continue;
        };
        let label = names
            .get(&code)
            .cloned()
            .or_else(|| data.cell(row, indicator).as_label())
            .unwrap_or_else(|| code.clone());
        let meta = SeriesMeta::new(
            &descriptor.source,
            &descriptor.database,
            PEFA_COLLECTION,
            code,
            label,
        );

        let country = out.country_by_code(data.cell(row, iso3));
        for (col, year) in &year_columns {
            out.push(
                &meta,
                country.as_deref(),
                ParsedYear::Year(*year),
                data.cell(row, *col),
            );
        }
    }

    Ok(())
}

/// Indicator code for one tax-gap measure column
fn taxgap_code(base: &str, measure: &str) -> String {
    if measure == "value" {
        base.to_string()
    } else {
        format!("{}.{}", base, snake_case(measure))
    }
}

/// Tax capacity and gap: long rows with several measure columns each
pub(super) fn transform_taxgap(
    raw: &RawSource,
    descriptor: &SourceDescriptor,
    measure_columns: &[String],
    out: &mut Collector<'_>,
) -> Result<()> {
    let table = &sheet_at(raw, descriptor, 0)?.table;
    let header = table.header(0);

    let year = column_index(&header, descriptor, "Year")?;
    let name = column_index(&header, descriptor, "indicator name")?;
    let unit = column_index(&header, descriptor, "indicator unit")?;
    let code = column_index(&header, descriptor, "indicator code")?;
    let iso3 = column_index(&header, descriptor, "iso3_code")?;
    let measures = measure_columns
        .iter()
        .map(|m| Ok((m.as_str(), column_index(&header, descriptor, m)?)))
        .collect::<Result<Vec<_>>>()?;

    let mut series: BTreeMap<(String, String, String, &str), SeriesMeta> = BTreeMap::new();

    for row in 1..table.height() {
        let Some(base_code) = table.cell(row, code).as_label() else {
            continue;
        };
        let indicator_name = table.cell(row, name).as_label().unwrap_or_default();
        let indicator_unit = table.cell(row, unit).as_label().unwrap_or_default();
        let country = out.country_by_code(table.cell(row, iso3));
        let row_year = parse_year(table.cell(row, year));

        for &(measure, col) in &measures {
            let meta = series
                .entry((base_code.clone(), indicator_name.clone(), indicator_unit.clone(), measure))
                .or_insert_with(|| {
                    let label = [indicator_name.as_str(), indicator_unit.as_str(), measure]
                        .into_iter()
                        .filter(|part| !part.is_empty())
                        .collect::<Vec<_>>()
                        .join(" - ");
                    SeriesMeta::new(
                        &descriptor.source,
                        &descriptor.database,
                        TAXGAP_COLLECTION,
                        taxgap_code(&base_code, measure),
                        label,
                    )
                });
            let meta = meta.clone();
            out.push(&meta, country.as_deref(), row_year, table.cell(row, col));
        }
    }

    Ok(())
}

/// WDI from either the API sheet (long) or the bulk CSV (wide years)
pub(super) fn transform_wdi(
    raw: &RawSource,
    descriptor: &SourceDescriptor,
    out: &mut Collector<'_>,
) -> Result<()> {
    let table = &sheet_at(raw, descriptor, 0)?.table;
    let header = table.header(0);
    out.drop_missing_values(true);

    let mut series: BTreeMap<String, SeriesMeta> = BTreeMap::new();
    let mut meta_for = |code: String, label: Option<String>| {
        series
            .entry(code.clone())
            .or_insert_with(|| {
                SeriesMeta::new(
                    &descriptor.source,
                    &descriptor.database,
                    WDI_COLLECTION,
                    &code,
                    label.unwrap_or_else(|| code.clone()),
                )
            })
            .clone()
    };

    if header.iter().any(|h| h == WDI_API_COLUMNS[0]) {
        debug!("WDI sheet has the API layout");
        let iso3 = column_index(&header, descriptor, "countryiso3code")?;
        let code = column_index(&header, descriptor, "indicator.id")?;
        let label = column_index(&header, descriptor, "indicator.value")?;
        let date = column_index(&header, descriptor, "date")?;
        let value = column_index(&header, descriptor, "value")?;

        for row in 1..table.height() {
            let Some(indicator) = table.cell(row, code).as_label() else {
                continue;
            };
            let meta = meta_for(indicator, table.cell(row, label).as_label());
            let country = out.country_by_code(table.cell(row, iso3));
            out.push(
                &meta,
                country.as_deref(),
                parse_year(table.cell(row, date)),
                table.cell(row, value),
            );
        }
    } else {
        debug!("WDI sheet has the bulk CSV layout");
        let iso3 = column_index(&header, descriptor, "Country Code")?;
        let code = column_index(&header, descriptor, "Indicator Code")?;
        let label = column_index(&header, descriptor, "Indicator Name")?;
        let year_columns: Vec<(usize, ParsedYear)> = header
            .iter()
            .enumerate()
            .filter(|(_, h)| h.starts_with('1') || h.starts_with('2'))
            .map(|(col, h)| (col, parse_year(&Cell::text(h.as_str()))))
            .collect();

        for row in 1..table.height() {
            let Some(indicator) = table.cell(row, code).as_label() else {
                continue;
            };
            let meta = meta_for(indicator, table.cell(row, label).as_label());
            let country = out.country_by_code(table.cell(row, iso3));
            for (col, year) in &year_columns {
                out.push(&meta, country.as_deref(), *year, table.cell(row, *col));
            }
        }
    }

    Ok(())
}

/// WGI: long rows keyed by a short indicator code
pub(super) fn transform_wgi(
    raw: &RawSource,
    descriptor: &SourceDescriptor,
    labels: &[(String, String)],
    out: &mut Collector<'_>,
) -> Result<()> {
    let table = &sheet_at(raw, descriptor, 0)?.table;
    let header = table.header(0);

    let iso3 = column_index(&header, descriptor, "code")?;
    let year = column_index(&header, descriptor, "year")?;
    let indicator = column_index(&header, descriptor, "indicator")?;
    let estimate = column_index(&header, descriptor, "estimate")?;

    let mut series: BTreeMap<String, SeriesMeta> = BTreeMap::new();

    for row in 1..table.height() {
        let Some(code) = table.cell(row, indicator).as_label() else {
            continue;
        };
        let meta = series
            .entry(code.clone())
            .or_insert_with(|| {
                let label = labels
                    .iter()
                    .find(|(k, _)| *k == code)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| code.clone());
                SeriesMeta::new(
                    &descriptor.source,
                    &descriptor.database,
                    WGI_COLLECTION,
                    &code,
                    label,
                )
            })
            .clone();

        let country = out.country_by_code(table.cell(row, iso3));
        out.push(
            &meta,
            country.as_deref(),
            parse_year(table.cell(row, year)),
            table.cell(row, estimate),
        );
    }

    Ok(())
}
