//! Per-source extraction into untyped raw tables
//!
//! Each [`SourceLayout`] has exactly one read path. Extraction never
//! interprets cell values; a missing or unreadable input aborts the source
//! with an error naming it.

use crate::config::{NexusConfig, WdiOrigin};
use crate::error::Result;
use crate::registry::{SourceDescriptor, SourceLayout};
use tracing::info;

pub mod csv_file;
pub mod spreadsheet;
pub mod table;
pub mod wdi_api;

pub use csv_file::{read_csv, read_csv_filtered};
pub use spreadsheet::{SheetRef, read_sheets, read_sheets_with_merges};
pub use table::{Cell, MergedRange, RawSheet, RawSource, RawTable};
pub use wdi_api::WdiClient;

/// Column of the WDI bulk CSV used to select indicators
pub const WDI_CSV_KEY_COLUMN: &str = "Indicator Code";

/// Fail fast if any raw file a descriptor reads is absent
pub fn check_inputs(descriptor: &SourceDescriptor, config: &NexusConfig) -> Result<()> {
    let mut paths: Vec<_> = descriptor
        .files()
        .into_iter()
        .map(|file| config.raw_path(file))
        .collect();
    if let (SourceLayout::WdiIndicators { .. }, WdiOrigin::Csv { file }) =
        (&descriptor.layout, &config.wdi.origin)
    {
        paths.push(config.raw_path(file));
    }

    for path in &paths {
        spreadsheet::ensure_exists(&descriptor.name, path)?;
    }
    Ok(())
}

/// Read every raw table a descriptor declares
pub async fn extract(
    descriptor: &SourceDescriptor,
    config: &NexusConfig,
    client: &WdiClient,
) -> Result<RawSource> {
    let name = descriptor.name.as_str();

    let sheets = match &descriptor.layout {
        SourceLayout::IsoraWorkbook { file, sheets } => {
            let names: Vec<String> = sheets.iter().map(|s| s.name.clone()).collect();
            read_sheets_with_merges(name, &config.raw_path(file), &names)?
        }
        SourceLayout::PefaWorkbook {
            file,
            data_sheet,
            meta_sheet,
            ..
        } => read_sheets(
            name,
            &config.raw_path(file),
            &[SheetRef::Index(*data_sheet), SheetRef::Index(*meta_sheet)],
        )?,
        SourceLayout::TaxGapCsv { file, .. } | SourceLayout::FsiCsv { file, .. } => {
            vec![read_csv(name, &config.raw_path(file))?]
        }
        SourceLayout::WdiIndicators { indicator_codes } => match &config.wdi.origin {
            WdiOrigin::Api => vec![client.fetch(name, indicator_codes).await?],
            WdiOrigin::Csv { file } => vec![read_csv_filtered(
                name,
                &config.raw_path(file),
                WDI_CSV_KEY_COLUMN,
                indicator_codes,
            )?],
        },
        SourceLayout::WgiWorkbook { file, .. } => {
            read_sheets(name, &config.raw_path(file), &[SheetRef::Index(0)])?
        }
        SourceLayout::GfiWorkbook { file, tables, .. } => {
            let refs: Vec<SheetRef> = tables.iter().map(|t| SheetRef::name(&t.sheet)).collect();
            read_sheets(name, &config.raw_path(file), &refs)?
        }
        SourceLayout::UsaidWorkbook { file, sheet, .. } => {
            read_sheets(name, &config.raw_path(file), &[SheetRef::name(sheet)])?
        }
        SourceLayout::UnodcWorkbooks {
            prices_file,
            prices_sheet,
            seizures_file,
            seizures_sheet,
            ..
        } => {
            let mut sheets =
                read_sheets(name, &config.raw_path(prices_file), &[SheetRef::name(prices_sheet)])?;
            sheets.extend(read_sheets(
                name,
                &config.raw_path(seizures_file),
                &[SheetRef::name(seizures_sheet)],
            )?);
            sheets
        }
    };

    let rows: usize = sheets.iter().map(|s| s.table.height()).sum();
    info!(
        "Extracted '{}': {} sheet(s), {} raw rows",
        name,
        sheets.len(),
        rows
    );

    Ok(RawSource::new(name, sheets))
}
