//! ISORA survey sheets.
//!
//! Each sheet carries several indicators side by side. An indicator's
//! label sits in a merged cell on the header row; the years it covers are
//! on the row below, one per column of the merged block. Country names are
//! in the first column.

use super::{Collector, parse_year, require_sheet};
use crate::error::{NexusError, Result};
use crate::extract::RawSource;
use crate::models::SeriesMeta;
use crate::registry::{IsoraSheet, SourceDescriptor};
use tracing::debug;

pub(super) fn transform(
    raw: &RawSource,
    descriptor: &SourceDescriptor,
    sheets: &[IsoraSheet],
    out: &mut Collector<'_>,
) -> Result<()> {
    for layout in sheets {
        let sheet = require_sheet(raw, descriptor, &layout.name)?;
        let table = &sheet.table;

        // Layout rows are 1-based as printed in the workbook
        let header_row = layout.header_row.saturating_sub(1) as usize;
        let years_row = header_row + 1;
        let first_data_row = header_row + 2;
        let last_data_row = (layout.end_row.saturating_sub(1) as usize).min(table.height().saturating_sub(1));

        let blocks: Vec<_> = sheet
            .merged
            .iter()
            .filter(|m| m.start_row == header_row && m.end_col > m.start_col)
            .collect();

        if blocks.is_empty() {
            return Err(NexusError::malformed(
                &descriptor.name,
                format!(
                    "sheet '{}' has no merged indicator blocks on row {}",
                    layout.name, layout.header_row
                ),
            ));
        }
        debug!("Sheet '{}': {} indicator blocks", layout.name, blocks.len());

        for block in blocks {
            let Some(label) = table.cell(header_row, block.start_col).as_label() else {
                return Err(NexusError::malformed(
                    &descriptor.name,
                    format!(
                        "sheet '{}' has an unlabelled indicator block at column {}",
                        layout.name,
                        block.start_col + 1
                    ),
                ));
            };

            let meta = SeriesMeta::new(
                &descriptor.source,
                &descriptor.database,
                &layout.name,
                &label,
                &label,
            );
            let years: Vec<_> = (block.start_col..=block.end_col)
                .map(|col| (col, parse_year(table.cell(years_row, col))))
                .collect();

            for row in first_data_row..=last_data_row {
                let name = table.cell(row, 0);
                if name.is_blank() {
                    continue;
                }
                let country = out.country_by_name(name);
                for (col, year) in &years {
                    out.push(&meta, country.as_deref(), *year, table.cell(row, *col));
                }
            }
        }
    }

    Ok(())
}
