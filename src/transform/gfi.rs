//! GFI trade mispricing tables: one sheet per indicator, countries by row,
//! years by column, with an unused leading column and a trailing average.

use super::{Collector, WideYears, melt_year_columns, require_sheet};
use crate::error::Result;
use crate::extract::RawSource;
use crate::models::SeriesMeta;
use crate::registry::{GfiTable, SourceDescriptor};

const AVERAGE_COLUMN: &str = "Average";

pub(super) fn transform(
    raw: &RawSource,
    descriptor: &SourceDescriptor,
    header_row: usize,
    tables: &[GfiTable],
    out: &mut Collector<'_>,
) -> Result<()> {
    let layout = WideYears {
        header_row,
        country_column: 1,
        first_value_column: 2,
        skip_labels: &[AVERAGE_COLUMN],
    };

    for table in tables {
        let sheet = require_sheet(raw, descriptor, &table.sheet)?;
        let meta = SeriesMeta::new(
            &descriptor.source,
            &descriptor.database,
            &table.sheet,
            &table.indicator_code,
            &table.indicator_label,
        );
        melt_year_columns(&sheet.table, layout, &meta, out);
    }

    Ok(())
}
