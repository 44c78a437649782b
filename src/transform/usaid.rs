//! USAID Collecting Taxes Database: country-year rows, one column per
//! indicator. Indicator codes come from the bracketed token in each header.

use super::{Collector, column_index, parse_year, require_sheet};
use crate::classification::snake_case;
use crate::error::{NexusError, Result};
use crate::extract::RawSource;
use crate::models::SeriesMeta;
use crate::registry::SourceDescriptor;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

const CODE_PREFIX: &str = "USAID.CTD.";

static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").unwrap());

/// `USAID.CTD.<token>` from a header such as `Tax effort [tax_effort]`
pub(crate) fn indicator_code(label: &str) -> String {
    match BRACKETED.captures(label) {
        Some(captures) => format!("{}{}", CODE_PREFIX, &captures[1]),
        None => format!("{}{}", CODE_PREFIX, snake_case(label)),
    }
}

pub(super) fn transform(
    raw: &RawSource,
    descriptor: &SourceDescriptor,
    sheet: &str,
    indicator_columns: Range<usize>,
    out: &mut Collector<'_>,
) -> Result<()> {
    let table = &require_sheet(raw, descriptor, sheet)?.table;
    let header = table.header(0);

    let country = column_index(&header, descriptor, "country_name")?;
    let year = column_index(&header, descriptor, "year")?;

    let series: Vec<(usize, SeriesMeta)> = indicator_columns
        .filter(|col| *col < header.len() && !header[*col].is_empty())
        .map(|col| {
            let label = &header[col];
            (
                col,
                SeriesMeta::new(
                    &descriptor.source,
                    &descriptor.database,
                    &descriptor.database,
                    indicator_code(label),
                    label,
                ),
            )
        })
        .collect();
    if series.is_empty() {
        return Err(NexusError::malformed(
            &descriptor.name,
            format!("sheet '{}' has no indicator columns", sheet),
        ));
    }

    for row in 1..table.height() {
        let name = table.cell(row, country);
        if name.is_blank() {
            continue;
        }
        let code = out.country_by_name(name);
        let row_year = parse_year(table.cell(row, year));
        for (col, meta) in &series {
            out.push(meta, code.as_deref(), row_year, table.cell(row, *col));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_code_from_bracket() {
        assert_eq!(
            indicator_code("Tax effort (ratio) [tax_eff]"),
            "USAID.CTD.tax_eff"
        );
        assert_eq!(indicator_code("Tax buoyancy"), "USAID.CTD.tax_buoyancy");
    }
}
