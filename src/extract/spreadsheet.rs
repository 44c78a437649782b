//! Spreadsheet extraction via calamine.

use super::table::{Cell, MergedRange, RawSheet, RawTable};
use crate::error::{NexusError, Result};
use calamine::{Data, Range, Reader, Xlsx, open_workbook, open_workbook_auto};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// How a sheet is addressed in a workbook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetRef {
    Name(String),
    Index(usize),
}

impl SheetRef {
    pub fn name(name: impl Into<String>) -> Self {
        SheetRef::Name(name.into())
    }
}

fn spreadsheet_error(source_name: &str, path: &Path, reason: impl ToString) -> NexusError {
    NexusError::Spreadsheet {
        source_name: source_name.to_string(),
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

pub(crate) fn ensure_exists(source_name: &str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(NexusError::SourceFileMissing {
            source_name: source_name.to_string(),
            path: path.to_path_buf(),
        })
    }
}

/// Copy a calamine range into a grid addressed from A1
fn range_to_table(range: &Range<Data>) -> RawTable {
    let Some((end_row, end_col)) = range.end() else {
        return RawTable::default();
    };

    let rows = (0..=end_row)
        .map(|row| {
            (0..=end_col)
                .map(|col| range.get_value((row, col)).map(Cell::from).unwrap_or_default())
                .collect()
        })
        .collect();

    RawTable::new(rows)
}

/// Read the requested sheets of any calamine-supported workbook
pub fn read_sheets(source_name: &str, path: &Path, sheets: &[SheetRef]) -> Result<Vec<RawSheet>> {
    ensure_exists(source_name, path)?;
    debug!("Opening workbook {} for '{}'", path.display(), source_name);

    let mut workbook =
        open_workbook_auto(path).map_err(|e| spreadsheet_error(source_name, path, e))?;
    let names = workbook.sheet_names();

    sheets
        .iter()
        .map(|sheet| {
            let (name, range) = match sheet {
                SheetRef::Name(name) => {
                    let range = workbook
                        .worksheet_range(name)
                        .map_err(|e| spreadsheet_error(source_name, path, format!("sheet '{}': {}", name, e)))?;
                    (name.clone(), range)
                }
                SheetRef::Index(index) => {
                    let name = names.get(*index).cloned().ok_or_else(|| {
                        spreadsheet_error(
                            source_name,
                            path,
                            format!("sheet index {} out of range ({} sheets)", index, names.len()),
                        )
                    })?;
                    let range = workbook
                        .worksheet_range_at(*index)
                        .ok_or_else(|| spreadsheet_error(source_name, path, format!("sheet index {} missing", index)))?
                        .map_err(|e| spreadsheet_error(source_name, path, e))?;
                    (name, range)
                }
            };

            Ok(RawSheet::new(name, range_to_table(&range)))
        })
        .collect()
}

/// Read named sheets of an `.xlsx` workbook together with their merged regions
pub fn read_sheets_with_merges(
    source_name: &str,
    path: &Path,
    sheet_names: &[String],
) -> Result<Vec<RawSheet>> {
    ensure_exists(source_name, path)?;
    debug!(
        "Opening xlsx workbook {} for '{}' with merged regions",
        path.display(),
        source_name
    );

    let mut workbook: Xlsx<BufReader<File>> =
        open_workbook(path).map_err(|e| spreadsheet_error(source_name, path, e))?;
    workbook
        .load_merged_regions()
        .map_err(|e| spreadsheet_error(source_name, path, e))?;

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        let merged: Vec<MergedRange> = workbook
            .merged_regions_by_sheet(name)
            .into_iter()
            .map(|(_, _, dims)| MergedRange {
                start_row: dims.start.0 as usize,
                start_col: dims.start.1 as usize,
                end_row: dims.end.0 as usize,
                end_col: dims.end.1 as usize,
            })
            .collect();

        let range = workbook
            .worksheet_range(name)
            .map_err(|e| spreadsheet_error(source_name, path, format!("sheet '{}': {}", name, e)))?;

        debug!("Sheet '{}': {} merged regions", name, merged.len());
        sheets.push(RawSheet::new(name.clone(), range_to_table(&range)).with_merged(merged));
    }

    Ok(sheets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{Format, Workbook};
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Workbook whose data sheet starts on row 2 under a merged indicator header
    fn write_workbook(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("survey.xlsx");
        let mut workbook = Workbook::new();

        let revenue = workbook.add_worksheet();
        revenue.set_name("Revenue").unwrap();
        revenue.write_string(1, 0, "Country").unwrap();
        revenue
            .merge_range(1, 1, 1, 2, "Tax revenue", &Format::new())
            .unwrap();
        revenue.write_number(2, 1, 2019).unwrap();
        revenue.write_number(2, 2, 2020).unwrap();
        revenue.write_string(3, 0, "Kenya").unwrap();
        revenue.write_number(3, 1, 15.2).unwrap();
        revenue.write_string(3, 2, "..").unwrap();

        let meta = workbook.add_worksheet();
        meta.set_name("Meta").unwrap();
        meta.write_string(0, 0, "Indicator Name").unwrap();
        meta.write_string(1, 0, "Tax revenue (% of GDP)").unwrap();

        workbook.save(&path).unwrap();
        path
    }

    #[test]
    fn test_merged_regions_share_the_grid_coordinates() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_workbook(&temp_dir);

        let sheets =
            read_sheets_with_merges("imf_isora", &path, &["Revenue".to_string()]).unwrap();
        assert_eq!(sheets.len(), 1);
        let sheet = &sheets[0];
        assert_eq!(sheet.name, "Revenue");

        // The leading blank row is kept, so row numbers match the workbook
        let table = &sheet.table;
        assert_eq!(table.height(), 4);
        assert_eq!(table.width(), 3);
        assert_eq!(table.cell(0, 0), &Cell::Empty);
        assert_eq!(table.cell(1, 0), &Cell::text("Country"));
        assert_eq!(table.cell(2, 2), &Cell::Number(2020.0));
        assert_eq!(table.cell(3, 1), &Cell::Number(15.2));
        assert_eq!(table.cell(3, 2), &Cell::text(".."));

        assert_eq!(
            sheet.merged,
            vec![MergedRange {
                start_row: 1,
                start_col: 1,
                end_row: 1,
                end_col: 2,
            }]
        );
        let block = sheet.merged[0];
        assert_eq!(
            table.cell(block.start_row, block.start_col),
            &Cell::text("Tax revenue")
        );
    }

    #[test]
    fn test_read_sheets_by_name_and_index() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_workbook(&temp_dir);

        let sheets = read_sheets(
            "wb_pefa",
            &path,
            &[SheetRef::name("Meta"), SheetRef::Index(0)],
        )
        .unwrap();

        let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Meta", "Revenue"]);
        assert_eq!(sheets[0].table.height(), 2);
        assert_eq!(sheets[0].table.cell(1, 0), &Cell::text("Tax revenue (% of GDP)"));
        assert_eq!(sheets[1].table.height(), 4);
        assert_eq!(sheets[1].table.cell(2, 1), &Cell::Number(2019.0));
        assert!(sheets.iter().all(|s| s.merged.is_empty()));
    }

    #[test]
    fn test_unknown_sheet_reports_spreadsheet_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_workbook(&temp_dir);

        let by_name = read_sheets("wb_pefa", &path, &[SheetRef::name("Data")]);
        assert!(matches!(by_name, Err(NexusError::Spreadsheet { .. })));

        let by_index = read_sheets("wb_pefa", &path, &[SheetRef::Index(5)]);
        match by_index.unwrap_err() {
            NexusError::Spreadsheet { reason, .. } => assert!(reason.contains("out of range")),
            other => panic!("Expected Spreadsheet, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_workbook_is_fatal_for_source() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("WB-PEFA.xlsx");

        let result = read_sheets("wb_pefa", &path, &[SheetRef::Index(0)]);
        match result.unwrap_err() {
            NexusError::SourceFileMissing { source_name, path: missing } => {
                assert_eq!(source_name, "wb_pefa");
                assert_eq!(missing, path);
            }
            other => panic!("Expected SourceFileMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_unreadable_workbook_reports_spreadsheet_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("IMF ISORA.xlsx");
        std::fs::write(&path, "not a zip archive").unwrap();

        let result = read_sheets_with_merges("imf_isora", &path, &["Sheet1".to_string()]);
        assert!(matches!(result, Err(NexusError::Spreadsheet { .. })));
    }
}
