//! Source registry: typed, immutable descriptors for every dataset.
//!
//! Each descriptor names the files a source is read from, how its sheets
//! and columns are laid out, and which labels its indicators carry. The
//! extractors and transformers dispatch on [`SourceLayout`]; adding a
//! source with an existing layout is a one-entry change here.

use crate::constants::{
    FSI_FILE, GFI_FILE, GFI_HEADER_ROW, GFI_TABLES, ISORA_WORKBOOKS, PEFA_FILE, PEFA_FIRST_YEAR,
    PEFA_LAST_YEAR, TAXGAP_FILE, TAXGAP_MEASURE_COLUMNS, UNODC_INDICATOR_CODE,
    UNODC_INDICATOR_LABEL, UNODC_PRICES_FILE, UNODC_SEIZURES_FILE, USAID_FILE,
    WDI_INDICATOR_CODES, WGI_FILE, WGI_INDICATOR_LABELS,
};
use crate::error::{NexusError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Layout of one ISORA sheet (1-based rows, as printed in the workbook)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsoraSheet {
    pub name: String,
    /// Row carrying the merged indicator labels; years are on the next row
    pub header_row: u32,
    /// Last data row
    pub end_row: u32,
}

/// One GFI table sheet and the indicator it carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GfiTable {
    pub sheet: String,
    pub indicator_code: String,
    pub indicator_label: String,
}

/// File and sheet layout plus harmonization rules for one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceLayout {
    /// Workbook of sheets with merged indicator blocks over year columns
    IsoraWorkbook {
        file: String,
        sheets: Vec<IsoraSheet>,
    },
    /// Wide data sheet (one column per year) plus an indicator metadata sheet
    PefaWorkbook {
        file: String,
        data_sheet: usize,
        meta_sheet: usize,
        years: Range<i32>,
    },
    /// Long CSV with several measure columns per row
    TaxGapCsv {
        file: String,
        measure_columns: Vec<String>,
    },
    /// World Development Indicators, from the API or the bulk CSV
    WdiIndicators { indicator_codes: Vec<String> },
    /// Long governance sheet with short indicator codes
    WgiWorkbook {
        file: String,
        labels: Vec<(String, String)>,
    },
    /// One sheet per indicator, countries by row and years by column
    GfiWorkbook {
        file: String,
        header_row: usize,
        tables: Vec<GfiTable>,
    },
    /// Country-year rows with one column per indicator
    UsaidWorkbook {
        file: String,
        sheet: String,
        indicator_columns: Range<usize>,
    },
    /// Country rows with one column per indicator-year
    FsiCsv {
        file: String,
        indicator_columns: Range<usize>,
    },
    /// Drug prices joined with seizures
    UnodcWorkbooks {
        prices_file: String,
        prices_sheet: String,
        seizures_file: String,
        seizures_sheet: String,
        header_row: usize,
        indicator_code: String,
        indicator_label: String,
    },
}

/// Static description of one dataset source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Unique registry key
    pub name: String,
    /// Provider label written to the `source` column
    pub source: String,
    /// Database label written to the `database` column
    pub database: String,
    pub layout: SourceLayout,
}

impl SourceDescriptor {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        database: impl Into<String>,
        layout: SourceLayout,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            database: database.into(),
            layout,
        }
    }

    /// Raw files this descriptor reads, relative to the raw data directory
    pub fn files(&self) -> Vec<&str> {
        match &self.layout {
            SourceLayout::IsoraWorkbook { file, .. }
            | SourceLayout::PefaWorkbook { file, .. }
            | SourceLayout::TaxGapCsv { file, .. }
            | SourceLayout::WgiWorkbook { file, .. }
            | SourceLayout::GfiWorkbook { file, .. }
            | SourceLayout::UsaidWorkbook { file, .. }
            | SourceLayout::FsiCsv { file, .. } => vec![file.as_str()],
            SourceLayout::UnodcWorkbooks {
                prices_file,
                seizures_file,
                ..
            } => vec![prices_file.as_str(), seizures_file.as_str()],
            SourceLayout::WdiIndicators { .. } => Vec::new(),
        }
    }
}

/// Ordered collection of source descriptors
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    descriptors: Vec<SourceDescriptor>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new(builtin_descriptors())
    }
}

impl SourceRegistry {
    pub fn new(descriptors: Vec<SourceDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn descriptors(&self) -> &[SourceDescriptor] {
        &self.descriptors
    }

    pub fn lookup(&self, name: &str) -> Option<&SourceDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Keep only the named descriptors, preserving registry order
    pub fn retain(self, names: &[String]) -> Result<Self> {
        if let Some(unknown) = names.iter().find(|n| self.lookup(n).is_none()) {
            return Err(NexusError::configuration(format!(
                "Unknown source '{}'. Known sources: {}",
                unknown,
                self.descriptors
                    .iter()
                    .map(|d| d.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        Ok(Self {
            descriptors: self
                .descriptors
                .into_iter()
                .filter(|d| names.contains(&d.name))
                .collect(),
        })
    }
}

fn owned_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn builtin_descriptors() -> Vec<SourceDescriptor> {
    let mut descriptors: Vec<SourceDescriptor> = ISORA_WORKBOOKS
        .iter()
        .map(|(name, file, sheets)| {
            SourceDescriptor::new(
                *name,
                "ISORA",
                *file,
                SourceLayout::IsoraWorkbook {
                    file: file.to_string(),
                    sheets: sheets
                        .iter()
                        .map(|(sheet, header_row, end_row)| IsoraSheet {
                            name: sheet.to_string(),
                            header_row: *header_row,
                            end_row: *end_row,
                        })
                        .collect(),
                },
            )
        })
        .collect();

    descriptors.push(SourceDescriptor::new(
        "wb_pefa",
        "World Bank",
        PEFA_FILE,
        SourceLayout::PefaWorkbook {
            file: PEFA_FILE.to_string(),
            data_sheet: 0,
            meta_sheet: 1,
            years: PEFA_FIRST_YEAR..PEFA_LAST_YEAR + 1,
        },
    ));

    descriptors.push(SourceDescriptor::new(
        "wb_taxgap",
        "World Bank",
        TAXGAP_FILE,
        SourceLayout::TaxGapCsv {
            file: TAXGAP_FILE.to_string(),
            measure_columns: TAXGAP_MEASURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
        },
    ));

    descriptors.push(SourceDescriptor::new(
        "wb_wdi",
        "World Bank",
        "WDI",
        SourceLayout::WdiIndicators {
            indicator_codes: WDI_INDICATOR_CODES.iter().map(|s| s.to_string()).collect(),
        },
    ));

    descriptors.push(SourceDescriptor::new(
        "wb_wgi",
        "World Bank",
        WGI_FILE,
        SourceLayout::WgiWorkbook {
            file: WGI_FILE.to_string(),
            labels: owned_pairs(WGI_INDICATOR_LABELS),
        },
    ));

    descriptors.push(SourceDescriptor::new(
        "gfi",
        "GFI",
        GFI_FILE,
        SourceLayout::GfiWorkbook {
            file: GFI_FILE.to_string(),
            header_row: GFI_HEADER_ROW,
            tables: GFI_TABLES
                .iter()
                .map(|(sheet, code, label)| GfiTable {
                    sheet: sheet.to_string(),
                    indicator_code: code.to_string(),
                    indicator_label: label.to_string(),
                })
                .collect(),
        },
    ));

    descriptors.push(SourceDescriptor::new(
        "usaid",
        "USAID",
        "Collecting Taxes Database (CTD)",
        SourceLayout::UsaidWorkbook {
            file: USAID_FILE.to_string(),
            sheet: "Data".to_string(),
            indicator_columns: 3..23,
        },
    ));

    descriptors.push(SourceDescriptor::new(
        "fsi",
        "TJN",
        "Financial Secrecy Index (FSI)",
        SourceLayout::FsiCsv {
            file: FSI_FILE.to_string(),
            indicator_columns: 1..19,
        },
    ));

    descriptors.push(SourceDescriptor::new(
        "unodc",
        "UNODC",
        "Drug prices & seizures",
        SourceLayout::UnodcWorkbooks {
            prices_file: UNODC_PRICES_FILE.to_string(),
            prices_sheet: "Prices in USD".to_string(),
            seizures_file: UNODC_SEIZURES_FILE.to_string(),
            seizures_sheet: "Export".to_string(),
            header_row: 1,
            indicator_code: UNODC_INDICATOR_CODE.to_string(),
            indicator_label: UNODC_INDICATOR_LABEL.to_string(),
        },
    ));

    descriptors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_registry_order_and_names() {
        let registry = SourceRegistry::default();
        let names: Vec<_> = registry.descriptors().iter().map(|d| d.name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "imf_isora_resources_ict",
                "imf_isora_staff_metrics",
                "imf_isora_op_metrics_audit",
                "imf_isora",
                "wb_pefa",
                "wb_taxgap",
                "wb_wdi",
                "wb_wgi",
                "gfi",
                "usaid",
                "fsi",
                "unodc",
            ]
        );

        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_lookup() {
        let registry = SourceRegistry::default();
        let pefa = registry.lookup("wb_pefa").unwrap();
        assert_eq!(pefa.source, "World Bank");
        assert_eq!(pefa.files(), vec!["WB-PEFA.xlsx"]);

        match &pefa.layout {
            SourceLayout::PefaWorkbook { years, .. } => {
                assert_eq!(years.start, 2005);
                assert_eq!(years.end, 2022);
            }
            other => panic!("unexpected layout {other:?}"),
        }

        assert!(registry.lookup("does_not_exist").is_none());
    }

    #[test]
    fn test_isora_sheet_names_keep_trailing_space() {
        let registry = SourceRegistry::default();
        let isora = registry.lookup("imf_isora_resources_ict").unwrap();
        match &isora.layout {
            SourceLayout::IsoraWorkbook { sheets, .. } => {
                assert!(sheets.iter().any(|s| s.name == "Tax administration staff total "));
                assert_eq!(sheets[1].header_row, 7);
                assert_eq!(sheets[1].end_row, 173);
            }
            other => panic!("unexpected layout {other:?}"),
        }
    }

    #[test]
    fn test_retain_subset_preserves_order() {
        let registry = SourceRegistry::default()
            .retain(&["fsi".to_string(), "wb_taxgap".to_string()])
            .unwrap();
        let names: Vec<_> = registry.descriptors().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["wb_taxgap", "fsi"]);
    }

    #[test]
    fn test_retain_unknown_source_is_configuration_error() {
        let result = SourceRegistry::default().retain(&["imf".to_string()]);
        assert!(matches!(result, Err(NexusError::Configuration { .. })));
    }

    #[test]
    fn test_unodc_reads_two_files() {
        let registry = SourceRegistry::default();
        let unodc = registry.lookup("unodc").unwrap();
        assert_eq!(
            unodc.files(),
            vec!["unodc drug prices.xlsx", "unodc drug seizures.xlsx"]
        );
        assert!(registry.lookup("wb_wdi").unwrap().files().is_empty());
    }
}
