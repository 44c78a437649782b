//! Sources with years or indicators spread across columns

use super::{builtin, descriptor, merged, sheet, source, test_coder};
use crate::error::NexusError;
use crate::extract::RawTable;
use crate::models::SeriesMeta;
use crate::registry::{GfiTable, IsoraSheet, SourceLayout};
use crate::transform::{Collector, WideYears, melt_year_columns, transform};

#[test]
fn test_kenya_wide_row_melts_into_two_observations() {
    let table = RawTable::from_strings(vec![vec!["Country", "2019", "2020"], vec!["Kenya", "5.1", ".."]]);
    let coder = test_coder();
    let mut out = Collector::new(&coder);
    let meta = SeriesMeta::new("GFI", "gfi trade mispricing.xlsx", "Table A", "GFI.A", "Gap");

    melt_year_columns(
        &table,
        WideYears {
            header_row: 0,
            country_column: 0,
            first_value_column: 1,
            skip_labels: &[],
        },
        &meta,
        &mut out,
    );
    let output = out.finish();

    assert_eq!(output.observations.len(), 2);
    let first = &output.observations[0];
    let second = &output.observations[1];
    assert_eq!(
        (first.country_code.as_str(), first.year, first.value),
        ("KEN", Some(2019), Some(5.1))
    );
    assert_eq!(
        (second.country_code.as_str(), second.year, second.value),
        ("KEN", Some(2020), None)
    );
    assert_eq!(second.value_meta.as_deref(), Some(".."));
    assert_eq!(first.indicator_code, second.indicator_code);
    assert_eq!(first.source, second.source);
    assert_eq!(output.stats.excluded(), 0);
}

#[test]
fn test_gfi_skips_average_and_resolves_misspelling() {
    let gfi = descriptor(
        "gfi",
        SourceLayout::GfiWorkbook {
            file: "gfi.xlsx".to_string(),
            header_row: 4,
            tables: vec![GfiTable {
                sheet: "Table A".to_string(),
                indicator_code: "GFI.TableA".to_string(),
                indicator_label: "Value gaps".to_string(),
            }],
        },
    );
    let raw = source(
        &gfi,
        vec![sheet(
            "Table A",
            vec![
                vec!["Table A"],
                vec![],
                vec![],
                vec![],
                vec!["", "", "2009", "2010", "Average"],
                vec!["1", "Syrua", "10", "..", "5"],
                vec!["", "", "", "", ""],
                vec!["3", "Atlantis", "1", "2", "1.5"],
            ],
        )],
    );

    let output = transform(&raw, &gfi, &test_coder()).unwrap();

    assert_eq!(output.observations.len(), 2);
    assert!(output.observations.iter().all(|o| o.country_code == "SYR"));
    assert!(output.observations.iter().all(|o| o.collection == "Table A"));
    assert_eq!(output.observations[1].value, None);
    assert_eq!(output.stats.unresolved_countries, 2);
    assert!(output.stats.unresolved_labels.contains("Atlantis"));
}

#[test]
fn test_isora_merged_blocks() {
    let isora = descriptor(
        "isora",
        SourceLayout::IsoraWorkbook {
            file: "isora.xlsx".to_string(),
            sheets: vec![IsoraSheet {
                name: "Staff".to_string(),
                header_row: 2,
                end_row: 5,
            }],
        },
    );
    let staff = sheet(
        "Staff",
        vec![
            vec!["ISORA 2020"],
            vec!["Country", "Staff total", "", "Has offices", ""],
            vec!["", "2018", "2019", "2018", "2019"],
            vec!["Kenya", "100", "110", "Yes", "No"],
            vec!["Chile", "..", "200", "N/A", "Yes"],
            vec!["Total", "1", "1", "1", "1"],
        ],
    )
    .with_merged(vec![merged(1, 3, 1, 4), merged(0, 0, 0, 4), merged(1, 1, 1, 2)]);
    let raw = source(&isora, vec![staff]);

    let output = transform(&raw, &isora, &test_coder()).unwrap();
    let rows: Vec<_> = output
        .observations
        .iter()
        .map(|o| (o.indicator_code.as_str(), o.country_code.as_str(), o.year, o.value))
        .collect();

    assert_eq!(
        rows,
        vec![
            ("Staff total", "KEN", Some(2018), Some(100.0)),
            ("Staff total", "KEN", Some(2019), Some(110.0)),
            ("Staff total", "CHL", Some(2018), None),
            ("Staff total", "CHL", Some(2019), Some(200.0)),
            ("Has offices", "KEN", Some(2018), Some(1.0)),
            ("Has offices", "KEN", Some(2019), Some(0.0)),
            ("Has offices", "CHL", Some(2018), None),
            ("Has offices", "CHL", Some(2019), Some(1.0)),
        ]
    );
    let first = &output.observations[0];
    assert_eq!(first.collection, "Staff");
    assert_eq!(first.indicator_label, "Staff total");
    assert_eq!(first.database, "test.xlsx");
    assert_eq!(output.observations[6].value_meta.as_deref(), Some("N/A"));
}

#[test]
fn test_isora_sheet_without_blocks_is_malformed() {
    let isora = descriptor(
        "isora",
        SourceLayout::IsoraWorkbook {
            file: "isora.xlsx".to_string(),
            sheets: vec![IsoraSheet {
                name: "Staff".to_string(),
                header_row: 2,
                end_row: 5,
            }],
        },
    );
    let raw = source(&isora, vec![sheet("Staff", vec![vec!["Country"]])]);

    let result = transform(&raw, &isora, &test_coder());
    assert!(matches!(result, Err(NexusError::MalformedSource { .. })));
}

#[test]
fn test_pefa_labels_from_metadata_sheet() {
    let pefa = builtin("wb_pefa");
    let raw = source(
        &pefa,
        vec![
            sheet(
                "Data",
                vec![
                    vec!["Economy ISO3", "Economy Name", "Indicator ID", "Indicator", "Attribute 1", "2005", "2016"],
                    vec!["KEN", "Kenya", "PI-1", "Aggregate expenditure", "x", "3", "4"],
                    vec!["ken", "Kenya", "PI-2", "Composition", "", "", "2.5"],
                ],
            ),
            sheet(
                "Meta",
                vec![
                    vec!["Indicator ID", "Indicator Name"],
                    vec!["PI-1", "PI-1 Aggregate expenditure out-turn"],
                ],
            ),
        ],
    );

    let output = transform(&raw, &pefa, &test_coder()).unwrap();

    assert_eq!(output.observations.len(), 3);
    assert_eq!(output.stats.empty_values, 1);
    let pi1 = &output.observations[0];
    assert_eq!(pi1.indicator_label, "PI-1 Aggregate expenditure out-turn");
    assert_eq!(pi1.collection, "PEFA");
    assert_eq!(pi1.database, "WB-PEFA.xlsx");
    let pi2 = &output.observations[2];
    assert_eq!(pi2.indicator_label, "Composition");
    assert_eq!(pi2.country_code, "KEN");
    assert_eq!((pi2.year, pi2.value), (Some(2016), Some(2.5)));
}

#[test]
fn test_pefa_missing_column_is_malformed() {
    let pefa = builtin("wb_pefa");
    let raw = source(
        &pefa,
        vec![
            sheet("Data", vec![vec!["Country", "2005"]]),
            sheet("Meta", vec![vec!["Indicator ID", "Indicator Name"]]),
        ],
    );

    let err = transform(&raw, &pefa, &test_coder()).unwrap_err();
    assert!(err.to_string().contains("Economy ISO3"));
}

#[test]
fn test_fsi_years_from_headers() {
    let fsi = builtin("fsi");
    let raw = source(
        &fsi,
        vec![sheet(
            "tjn data.csv",
            vec![
                vec!["iso3", "fsi2020", "ss_22", "rank"],
                vec!["KEN", "50.5", "..", "3"],
                vec!["", "1", "1", "1"],
                vec!["K1N", "1", "2", "3"],
            ],
        )],
    );

    let output = transform(&raw, &fsi, &test_coder()).unwrap();

    assert_eq!(output.observations.len(), 2);
    let fsi2020 = &output.observations[0];
    assert_eq!(fsi2020.indicator_code, "fsi");
    assert_eq!(fsi2020.indicator_label, "fsi2020");
    assert_eq!((fsi2020.year, fsi2020.value), (Some(2020), Some(50.5)));
    let ss = &output.observations[1];
    assert_eq!((ss.year, ss.value), (Some(2022), None));
    assert_eq!(output.stats.malformed_years, 1);
    assert_eq!(output.stats.unresolved_countries, 3);
}

#[test]
fn test_wdi_bulk_csv_drops_missing_values() {
    let wdi = builtin("wb_wdi");
    let raw = source(
        &wdi,
        vec![sheet(
            "WDICSV.csv",
            vec![
                vec!["Country Name", "Country Code", "Indicator Name", "Indicator Code", "2019", "2020"],
                vec!["Kenya", "KEN", "GDP (current US$)", "NY.GDP.MKTP.CD", "100", ""],
                vec!["Kosovo", "XKX", "GDP (current US$)", "NY.GDP.MKTP.CD", "..", "7"],
            ],
        )],
    );

    let output = transform(&raw, &wdi, &test_coder()).unwrap();
    let rows: Vec<_> = output
        .observations
        .iter()
        .map(|o| (o.country_code.as_str(), o.year, o.value))
        .collect();

    assert_eq!(rows, vec![("KEN", Some(2019), Some(100.0)), ("XKX", Some(2020), Some(7.0))]);
    assert_eq!(output.stats.filtered, 1);
    assert_eq!(output.stats.empty_values, 1);
    assert_eq!(output.observations[0].indicator_label, "GDP (current US$)");
    assert_eq!(output.observations[0].collection, "WDI");
}

#[test]
fn test_usaid_codes_and_blank_years() {
    let usaid = builtin("usaid");
    let raw = source(
        &usaid,
        vec![sheet(
            "Data",
            vec![
                vec!["country_id", "country_name", "year", "Tax effort [tax_eff]", "Buoyancy [buoy]"],
                vec!["404", "Kenya", "2015", "0.8", "1.1"],
                vec!["152", "Chile", "", "0.9", "N/D"],
            ],
        )],
    );

    let output = transform(&raw, &usaid, &test_coder()).unwrap();

    assert_eq!(output.observations.len(), 4);
    assert_eq!(output.observations[0].indicator_code, "USAID.CTD.tax_eff");
    assert_eq!(output.observations[0].indicator_label, "Tax effort [tax_eff]");
    assert_eq!(output.observations[0].collection, "Collecting Taxes Database (CTD)");
    let chile_buoyancy = &output.observations[3];
    assert_eq!(chile_buoyancy.country_code, "CHL");
    assert_eq!(chile_buoyancy.year, None);
    assert_eq!(chile_buoyancy.value, None);
    assert_eq!(chile_buoyancy.value_meta.as_deref(), Some("N/D"));
}
