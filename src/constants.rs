//! Application constants for the nexus pipeline
//!
//! Fixed file names, indicator dictionaries, placeholder tokens and the
//! column layout of the unified table.

// =============================================================================
// Directory and File Names
// =============================================================================

/// Default directory holding the raw source files
pub const DEFAULT_RAW_DIR: &str = "data/raw";

/// Default directory receiving the Parquet outputs
pub const DEFAULT_PROCESSED_DIR: &str = "data/processed";

/// Default country classification reference file
pub const DEFAULT_CLASSIFICATION_FILE: &str = "data/raw/country_classifications.csv";

pub const PEFA_FILE: &str = "WB-PEFA.xlsx";
pub const TAXGAP_FILE: &str = "WB_TAX CPACITY AND GAP.csv";
pub const WDI_CSV_FILE: &str = "WDI_CSV/WDICSV.csv";
pub const WGI_FILE: &str = "wgidataset.xlsx";
pub const GFI_FILE: &str = "gfi trade mispricing.xlsx";
pub const USAID_FILE: &str = "USAID tax effort and buyancy.xlsx";
pub const FSI_FILE: &str = "tjn data.csv";
pub const UNODC_PRICES_FILE: &str = "unodc drug prices.xlsx";
pub const UNODC_SEIZURES_FILE: &str = "unodc drug seizures.xlsx";

// =============================================================================
// Output Artifacts
// =============================================================================

/// Name of the full unified table
pub const UNIFIED_OUTPUT_NAME: &str = "nexus";

/// Collection-filtered extracts: (output name, collection)
pub const SUBSET_OUTPUTS: &[(&str, &str)] = &[("pefa", "PEFA"), ("taxwb", "TAXGAP")];

// =============================================================================
// ISORA Workbooks
// =============================================================================

/// ISORA sheet layout: (sheet name, merged header row, last data row), 1-based rows.
///
/// Several sheet names carry a trailing space in the published workbooks.
pub type IsoraSheetLayout = (&'static str, u32, u32);

/// ISORA workbooks: (descriptor name, file name, sheets)
pub const ISORA_WORKBOOKS: &[(&str, &str, &[IsoraSheetLayout])] = &[
    (
        "imf_isora_resources_ict",
        "imf isora resources and ICT infrastructure.xlsx",
        &[
            ("Tax administration expenditures", 6, 172),
            ("Tax administration staff total ", 7, 173),
            ("Operational ICT solutions", 6, 172),
        ],
    ),
    (
        "imf_isora_staff_metrics",
        "imf isora staff metrics.xlsx",
        &[
            ("Staff strength levels", 6, 172),
            ("Staff academic qualifications", 6, 172),
            ("Staff age distribution", 6, 172),
            ("Staff length of service", 6, 172),
            ("Staff gender distribution", 7, 172),
        ],
    ),
    (
        "imf_isora_op_metrics_audit",
        "imf isora op metrics audit, criminal investigations, dispute resolution.xlsx",
        &[
            ("Audit and verification", 6, 172),
            ("Value of additional assessments", 6, 172),
            ("Value of additional assessm_0", 6, 172),
            ("Tax crime investigation", 6, 172),
            ("Dispute resolution review proce", 6, 172),
        ],
    ),
    (
        "imf_isora",
        "IMF ISORA.xlsx",
        &[
            ("Segmentation ratios LTO or prog", 5, 171),
            ("Registration of personal income", 5, 171),
            ("Percentage inactive taxpayers o", 5, 171),
            ("On-time filing rates by tax typ", 5, 171),
            ("Electronic filing rates by tax ", 5, 171),
            ("Proportion of returns by channe", 5, 171),
            ("Proportion of returns by ch_0", 5, 171),
            ("Proportion of returns by ch_1", 5, 171),
        ],
    ),
];

// =============================================================================
// World Bank
// =============================================================================

/// World Development Indicators pulled from the API (or the bulk CSV)
pub const WDI_INDICATOR_CODES: &[&str] = &[
    "FS.AST.DOMS.GD.ZS",
    "FB.BNK.CAPA.ZS",
    "FD.RES.LIQU.AS.ZS",
    "GC.TAX.TOTL.GD.ZS",
    "IQ.CPA.PUBS.XQ",
    "IQ.CPA.PADM.XQ",
    "FX.OWN.TOTL.YG.ZS",
    "FX.OWN.TOTL.OL.ZS",
    "CM.MKT.LCAP.CD",
    "NY.GDP.MKTP.CD",
    "DT.NFL.BOND.CD",
    "BN.RES.INCL.CD",
    "DT.DOD.DSTC.CD",
    "CC.EST",
];

/// World Bank Indicators API root
pub const WDI_API_BASE_URL: &str = "https://api.worldbank.org/v2";

/// WDI database id on the Indicators API; required for multi-indicator queries
pub const WDI_API_SOURCE_ID: u32 = 2;

pub const WDI_API_PAGE_SIZE: u32 = 20_000;

/// Worldwide Governance Indicators labels keyed by indicator code
pub const WGI_INDICATOR_LABELS: &[(&str, &str)] = &[
    ("va", "Voice and Accountability"),
    ("pv", "Political Stability and Absence of Violence/Terrorism"),
    ("ge", "Government Effectiveness"),
    ("rq", "Regulatory Quality"),
    ("rl", "Rule of Law"),
    ("cc", "Control of Corruption"),
];

/// PEFA assessment year span
pub const PEFA_FIRST_YEAR: i32 = 2005;
pub const PEFA_LAST_YEAR: i32 = 2021;

/// Measure columns of the tax capacity and gap export
pub const TAXGAP_MEASURE_COLUMNS: &[&str] =
    &["value", "Buoyancy", "Capacity", "Gap", "Tax Revenue Percent"];

// =============================================================================
// Other Providers
// =============================================================================

/// GFI trade mispricing tables: (sheet, indicator code, indicator label)
pub const GFI_TABLES: &[(&str, &str, &str)] = &[
    (
        "Table A",
        "GFI.TableA.gap_usd_adv",
        "The Sums of the Value Gaps Identified in Trade Between 134 Developing Countries and 36 Advanced Economies, 2009–2018, in USD Millions",
    ),
    (
        "Table C",
        "GFI.TableC.gap_pct_adv",
        "The Total Value Gaps Identified Between 134 Developing Countries and 36 Advanced Economies, 2009–2018, as a Percent of Total Trade",
    ),
    (
        "Table E",
        "GFI.TableE.gap_usd_all",
        "The Sums of the Value Gaps Identified in Trade Between 134 Developing Countries and all of their Global Trading Partners, 2009–2018 in USD Millions",
    ),
    (
        "Table G",
        "GFI.TableG.gap_pct_all",
        "The Total Value Gaps Identified in Trade Between 134 Developing Countries and all of their Trading Partners, 2009–2018 as a Percent of Total Trade",
    ),
];

/// Zero-based header row of the GFI sheets
pub const GFI_HEADER_ROW: usize = 4;

pub const UNODC_INDICATOR_CODE: &str = "UNODC.DPS.losses";
pub const UNODC_INDICATOR_LABEL: &str = "Monetary losses (in USD) to drug sales. Amount of drugs seized in kilograms multiplied by the drug price in kilograms. Excludes all seizures not measured in grams or kilograms.";

// =============================================================================
// Value Coercion
// =============================================================================

/// Tokens standing in for a missing numeric value
pub const MISSING_VALUE_TOKENS: &[&str] = &["", "..", "NA", "N/A", "N/D", "D", "-", "o", "n"];

/// Boolean answers recoded to numbers
pub const BOOLEAN_VALUE_TOKENS: &[(&str, f64)] = &[("Yes", 1.0), ("No", 0.0)];

// =============================================================================
// Country Resolution
// =============================================================================

/// Country names that do not appear under the same spelling in the
/// classification reference.
pub const COUNTRY_NAME_ALIASES: &[(&str, &str)] = &[
    ("Bahamas, The", "BHS"),
    ("Bolivia", "BOL"),
    ("Brunei", "BRN"),
    ("Brunei Darussalam", "BRN"),
    ("Cabo Verde", "CPV"),
    ("Cape Verde", "CPV"),
    ("Congo, Dem. Rep.", "COD"),
    ("Congo, Rep.", "COG"),
    ("Cook Islands", "COK"),
    ("Cote d'Ivoire", "CIV"),
    ("Curacao", "CUW"),
    ("Czech Republic", "CZE"),
    ("Egypt, Arab Rep.", "EGY"),
    ("Eswatini", "SWZ"),
    ("Gambia, The", "GMB"),
    ("Hong Kong SAR, China", "HKG"),
    ("Iran, Islamic Rep.", "IRN"),
    ("Korea, Dem. People's Rep.", "PRK"),
    ("Korea, Rep.", "KOR"),
    ("Kosovo", "XKX"),
    ("Kyrgyz Republic", "KGZ"),
    ("Lao PDR", "LAO"),
    ("Macao SAR, China", "MAC"),
    ("Macedonia, FYR", "MKD"),
    ("Micronesia, Fed. Sts.", "FSM"),
    ("Moldova", "MDA"),
    ("Montserrat", "MSR"),
    ("North Macedonia", "MKD"),
    ("Republika Srpska", "BIH"),
    ("Russia", "RUS"),
    ("Russian Federation", "RUS"),
    ("Sao Tome and Principe", "STP"),
    ("Slovak Republic", "SVK"),
    ("St. Kitts and Nevis", "KNA"),
    ("St. Lucia", "LCA"),
    ("St. Vincent and the Grenadines", "VCT"),
    ("Swaziland", "SWZ"),
    ("Syria", "SYR"),
    ("Syrian Arab Republic", "SYR"),
    ("Syrua", "SYR"),
    ("Taiwan", "TWN"),
    ("Tanzania", "TZA"),
    ("Timor-Leste", "TLS"),
    ("Turkey", "TUR"),
    ("Turkiye", "TUR"),
    ("United Kingdom", "GBR"),
    ("United States", "USA"),
    ("Venezuela, RB", "VEN"),
    ("Viet Nam", "VNM"),
    ("Vietnam", "VNM"),
    ("West Bank and Gaza", "PSE"),
    ("Yemen, Rep.", "YEM"),
];

// =============================================================================
// Unified Table Layout
// =============================================================================

pub mod columns {
    pub const COUNTRY_CODE: &str = "country_code";
    pub const YEAR: &str = "year";
    pub const VALUE: &str = "value";
    pub const SOURCE: &str = "source";
    pub const INDICATOR_CODE: &str = "indicator_code";
    pub const INDICATOR_LABEL: &str = "indicator_label";
    pub const DATABASE: &str = "database";
    pub const COLLECTION: &str = "collection";
    pub const VALUE_META: &str = "value_meta";

    /// Observation columns in output order
    pub const CANONICAL: &[&str] = &[
        COUNTRY_CODE,
        YEAR,
        VALUE,
        SOURCE,
        INDICATOR_CODE,
        INDICATOR_LABEL,
        DATABASE,
        COLLECTION,
        VALUE_META,
    ];
}

/// Key column of the classification reference (after snake-casing)
pub const CLASSIFICATION_KEY_COLUMN: &str = "iso3";

/// Column holding the country display name in the classification reference
pub const CLASSIFICATION_NAME_COLUMN: &str = "country_or_area";

/// Classification attributes carried onto every observation, in output order
pub const CLASSIFICATION_COLUMNS: &[&str] = &[
    "global_code",
    "global_name",
    "region_code",
    "region_name",
    "sub_region_code",
    "sub_region_name",
    "intermediate_region_code",
    "intermediate_region_name",
    "country_or_area",
    "m49_code",
    "iso_alpha2_code",
    "least_developed_countries_ldc",
    "land_locked_developing_countries_lldc",
    "small_island_developing_states_sids",
    "developed_developing_countries",
    "wb_region",
    "wb_income_group",
    "wb_lending_category",
    "oecd_member",
    "g20_member",
    "fragile_state",
    "imf_program",
    "eu_member",
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_classification_columns_are_unique() {
        let unique: HashSet<_> = CLASSIFICATION_COLUMNS.iter().collect();
        assert_eq!(unique.len(), CLASSIFICATION_COLUMNS.len());
        assert_eq!(CLASSIFICATION_COLUMNS.len(), 23);
    }

    #[test]
    fn test_canonical_and_classification_columns_disjoint() {
        for name in columns::CANONICAL {
            assert!(!CLASSIFICATION_COLUMNS.contains(name), "{name} duplicated");
        }
    }

    #[test]
    fn test_aliases_map_to_iso3() {
        for (name, code) in COUNTRY_NAME_ALIASES {
            assert_eq!(code.len(), 3, "bad alias target for {name}");
            assert!(code.chars().all(|c| c.is_ascii_uppercase()));
        }
    }
}
