//! Country classification reference and the left join onto observations
//!
//! The reference CSV is loaded once into an immutable table keyed by ISO3.
//! Records are shared through `Arc`, so enriching millions of rows never
//! copies attribute strings.

use crate::constants::{CLASSIFICATION_COLUMNS, CLASSIFICATION_KEY_COLUMN, CLASSIFICATION_NAME_COLUMN};
use crate::error::{NexusError, Result};
use crate::models::{EnrichedObservation, Observation};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").unwrap());
static CAMEL_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
static UNDERSCORE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").unwrap());

/// Convert a header or label to snake_case
pub fn snake_case(text: &str) -> String {
    let s = NON_ALNUM.replace_all(text, "_");
    let s = CAMEL_BOUNDARY.replace_all(&s, "${1}_${2}");
    let s = s.to_lowercase();
    UNDERSCORE_RUN.replace_all(&s, "_").trim_matches('_').to_string()
}

/// Classification attributes of one country, aligned with [`CLASSIFICATION_COLUMNS`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRecord {
    pub iso3: String,
    pub values: Vec<Option<String>>,
}

impl ClassificationRecord {
    /// Attribute by column name
    pub fn get(&self, column: &str) -> Option<&str> {
        CLASSIFICATION_COLUMNS
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.values.get(i))
            .and_then(|v| v.as_deref())
    }
}

/// Static classification reference keyed by ISO3
#[derive(Debug, Clone, Default)]
pub struct ClassificationTable {
    records: BTreeMap<String, Arc<ClassificationRecord>>,
}

impl ClassificationTable {
    pub fn new(records: Vec<ClassificationRecord>) -> Self {
        let mut table = Self::default();
        for record in records {
            table
                .records
                .entry(record.iso3.clone())
                .or_insert_with(|| Arc::new(record));
        }
        table
    }

    /// Load the reference CSV; headers are snake-cased before matching
    pub fn load(path: &Path) -> Result<Self> {
        let classification_error = |reason: String| NexusError::Classification {
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_file() {
            return Err(classification_error("file not found".to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| classification_error(e.to_string()))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| classification_error(e.to_string()))?
            .iter()
            .map(|h| snake_case(h.trim_start_matches('\u{feff}')))
            .collect();

        let key_index = headers
            .iter()
            .position(|h| h == CLASSIFICATION_KEY_COLUMN)
            .ok_or_else(|| {
                classification_error(format!("missing key column '{}'", CLASSIFICATION_KEY_COLUMN))
            })?;

        let column_indices: Vec<Option<usize>> = CLASSIFICATION_COLUMNS
            .iter()
            .map(|column| headers.iter().position(|h| h == column))
            .collect();

        let absent: Vec<&str> = CLASSIFICATION_COLUMNS
            .iter()
            .zip(&column_indices)
            .filter(|(_, idx)| idx.is_none())
            .map(|(c, _)| *c)
            .collect();
        if !absent.is_empty() {
            warn!(
                "Classification file lacks {} attribute column(s), they will be null: {}",
                absent.len(),
                absent.join(", ")
            );
        }

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for row in reader.records() {
            let row = row.map_err(|e| classification_error(e.to_string()))?;

            let Some(iso3) = row.get(key_index).and_then(crate::country::normalize_code) else {
                skipped += 1;
                continue;
            };

            let values = column_indices
                .iter()
                .map(|idx| {
                    idx.and_then(|i| row.get(i))
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                })
                .collect();

            records.push(ClassificationRecord { iso3, values });
        }

        if skipped > 0 {
            debug!("Skipped {} classification rows without a valid ISO3 code", skipped);
        }

        let table = Self::new(records);
        info!(
            "Loaded {} country classifications from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn get(&self, iso3: &str) -> Option<&Arc<ClassificationRecord>> {
        self.records.get(iso3)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// (display name, ISO3) pairs for name resolution
    pub fn country_names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records.values().filter_map(|record| {
            record
                .get(CLASSIFICATION_NAME_COLUMN)
                .map(|name| (name, record.iso3.as_str()))
        })
    }
}

/// Match statistics of one join
#[derive(Debug, Clone, Default)]
pub struct JoinStats {
    pub rows: usize,
    pub matched: usize,
    /// Distinct country codes with no classification record
    pub unmatched_codes: BTreeSet<String>,
}

impl JoinStats {
    pub fn match_rate(&self) -> f64 {
        if self.rows == 0 {
            0.0
        } else {
            (self.matched as f64 / self.rows as f64) * 100.0
        }
    }
}

/// Left join: every observation is kept, unmatched ones carry no record
pub fn join_classifications(
    rows: Vec<Observation>,
    table: &ClassificationTable,
) -> (Vec<EnrichedObservation>, JoinStats) {
    let mut stats = JoinStats {
        rows: rows.len(),
        ..Default::default()
    };

    let enriched = rows
        .into_iter()
        .map(|observation| {
            let classification = table.get(&observation.country_code).cloned();
            if classification.is_some() {
                stats.matched += 1;
            } else {
                stats.unmatched_codes.insert(observation.country_code.clone());
            }
            EnrichedObservation {
                observation,
                classification,
            }
        })
        .collect();

    (enriched, stats)
}
