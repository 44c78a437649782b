//! Core data structures for the nexus pipeline.
//!
//! Defines the canonical observation row, its classification-enriched
//! form, and the run statistics reported by the pipeline driver.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::classification::ClassificationRecord;
use crate::transform::TransformStats;

/// One row of the canonical long table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub country_code: String,
    pub year: Option<i32>,
    pub value: Option<f64>,
    pub value_meta: Option<String>,
    pub source: String,
    pub database: String,
    pub collection: String,
    pub indicator_code: String,
    pub indicator_label: String,
}

/// Descriptor-level metadata stamped onto every row a transformer emits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesMeta {
    pub source: String,
    pub database: String,
    pub collection: String,
    pub indicator_code: String,
    pub indicator_label: String,
}

impl SeriesMeta {
    pub fn new(
        source: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
        indicator_code: impl Into<String>,
        indicator_label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            database: database.into(),
            collection: collection.into(),
            indicator_code: indicator_code.into(),
            indicator_label: indicator_label.into(),
        }
    }

    /// Build an observation carrying this metadata
    pub fn observation(
        &self,
        country_code: String,
        year: Option<i32>,
        value: Option<f64>,
        value_meta: Option<String>,
    ) -> Observation {
        Observation {
            country_code,
            year,
            value,
            value_meta,
            source: self.source.clone(),
            database: self.database.clone(),
            collection: self.collection.clone(),
            indicator_code: self.indicator_code.clone(),
            indicator_label: self.indicator_label.clone(),
        }
    }
}

/// An observation after the classification left join
#[derive(Debug, Clone)]
pub struct EnrichedObservation {
    pub observation: Observation,
    pub classification: Option<Arc<ClassificationRecord>>,
}

/// Per-source outcome reported in the run summary
#[derive(Debug, Clone, Default)]
pub struct SourceSummary {
    pub name: String,
    pub rows_out: usize,
    pub rows_excluded: usize,
    pub unresolved_countries: usize,
    pub classification_matches: usize,
    /// Percentage of non-blank, unfiltered candidates that became rows
    pub success_rate: f64,
}

/// Processing statistics for one pipeline run
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub sources_processed: usize,
    pub total_rows: usize,
    pub rows_excluded: usize,
    pub sources: Vec<SourceSummary>,
    /// Transform counts summed over every source
    pub exclusions: TransformStats,
    pub outputs: Vec<(PathBuf, usize)>,
    pub processing_time_ms: u128,
}
