//! Transformation statistics
//!
//! Row-level problems never abort a source; they are tallied here and
//! surfaced in the run summary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per-source counts of what a transformer kept and excluded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformStats {
    /// Candidate observations examined (one per non-header cell or record)
    pub candidates: usize,

    /// Observations emitted
    pub observations: usize,

    /// Blank cells: no observation exists there
    pub empty_values: usize,

    /// Rows dropped by a source rule (e.g. WDI missing values, UNODC rows without a price)
    pub filtered: usize,

    /// Rows whose country identifier could not be resolved to ISO3
    pub unresolved_countries: usize,

    /// Rows whose year could not be parsed
    pub malformed_years: usize,

    /// Rows whose value is neither numeric nor a known placeholder
    pub malformed_values: usize,

    /// Distinct unresolved country labels, for the log
    pub unresolved_labels: BTreeSet<String>,
}

impl TransformStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows excluded because of bad data
    pub fn excluded(&self) -> usize {
        self.unresolved_countries + self.malformed_years + self.malformed_values
    }

    /// Share of non-empty candidates that became observations, in percent
    pub fn success_rate(&self) -> f64 {
        let considered = self
            .candidates
            .saturating_sub(self.empty_values + self.filtered);
        if considered == 0 {
            100.0
        } else {
            (self.observations as f64 / considered as f64) * 100.0
        }
    }

    /// Fold another set of counts into this one
    pub fn merge(&mut self, other: TransformStats) {
        self.candidates += other.candidates;
        self.observations += other.observations;
        self.empty_values += other.empty_values;
        self.filtered += other.filtered;
        self.unresolved_countries += other.unresolved_countries;
        self.malformed_years += other.malformed_years;
        self.malformed_values += other.malformed_values;
        self.unresolved_labels.extend(other.unresolved_labels);
    }
}
