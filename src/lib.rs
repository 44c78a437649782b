//! Fiscal Nexus Library
//!
//! Harmonizes heterogeneous fiscal and economic datasets (survey
//! spreadsheets, CSV exports and the World Bank Indicators API) into one
//! long-format table keyed by country, year and indicator.
//!
//! The pipeline stages are:
//! - extraction of raw tables per registered source
//! - per-source reshaping into canonical observations
//! - a left join against the country classification table
//! - unification into one DataFrame and Parquet export with two subsets

pub mod classification;
pub mod cli;
pub mod config;
pub mod constants;
pub mod country;
pub mod error;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod transform;
pub mod unify;
pub mod writer;

pub use config::{CompressionAlgorithm, NexusConfig, ParquetConfig, WdiConfig, WdiOrigin};
pub use error::{NexusError, Result};
pub use models::{EnrichedObservation, Observation, ProcessingStats, SourceSummary};
pub use pipeline::NexusPipeline;
pub use registry::{SourceDescriptor, SourceLayout, SourceRegistry};
