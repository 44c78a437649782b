//! Configuration management.
//!
//! Provides the run configuration: directory layout, World Bank API
//! settings and Parquet output options.

use crate::constants::{
    DEFAULT_CLASSIFICATION_FILE, DEFAULT_PROCESSED_DIR, DEFAULT_RAW_DIR, WDI_API_BASE_URL,
    WDI_API_PAGE_SIZE, WDI_CSV_FILE,
};
use polars::prelude::{ParquetCompression, StatisticsOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Supported compression algorithms for parquet files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }

    /// Parse a CLI-style name (snappy, zstd, lz4, none)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "snappy" => Some(Self::Snappy),
            "zstd" => Some(Self::Zstd),
            "lz4" => Some(Self::Lz4),
            "none" | "uncompressed" => Some(Self::Uncompressed),
            _ => None,
        }
    }
}

/// Parquet output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParquetConfig {
    pub compression_algorithm: CompressionAlgorithm,

    /// Write column statistics for query pruning
    pub enable_statistics: bool,
}

impl Default for ParquetConfig {
    fn default() -> Self {
        Self {
            compression_algorithm: CompressionAlgorithm::Snappy,
            enable_statistics: true,
        }
    }
}

impl ParquetConfig {
    pub fn statistics(&self) -> StatisticsOptions {
        if self.enable_statistics {
            StatisticsOptions::full()
        } else {
            StatisticsOptions::empty()
        }
    }
}

/// Where WDI observations come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WdiOrigin {
    /// World Bank Indicators API
    Api,
    /// Bulk CSV dump, relative to the raw data directory
    Csv { file: PathBuf },
}

/// World Bank Indicators API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WdiConfig {
    pub origin: WdiOrigin,
    pub base_url: String,
    pub per_page: u32,
    pub timeout_secs: u64,

    /// Extra attempts after a failed request (0 = fail on first error)
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for WdiConfig {
    fn default() -> Self {
        Self {
            origin: WdiOrigin::Api,
            base_url: WDI_API_BASE_URL.to_string(),
            per_page: WDI_API_PAGE_SIZE,
            timeout_secs: 120,
            max_retries: 0,
            retry_backoff_ms: 2_000,
        }
    }
}

impl WdiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Global configuration for a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NexusConfig {
    /// Directory holding the raw source files
    pub raw_data_dir: PathBuf,

    /// Directory receiving the Parquet outputs
    pub processed_data_dir: PathBuf,

    /// Country classification reference CSV
    pub classification_path: PathBuf,

    /// Restrict the run to these registry entries (None = all)
    pub only_sources: Option<Vec<String>>,

    /// Show the progress bar and coloured summary
    pub show_progress: bool,

    pub wdi: WdiConfig,

    pub parquet: ParquetConfig,
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            raw_data_dir: PathBuf::from(DEFAULT_RAW_DIR),
            processed_data_dir: PathBuf::from(DEFAULT_PROCESSED_DIR),
            classification_path: PathBuf::from(DEFAULT_CLASSIFICATION_FILE),
            only_sources: None,
            show_progress: true,
            wdi: WdiConfig::default(),
            parquet: ParquetConfig::default(),
        }
    }
}

impl NexusConfig {
    /// Create configuration with a custom raw data directory
    pub fn with_raw_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw_data_dir = dir.into();
        self
    }

    /// Create configuration with a custom output directory
    pub fn with_processed_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.processed_data_dir = dir.into();
        self
    }

    pub fn with_classification_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.classification_path = path.into();
        self
    }

    /// Restrict the run to a named subset of sources
    pub fn with_only_sources(mut self, names: Vec<String>) -> Self {
        self.only_sources = Some(names);
        self
    }

    /// Read WDI from the bulk CSV dump instead of the API
    pub fn with_wdi_csv(mut self) -> Self {
        self.wdi.origin = WdiOrigin::Csv {
            file: PathBuf::from(WDI_CSV_FILE),
        };
        self
    }

    pub fn with_api_retries(mut self, retries: u32) -> Self {
        self.wdi.max_retries = retries;
        self
    }

    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.parquet.compression_algorithm = compression;
        self
    }

    /// Disable progress bars and coloured output
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Resolve a raw file name against the raw data directory
    pub fn raw_path(&self, file: impl AsRef<Path>) -> PathBuf {
        self.raw_data_dir.join(file)
    }
}
