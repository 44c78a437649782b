//! Command-line interface for the nexus pipeline
//!
//! Every option has a default, so running the binary with no arguments
//! harmonizes all registered sources from `data/raw` into `data/processed`.

use crate::config::{CompressionAlgorithm, NexusConfig};
use crate::constants::{DEFAULT_CLASSIFICATION_FILE, DEFAULT_PROCESSED_DIR, DEFAULT_RAW_DIR};
use crate::error::{NexusError, Result};
use crate::models::ProcessingStats;
use crate::pipeline::NexusPipeline;
use crate::registry::SourceRegistry;
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

/// Harmonize fiscal and economic survey datasets into long-format Parquet
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fiscal_nexus",
    version,
    about = "Harmonize fiscal and economic datasets into one long-format Parquet table",
    long_about = "Reads survey spreadsheets, CSV exports and the World Bank Indicators API, \
                  reshapes every source into (country, year, indicator) observations, joins \
                  country classifications and writes nexus.parquet plus the pefa and taxwb subsets."
)]
pub struct Args {
    /// Directory holding the raw source files
    #[arg(long = "raw-dir", value_name = "PATH", default_value = DEFAULT_RAW_DIR)]
    pub raw_dir: PathBuf,

    /// Directory receiving the Parquet outputs
    ///
    /// Created if it does not exist. Existing outputs are replaced only
    /// after every artifact has been written.
    #[arg(long = "output-dir", value_name = "PATH", default_value = DEFAULT_PROCESSED_DIR)]
    pub output_dir: PathBuf,

    /// Country classification reference CSV
    #[arg(long = "classifications", value_name = "FILE", default_value = DEFAULT_CLASSIFICATION_FILE)]
    pub classifications: PathBuf,

    /// Read WDI from the bulk CSV dump instead of the World Bank API
    #[arg(long = "wdi-csv")]
    pub wdi_csv: bool,

    /// Comma-separated list of registry sources to process
    #[arg(
        long = "sources",
        value_name = "LIST",
        help = "Comma-separated list of sources to process (default: all)"
    )]
    pub sources: Option<SourceList>,

    /// Parquet compression algorithm (snappy, zstd, lz4, none)
    #[arg(long, value_name = "ALGORITHM", default_value = "snappy")]
    pub compression: String,

    /// Extra attempts for failed World Bank API requests
    #[arg(long = "api-retries", value_name = "COUNT", default_value_t = 0)]
    pub api_retries: u32,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: debug, -vv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Comma-separated source names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceList {
    pub names: Vec<String>,
}

impl FromStr for SourceList {
    type Err = NexusError;

    fn from_str(s: &str) -> Result<Self> {
        let names: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .collect();

        if names.is_empty() {
            return Err(NexusError::configuration("No sources specified"));
        }

        Ok(Self { names })
    }
}

impl Args {
    /// Check argument consistency before anything is read
    pub fn validate(&self) -> Result<()> {
        if !self.raw_dir.is_dir() {
            return Err(NexusError::configuration(format!(
                "Raw data directory does not exist: {}",
                self.raw_dir.display()
            )));
        }

        if CompressionAlgorithm::from_name(&self.compression).is_none() {
            return Err(NexusError::configuration(format!(
                "Unknown compression '{}' (expected snappy, zstd, lz4 or none)",
                self.compression
            )));
        }

        if let Some(list) = &self.sources {
            SourceRegistry::default().retain(&list.names)?;
        }

        Ok(())
    }

    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Progress bars and the coloured summary are hidden in quiet mode
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }

    /// Build the run configuration from the parsed arguments
    pub fn into_config(&self) -> Result<NexusConfig> {
        let compression = CompressionAlgorithm::from_name(&self.compression).ok_or_else(|| {
            NexusError::configuration(format!("Unknown compression '{}'", self.compression))
        })?;

        let mut config = NexusConfig::default()
            .with_raw_data_dir(&self.raw_dir)
            .with_processed_data_dir(&self.output_dir)
            .with_classification_path(&self.classifications)
            .with_compression(compression)
            .with_api_retries(self.api_retries);

        if self.wdi_csv {
            config = config.with_wdi_csv();
        }
        if let Some(list) = &self.sources {
            config = config.with_only_sources(list.names.clone());
        }
        if !self.show_progress() {
            config = config.without_progress();
        }

        Ok(config)
    }
}

/// Run the pipeline for parsed arguments
pub async fn run(args: Args) -> Result<ProcessingStats> {
    setup_logging(&args);

    info!("Starting fiscal_nexus");
    debug!("Command line arguments: {:?}", args);

    args.validate()?;
    let config = args.into_config()?;
    debug!("Configuration: {:?}", config);

    NexusPipeline::new(config).run().await
}

fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fiscal_nexus={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WdiOrigin;
    use tempfile::TempDir;

    #[test]
    fn test_source_list_parsing() {
        let list = SourceList::from_str(" fsi , wb_taxgap ").unwrap();
        assert_eq!(list.names, vec!["fsi", "wb_taxgap"]);

        assert!(SourceList::from_str("").is_err());
        assert!(SourceList::from_str(",,").is_err());
    }

    #[test]
    fn test_defaults_need_no_arguments() {
        let args = Args::try_parse_from(["fiscal_nexus"]).unwrap();
        assert_eq!(args.raw_dir, PathBuf::from("data/raw"));
        assert_eq!(args.output_dir, PathBuf::from("data/processed"));
        assert_eq!(args.compression, "snappy");
        assert_eq!(args.get_log_level(), "info");

        let config = args.into_config().unwrap();
        assert_eq!(config.wdi.origin, WdiOrigin::Api);
        assert!(config.only_sources.is_none());
        assert!(config.show_progress);
    }

    #[test]
    fn test_into_config_applies_flags() {
        let args = Args::try_parse_from([
            "fiscal_nexus",
            "--raw-dir",
            "/tmp/raw",
            "--wdi-csv",
            "--sources",
            "fsi,wb_wdi",
            "--compression",
            "zstd",
            "--api-retries",
            "3",
            "-q",
        ])
        .unwrap();

        let config = args.into_config().unwrap();
        assert_eq!(config.raw_data_dir, PathBuf::from("/tmp/raw"));
        assert!(matches!(config.wdi.origin, WdiOrigin::Csv { .. }));
        assert_eq!(
            config.only_sources,
            Some(vec!["fsi".to_string(), "wb_wdi".to_string()])
        );
        assert_eq!(config.parquet.compression_algorithm, CompressionAlgorithm::Zstd);
        assert_eq!(config.wdi.max_retries, 3);
        assert!(!config.show_progress);
        assert_eq!(args.get_log_level(), "error");
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["fiscal_nexus", "-v", "-q"]).is_err());
        let args = Args::try_parse_from(["fiscal_nexus", "-vv"]).unwrap();
        assert_eq!(args.get_log_level(), "trace");
    }

    #[test]
    fn test_validate() {
        let temp_dir = TempDir::new().unwrap();
        let raw = temp_dir.path().to_str().unwrap();

        let args = Args::try_parse_from(["fiscal_nexus", "--raw-dir", raw]).unwrap();
        assert!(args.validate().is_ok());

        let args =
            Args::try_parse_from(["fiscal_nexus", "--raw-dir", raw, "--compression", "brotli"])
                .unwrap();
        assert!(args.validate().is_err());

        let args =
            Args::try_parse_from(["fiscal_nexus", "--raw-dir", raw, "--sources", "nope"]).unwrap();
        assert!(matches!(
            args.validate(),
            Err(NexusError::Configuration { .. })
        ));

        let missing = temp_dir.path().join("missing");
        let args =
            Args::try_parse_from(["fiscal_nexus", "--raw-dir", missing.to_str().unwrap()]).unwrap();
        assert!(args.validate().is_err());
    }
}
