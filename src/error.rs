//! Error handling for nexus pipeline operations.
//!
//! Provides error types with enough context to identify the failing
//! source and stage. Row-level data problems are not errors; they are
//! counted by the transformers instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NexusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Source '{source_name}' file not found: {path}")]
    SourceFileMissing { source_name: String, path: PathBuf },

    #[error("Spreadsheet error in source '{source_name}' ({path}): {reason}")]
    Spreadsheet {
        source_name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("CSV error in source '{source_name}' ({path}): {reason}")]
    Csv {
        source_name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("API request failed for source '{source_name}': {reason}")]
    Api { source_name: String, reason: String },

    #[error("Malformed source '{source_name}': {reason}")]
    MalformedSource { source_name: String, reason: String },

    #[error("Schema mismatch in source table '{table}': {details}")]
    SchemaMismatch { table: String, details: String },

    #[error("Classification table error ({path}): {reason}")]
    Classification { path: PathBuf, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Processing interrupted: {reason}")]
    ProcessingInterrupted { reason: String },
}

impl NexusError {
    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSource {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn api(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Api {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn processing_interrupted(reason: impl Into<String>) -> Self {
        Self::ProcessingInterrupted {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NexusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_source() {
        let err = NexusError::SourceFileMissing {
            source_name: "gfi".to_string(),
            path: PathBuf::from("data/raw/gfi trade mispricing.xlsx"),
        };
        let message = err.to_string();
        assert!(message.contains("'gfi'"));
        assert!(message.contains("gfi trade mispricing.xlsx"));

        let err = NexusError::api("wdi", "HTTP 503");
        assert_eq!(
            err.to_string(),
            "API request failed for source 'wdi': HTTP 503"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: NexusError = io.into();
        assert!(matches!(err, NexusError::Io(_)));
    }
}
