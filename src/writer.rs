//! Parquet output for the unified table and its subsets
//!
//! All artifacts are first written to hidden temporary siblings. Only when
//! every one of them has been written are they renamed into place, so a
//! failure while encoding never touches existing outputs. The renames
//! themselves are not atomic as a set: if one fails, earlier artifacts are
//! already replaced and the remaining temporaries are removed.

use crate::config::ParquetConfig;
use crate::error::Result;
use polars::prelude::{DataFrame, ParquetWriter as PolarsParquetWriter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A named table to persist as `<name>.parquet`
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub frame: DataFrame,
}

impl Artifact {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame,
        }
    }
}

/// Writes a set of artifacts into one output directory
#[derive(Debug, Clone)]
pub struct ParquetWriter {
    output_dir: PathBuf,
    config: ParquetConfig,
}

impl ParquetWriter {
    pub fn new(output_dir: impl Into<PathBuf>, config: ParquetConfig) -> Self {
        Self {
            output_dir: output_dir.into(),
            config,
        }
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.parquet", name))
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!(".{}.parquet.tmp", name))
    }

    /// Write every artifact, then move them all into place.
    ///
    /// Staging is all-or-nothing. A rename failure leaves the artifacts
    /// renamed before it in place and deletes the temporaries after it.
    /// Returns the final paths with their row counts.
    pub fn write_all(&self, artifacts: Vec<Artifact>) -> Result<Vec<(PathBuf, usize)>> {
        fs::create_dir_all(&self.output_dir)?;

        let mut staged: Vec<(PathBuf, PathBuf, usize)> = Vec::with_capacity(artifacts.len());
        for mut artifact in artifacts {
            let temp = self.temp_path(&artifact.name);
            let rows = artifact.frame.height();

            if let Err(e) = self.write_frame(&temp, &mut artifact.frame) {
                remove_quietly(&temp);
                for (staged_temp, _, _) in &staged {
                    remove_quietly(staged_temp);
                }
                return Err(e);
            }

            debug!("Staged {} ({} rows)", temp.display(), rows);
            staged.push((temp, self.output_path(&artifact.name), rows));
        }

        let mut written = Vec::with_capacity(staged.len());
        let mut pending = staged.into_iter();
        while let Some((temp, target, rows)) = pending.next() {
            if let Err(e) = fs::rename(&temp, &target) {
                remove_quietly(&temp);
                for (staged_temp, _, _) in pending {
                    remove_quietly(&staged_temp);
                }
                return Err(e.into());
            }
            info!("Wrote {} rows to {}", rows, target.display());
            written.push((target, rows));
        }

        Ok(written)
    }

    fn write_frame(&self, path: &Path, frame: &mut DataFrame) -> Result<()> {
        let file = fs::File::create(path)?;
        PolarsParquetWriter::new(file)
            .with_compression(self.config.compression_algorithm.to_polars_compression())
            .with_statistics(self.config.statistics())
            .finish(frame)?;
        Ok(())
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove temporary file {}: {}", path.display(), e);
        }
    }
}
