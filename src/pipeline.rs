//! Pipeline driver.
//!
//! Runs every registered source through extract, transform and the
//! classification join, unifies the results and writes the Parquet
//! artifacts. Sources are processed one after another; any source-level
//! error aborts the run before anything is written.

use crate::classification::{ClassificationTable, join_classifications};
use crate::config::NexusConfig;
use crate::constants::{SUBSET_OUTPUTS, UNIFIED_OUTPUT_NAME};
use crate::country::CountryCoder;
use crate::error::Result;
use crate::extract::{WdiClient, check_inputs, extract};
use crate::models::{ProcessingStats, SourceSummary};
use crate::registry::{SourceDescriptor, SourceRegistry};
use crate::transform::{TransformStats, transform};
use crate::unify::{SourceFrame, subset, to_frame, unify};
use crate::writer::{Artifact, ParquetWriter};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Orchestrates a full harmonization run
#[derive(Debug)]
pub struct NexusPipeline {
    config: NexusConfig,
    registry: SourceRegistry,
}

impl NexusPipeline {
    pub fn new(config: NexusConfig) -> Self {
        Self {
            config,
            registry: SourceRegistry::default(),
        }
    }

    /// Replace the built-in source registry
    pub fn with_registry(mut self, registry: SourceRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Main processing entry point
    pub async fn run(&self) -> Result<ProcessingStats> {
        let start_time = Instant::now();
        let show = self.config.show_progress;

        let registry = match &self.config.only_sources {
            Some(names) => self.registry.clone().retain(names)?,
            None => self.registry.clone(),
        };

        if show {
            println!("{}", "Starting nexus harmonization".bright_green().bold());
            println!(
                "  {} {}",
                "Raw data:".bright_cyan(),
                self.config.raw_data_dir.display()
            );
            println!(
                "  {} {}",
                "Output:".bright_cyan(),
                self.config.processed_data_dir.display()
            );
            println!(
                "  {} {}",
                "Sources:".bright_cyan(),
                registry.len().to_string().bright_white().bold()
            );
        }

        for descriptor in registry.descriptors() {
            check_inputs(descriptor, &self.config)?;
        }
        debug!("All raw inputs present for {} sources", registry.len());

        let classifications = ClassificationTable::load(&self.config.classification_path)?;
        let coder = CountryCoder::from_classification(&classifications);
        info!(
            "Loaded {} classification records, {} country names",
            classifications.len(),
            coder.len()
        );

        let client = WdiClient::new(&self.config.wdi)?;
        let progress_bar = self.progress_bar(registry.len());

        let mut stats = ProcessingStats::default();
        let mut frames = Vec::with_capacity(registry.len());

        for descriptor in registry.descriptors() {
            if let Some(pb) = &progress_bar {
                pb.set_message(descriptor.name.clone());
            }

            let result = self
                .process_source(descriptor, &client, &coder, &classifications)
                .await;
            let (frame, summary, transform_stats) = match result {
                Ok(processed) => processed,
                Err(e) => {
                    if let Some(pb) = &progress_bar {
                        pb.abandon_with_message(format!("failed: {}", descriptor.name));
                    }
                    return Err(e);
                }
            };

            stats.total_rows += summary.rows_out;
            stats.rows_excluded += summary.rows_excluded;
            stats.sources_processed += 1;
            stats.exclusions.merge(transform_stats);
            stats.sources.push(summary);
            frames.push(frame);

            if let Some(pb) = &progress_bar {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress_bar {
            pb.finish_with_message("Sources complete");
        }

        let unified = unify(frames)?;
        debug!("Unified table has {} rows", unified.height());

        let mut artifacts = Vec::with_capacity(1 + SUBSET_OUTPUTS.len());
        for (name, collection) in SUBSET_OUTPUTS {
            artifacts.push(Artifact::new(*name, subset(&unified, collection)?));
        }
        artifacts.insert(0, Artifact::new(UNIFIED_OUTPUT_NAME, unified));

        let writer = ParquetWriter::new(
            &self.config.processed_data_dir,
            self.config.parquet.clone(),
        );
        stats.outputs = writer.write_all(artifacts)?;
        stats.processing_time_ms = start_time.elapsed().as_millis();

        if show {
            print_summary(&stats);
        }

        Ok(stats)
    }

    async fn process_source(
        &self,
        descriptor: &SourceDescriptor,
        client: &WdiClient,
        coder: &CountryCoder,
        classifications: &ClassificationTable,
    ) -> Result<(SourceFrame, SourceSummary, TransformStats)> {
        let name = descriptor.name.as_str();
        info!("Processing source '{}'", name);

        let raw = extract(descriptor, &self.config, client).await?;
        let output = transform(&raw, descriptor, coder)?;
        drop(raw);

        let transform_stats = output.stats;
        if !transform_stats.unresolved_labels.is_empty() {
            warn!(
                "Source '{}': {} unresolved country labels: {}",
                name,
                transform_stats.unresolved_labels.len(),
                transform_stats
                    .unresolved_labels
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let (enriched, join_stats) = join_classifications(output.observations, classifications);
        if !join_stats.unmatched_codes.is_empty() {
            debug!(
                "Source '{}': no classification for {:?}",
                name, join_stats.unmatched_codes
            );
        }

        let frame = to_frame(&enriched)?;
        info!(
            "Source '{}': {} rows, {} excluded, {:.1}% classified",
            name,
            frame.height(),
            transform_stats.excluded(),
            join_stats.match_rate()
        );

        let summary = SourceSummary {
            name: name.to_string(),
            rows_out: frame.height(),
            rows_excluded: transform_stats.excluded(),
            unresolved_countries: transform_stats.unresolved_countries,
            classification_matches: join_stats.matched,
            success_rate: transform_stats.success_rate(),
        };

        Ok((
            SourceFrame {
                name: name.to_string(),
                frame,
            },
            summary,
            transform_stats,
        ))
    }

    fn progress_bar(&self, len: usize) -> Option<ProgressBar> {
        if !self.config.show_progress {
            return None;
        }

        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb.set_message("Initializing...");
        Some(pb)
    }
}

fn print_summary(stats: &ProcessingStats) {
    println!("\n{}", "Processing Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        stats.processing_time_ms.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Sources processed:".bright_cyan(),
        stats.sources_processed.to_string().bright_white()
    );

    for source in &stats.sources {
        let excluded = if source.rows_excluded > 0 {
            format!("{} excluded", source.rows_excluded).yellow().to_string()
        } else {
            "0 excluded".to_string()
        };
        println!(
            "    {:<16} {:>10} rows  {:>6.1}%  {}",
            source.name,
            source.rows_out.to_string().bright_white(),
            source.success_rate,
            excluded
        );
    }

    if stats.rows_excluded > 0 {
        let exclusions = &stats.exclusions;
        println!(
            "  {} {} ({} unresolved countries, {} bad years, {} bad values)",
            "Rows excluded:".bright_yellow(),
            stats.rows_excluded.to_string().bright_yellow().bold(),
            exclusions.unresolved_countries,
            exclusions.malformed_years,
            exclusions.malformed_values
        );
    }
    println!(
        "  {} {}",
        "Total rows:".bright_cyan(),
        stats.total_rows.to_string().bright_white().bold()
    );
    for (path, rows) in &stats.outputs {
        println!(
            "  {} {} ({} rows)",
            "Wrote".bright_green(),
            path.display(),
            rows
        );
    }
}
