//! End-to-end pipeline: download, clean, label, split, export.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::config::PipelineConfig;
use crate::dataset::export::{self, ExportOptions, ExportSummary};
use crate::dataset::split::{self, Partitions, SplitError};
use crate::klass::{self, LabelMaps};
use crate::registry::{self, CleanRecord};
use crate::workspace;

/// Errors from any pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Workspace resolution failed.
    #[error(transparent)]
    Workspace(#[from] workspace::WorkspaceError),
    /// Snapshot download failed.
    #[error(transparent)]
    Download(#[from] registry::DownloadError),
    /// Snapshot parsing failed.
    #[error(transparent)]
    Clean(#[from] registry::CleanError),
    /// The classification service could not be reached.
    #[error(transparent)]
    Klass(#[from] klass::KlassError),
    /// The partitioner rejected its inputs.
    #[error(transparent)]
    Split(#[from] SplitError),
    /// Writing the output artifacts failed.
    #[error(transparent)]
    Export(#[from] export::ExportError),
}

/// Counts and artifact paths from a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The snapshot file the run consumed.
    pub snapshot_path: PathBuf,
    /// Rows in the snapshot before cleaning.
    pub total_rows: usize,
    /// Records that survived cleaning.
    pub clean_rows: usize,
    /// Records routed unconditionally to train by the rescue policy.
    pub rescued_records: usize,
    /// Written train/test artifacts.
    pub export: ExportSummary,
    /// Distinct NACE categories in the train partition.
    pub train_categories: usize,
    /// Distinct NACE categories in the test partition.
    pub test_categories: usize,
}

/// Download a fresh snapshot and run the full pipeline on it.
pub fn run(config: &PipelineConfig) -> Result<RunSummary, PipelineError> {
    let temp_dir = workspace::temp_dir(config.workspace_dir.as_ref())?;
    let timestamp =
        export::render_timestamp(&config.timestamp_format, OffsetDateTime::now_utc())?;
    let file_name = format!("{}_{timestamp}", config.file_prefix);
    let snapshot = registry::download_snapshot(&config.registry_url, &temp_dir, &file_name)?;
    run_from_snapshot(config, &snapshot)
}

/// Run the pipeline on an already-downloaded snapshot file.
pub fn run_from_snapshot(
    config: &PipelineConfig,
    snapshot: &Path,
) -> Result<RunSummary, PipelineError> {
    let outcome = registry::clean_snapshot(snapshot)?;
    let mut records = outcome.records;

    let date = match &config.klass_date {
        Some(date) => date.clone(),
        None => today(),
    };
    let labels = LabelMaps::fetch(&config.klass_base_url, &date)?;
    klass::apply_labels(&mut records, &labels);

    let partitions = partition_records(records, config)?;
    let train_categories = distinct_categories(&partitions.train);
    let test_categories = distinct_categories(&partitions.test);
    tracing::info!(
        "Split into {} train / {} test records ({} rescued into train); {} NACE groups in train, {} in test",
        partitions.train.len(),
        partitions.test.len(),
        partitions.rescued_records,
        train_categories,
        test_categories
    );

    let export_summary = export::write_partitions(
        &partitions,
        &ExportOptions {
            out_dir: config.output_location.clone(),
            file_prefix: config.file_prefix.clone(),
            timestamp_format: config.timestamp_format.clone(),
        },
    )?;

    Ok(RunSummary {
        snapshot_path: snapshot.to_path_buf(),
        total_rows: outcome.total_rows,
        clean_rows: partitions.train.len() + partitions.test.len(),
        rescued_records: partitions.rescued_records,
        export: export_summary,
        train_categories,
        test_categories,
    })
}

/// Partition cleaned records, treating a degenerate split as "nothing to
/// stratify": everything goes to train and the test partition stays empty.
fn partition_records(
    records: Vec<CleanRecord>,
    config: &PipelineConfig,
) -> Result<Partitions<CleanRecord>, PipelineError> {
    match split::assign(
        &records,
        &config.split,
        |record| Some(record.nace_21_code.as_str()),
        |record| record.orgnr.as_str(),
    ) {
        Ok(assignment) => Ok(split::apply(records, &assignment)),
        Err(SplitError::DegenerateSplit) => {
            tracing::warn!(
                "No NACE group exceeds the splittable floor of {}; writing all {} records as train",
                config.split.min_splittable_count,
                records.len()
            );
            let rescued_records = records.len();
            let rescued_categories = distinct_categories(&records);
            Ok(Partitions {
                train: records,
                test: Vec::new(),
                rescued_records,
                rescued_categories,
            })
        }
        Err(err) => Err(err.into()),
    }
}

fn distinct_categories(records: &[CleanRecord]) -> usize {
    records
        .iter()
        .map(|record| record.nace_21_code.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

fn today() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "2026-01-01".to_string())
}
