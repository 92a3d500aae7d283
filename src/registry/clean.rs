//! Snapshot parsing and cleaning.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use thiserror::Error;

use super::records::{CleanRecord, DropReason, RawEntity};

/// Errors that can occur while parsing a snapshot file.
#[derive(Debug, Error)]
pub enum CleanError {
    /// Failed to open the snapshot file.
    #[error("Failed to open snapshot {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A row could not be parsed as CSV.
    #[error("Failed to parse snapshot {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// Cleaned records plus per-filter removal counts.
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    /// Records that passed every filter, in snapshot order.
    pub records: Vec<CleanRecord>,
    /// Rows in the snapshot before filtering.
    pub total_rows: usize,
    /// Rows dropped across all filters.
    pub removed_rows: usize,
    /// Rows dropped because the entity is bankrupt.
    pub removed_bankrupt: usize,
    /// Rows dropped because the entity is outside the enterprise register.
    pub removed_unregistered: usize,
    /// Rows dropped because the organisation number or NACE code is missing.
    pub removed_missing_fields: usize,
}

/// Parse a snapshot file (gzip CSV, or plain CSV when the path does not end
/// in `.gz`) into cleaned records.
pub fn clean_snapshot(path: &Path) -> Result<CleanOutcome, CleanError> {
    let file = File::open(path).map_err(|source| CleanError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader: Box<dyn Read> = if path.extension().and_then(|ext| ext.to_str()) == Some("gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let mut csv_reader = csv::Reader::from_reader(reader);

    let mut records = Vec::new();
    let mut total_rows = 0usize;
    let mut removed_bankrupt = 0usize;
    let mut removed_unregistered = 0usize;
    let mut removed_missing_fields = 0usize;
    for row in csv_reader.deserialize::<RawEntity>() {
        let entity = row.map_err(|source| CleanError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        total_rows += 1;
        match entity.into_clean() {
            Ok(record) => records.push(record),
            Err(DropReason::Bankrupt) => removed_bankrupt += 1,
            Err(DropReason::NotRegistered) => removed_unregistered += 1,
            Err(DropReason::MissingFields) => removed_missing_fields += 1,
        }
    }
    let removed_rows = total_rows - records.len();
    tracing::info!(
        "Cleaned snapshot {}: kept {} of {} rows ({} bankrupt, {} unregistered, {} missing orgnr/NACE)",
        path.display(),
        records.len(),
        total_rows,
        removed_bankrupt,
        removed_unregistered,
        removed_missing_fields
    );
    Ok(CleanOutcome {
        records,
        total_rows,
        removed_rows,
        removed_bankrupt,
        removed_unregistered,
        removed_missing_fields,
    })
}
