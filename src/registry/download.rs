//! Bulk download of the registry snapshot.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use thiserror::Error;

use crate::http_client;

/// Errors that can occur while downloading a snapshot.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The HTTP request failed or returned a non-success status.
    #[error("Snapshot download from {url} failed: {message}")]
    Http { url: String, message: String },
    /// Failed to create the destination directory.
    #[error("Failed to create download directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to create or write the snapshot file.
    #[error("Failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to read the snapshot back for the entity count.
    #[error("Failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Download the registry snapshot to `<dest_dir>/<file_name>.csv.gz`.
///
/// The transfer is sequential with no retries or resumption; a failed
/// download leaves no usable artifact behind. After the download the file is
/// decompressed once to log an entity estimate.
pub fn download_snapshot(
    url: &str,
    dest_dir: &Path,
    file_name: &str,
) -> Result<PathBuf, DownloadError> {
    std::fs::create_dir_all(dest_dir).map_err(|source| DownloadError::CreateDir {
        path: dest_dir.to_path_buf(),
        source,
    })?;
    let path = dest_dir.join(format!("{file_name}.csv.gz"));
    tracing::info!("Downloading registry snapshot to {}", path.display());

    let response = http_client::agent()
        .get(url)
        .set("User-Agent", http_client::USER_AGENT)
        .call()
        .map_err(|err| DownloadError::Http {
            url: url.to_string(),
            message: err.to_string(),
        })?;

    let file = File::create(&path).map_err(|source| DownloadError::Write {
        path: path.clone(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    let bytes = http_client::copy_response_to_writer(response, &mut writer).map_err(|source| {
        DownloadError::Write {
            path: path.clone(),
            source,
        }
    })?;
    writer.flush().map_err(|source| DownloadError::Write {
        path: path.clone(),
        source,
    })?;
    tracing::info!("Snapshot saved ({bytes} bytes compressed)");

    let entities = count_entities(&path)?;
    tracing::info!("Estimated entities in snapshot: {entities}");
    Ok(path)
}

/// Count data rows in a gzip CSV snapshot (lines minus the header).
pub fn count_entities(path: &Path) -> Result<u64, DownloadError> {
    let file = File::open(path).map_err(|source| DownloadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(GzDecoder::new(file));
    let mut lines = 0u64;
    for line in reader.lines() {
        line.map_err(|source| DownloadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        lines += 1;
    }
    Ok(lines.saturating_sub(1))
}
