//! Parquet export of train/test partitions.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use thiserror::Error;
use time::OffsetDateTime;

use super::split::Partitions;
use crate::registry::CleanRecord;

/// Errors that can occur while writing partition files.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The configured timestamp format is not a valid format description.
    #[error("Invalid timestamp format {format:?}: {source}")]
    InvalidTimestampFormat {
        format: String,
        source: time::error::InvalidFormatDescription,
    },
    /// Failed to render the artifact timestamp.
    #[error("Failed to format artifact timestamp: {0}")]
    FormatTime(#[from] time::error::Format),
    /// Failed to create the output directory or file.
    #[error("Failed to create output {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Arrow rejected the assembled record batch.
    #[error("Failed to assemble record batch: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    /// The Parquet writer failed.
    #[error("Failed to write Parquet file {path}: {source}")]
    Parquet {
        path: PathBuf,
        source: parquet::errors::ParquetError,
    },
}

/// Output naming for partition artifacts.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Directory the train/test files are written into (created if missing).
    pub out_dir: PathBuf,
    /// Stem shared by both artifacts.
    pub file_prefix: String,
    /// `time` format description rendered into the artifact names.
    pub timestamp_format: String,
}

/// Paths and row counts of the written artifacts.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Path of the train partition file.
    pub train_path: PathBuf,
    /// Path of the test partition file.
    pub test_path: PathBuf,
    /// Rows written to train.
    pub train_rows: usize,
    /// Rows written to test.
    pub test_rows: usize,
}

/// Write both partitions as Parquet files named
/// `<prefix>_<split>_<timestamp>.parquet`.
pub fn write_partitions(
    partitions: &Partitions<CleanRecord>,
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    std::fs::create_dir_all(&options.out_dir).map_err(|source| ExportError::Io {
        path: options.out_dir.clone(),
        source,
    })?;
    let timestamp = render_timestamp(&options.timestamp_format, OffsetDateTime::now_utc())?;
    let train_path = options
        .out_dir
        .join(partition_file_name(&options.file_prefix, "train", &timestamp));
    let test_path = options
        .out_dir
        .join(partition_file_name(&options.file_prefix, "test", &timestamp));

    write_partition(&partitions.train, &train_path)?;
    write_partition(&partitions.test, &test_path)?;
    tracing::info!(
        "Wrote {} train rows to {} and {} test rows to {}",
        partitions.train.len(),
        train_path.display(),
        partitions.test.len(),
        test_path.display()
    );
    Ok(ExportSummary {
        train_rows: partitions.train.len(),
        test_rows: partitions.test.len(),
        train_path,
        test_path,
    })
}

/// Write one partition to a single Parquet file.
pub fn write_partition(records: &[CleanRecord], path: &Path) -> Result<(), ExportError> {
    let schema = record_schema();
    let batch = record_batch(schema.clone(), records)?;
    let file = File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(writer_properties()))
        .map_err(|source| ExportError::Parquet {
            path: path.to_path_buf(),
            source,
        })?;
    writer.write(&batch).map_err(|source| ExportError::Parquet {
        path: path.to_path_buf(),
        source,
    })?;
    writer.close().map_err(|source| ExportError::Parquet {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_dictionary_enabled(true)
        .set_compression(Compression::SNAPPY)
        .build()
}

fn partition_file_name(prefix: &str, split: &str, timestamp: &str) -> String {
    format!("{prefix}_{split}_{timestamp}.parquet")
}

pub(crate) fn render_timestamp(format: &str, now: OffsetDateTime) -> Result<String, ExportError> {
    let description = time::format_description::parse(format).map_err(|source| {
        ExportError::InvalidTimestampFormat {
            format: format.to_string(),
            source,
        }
    })?;
    Ok(now.format(&description)?)
}

fn record_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("orgnr", DataType::Utf8, false),
        Field::new("company_name", DataType::Utf8, true),
        Field::new("company_activity", DataType::Utf8, true),
        Field::new("company_purpose", DataType::Utf8, true),
        Field::new("number_of_employees", DataType::Int64, true),
        Field::new("orgform", DataType::Utf8, true),
        Field::new("orgform_description_en", DataType::Utf8, true),
        Field::new("date_of_incorporation", DataType::Utf8, true),
        Field::new("website", DataType::Utf8, true),
        Field::new("sector_code", DataType::Utf8, true),
        Field::new("sector_description_nb", DataType::Utf8, true),
        Field::new("sector_description_en", DataType::Utf8, true),
        Field::new("nace_21_code", DataType::Utf8, false),
        Field::new("nace_21_description_nb", DataType::Utf8, true),
        Field::new("nace_21_description_en", DataType::Utf8, true),
    ]))
}

fn record_batch(
    schema: Arc<Schema>,
    records: &[CleanRecord],
) -> Result<RecordBatch, arrow::error::ArrowError> {
    fn text<'a>(
        records: &'a [CleanRecord],
        get: impl Fn(&'a CleanRecord) -> Option<&'a str>,
    ) -> ArrayRef {
        Arc::new(StringArray::from_iter(records.iter().map(get)))
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.orgnr.as_str()),
        )),
        text(records, |r| r.company_name.as_deref()),
        text(records, |r| r.company_activity.as_deref()),
        text(records, |r| r.company_purpose.as_deref()),
        Arc::new(Int64Array::from_iter(
            records.iter().map(|r| r.number_of_employees),
        )),
        text(records, |r| r.orgform.as_deref()),
        text(records, |r| r.orgform_description_en.as_deref()),
        text(records, |r| r.date_of_incorporation.as_deref()),
        text(records, |r| r.website.as_deref()),
        text(records, |r| r.sector_code.as_deref()),
        text(records, |r| r.sector_description_nb.as_deref()),
        text(records, |r| r.sector_description_en.as_deref()),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.nace_21_code.as_str()),
        )),
        text(records, |r| r.nace_21_description_nb.as_deref()),
        text(records, |r| r.nace_21_description_en.as_deref()),
    ];
    RecordBatch::try_new(schema, columns)
}
