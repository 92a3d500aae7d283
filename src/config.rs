//! Pipeline configuration loaded from a TOML file with sensible defaults.
//!
//! Replaces ad-hoc process-wide settings (environment-derived paths, constants
//! scattered through the pipeline) with one explicit object handed to the
//! entry point.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::dataset::split::SplitOptions;

/// Bulk-download endpoint for the register of legal entities.
pub const DEFAULT_REGISTRY_URL: &str =
    "https://data.brreg.no/enhetsregisteret/api/enheter/lastned/csv";

const DEFAULT_TIMESTAMP_FORMAT: &str = "[year][month][day]_[hour][minute][second]";
const DEFAULT_FILE_PREFIX: &str = "brreg_entities";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse the configuration file as TOML.
    #[error("Failed to parse config file {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level configuration for a pipeline run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory where the train/test Parquet files are written.
    pub output_location: PathBuf,
    /// Scratch directory for snapshot downloads; `WORKSPACE_DIR` or the OS
    /// cache directory when unset.
    pub workspace_dir: Option<PathBuf>,
    /// `time` format description used in output artifact names.
    pub timestamp_format: String,
    /// Stem for snapshot and partition file names.
    pub file_prefix: String,
    /// Registry bulk-download URL.
    pub registry_url: String,
    /// Base URL of the Klass classification service.
    pub klass_base_url: String,
    /// As-of date for classification versions (`YYYY-MM-DD`); today when unset.
    pub klass_date: Option<String>,
    /// Stratified split parameters.
    pub split: SplitOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_location: PathBuf::from("dataset_out"),
            workspace_dir: None,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            klass_base_url: crate::klass::KLASS_BASE_URL.to_string(),
            klass_date: None,
            split: SplitOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from `path`, or return defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_canonical_run() {
        let config = PipelineConfig::default();
        assert_eq!(config.registry_url, DEFAULT_REGISTRY_URL);
        assert_eq!(config.file_prefix, "brreg_entities");
        assert_eq!(config.split.min_splittable_count, 5);
        assert!(config.workspace_dir.is_none());
    }

    #[test]
    fn loads_partial_toml_over_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "output_location = \"/data/out\"\n\n[split]\ntrain_fraction = 0.7\nseed = 7"
        )
        .unwrap();

        let config = PipelineConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.output_location, PathBuf::from("/data/out"));
        assert_eq!(config.split.train_fraction, 0.7);
        assert_eq!(config.split.seed, 7);
        // Untouched fields keep their defaults.
        assert_eq!(config.split.min_splittable_count, 5);
        assert_eq!(config.registry_url, DEFAULT_REGISTRY_URL);
    }

    #[test]
    fn rejects_unknown_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(&path, "output_bucket = \"oops\"").unwrap();
        let err = PipelineConfig::load_or_default(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = PipelineConfig::load_or_default(Some(Path::new("/no/such/file.toml")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
