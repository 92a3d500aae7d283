//! Library exports for the registry dataset pipeline.

/// Pipeline configuration loading.
pub mod config;
/// Dataset partitioning and Parquet export.
pub mod dataset;
mod http_client;
/// Klass classification lookups and label joins.
pub mod klass;
/// Logging setup.
pub mod logging;
/// Pipeline orchestration.
pub mod pipeline;
/// Registry snapshot download and cleaning.
pub mod registry;
/// Workspace directory helpers.
pub mod workspace;
