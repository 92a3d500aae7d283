//! Dataset partitioning and export for classification experiments.

pub mod export;
pub mod split;

pub use export::{ExportError, ExportOptions, write_partitions};
pub use split::{Partitions, Split, SplitError, SplitOptions, partition};
