//! Registry snapshot download and cleaning.

mod clean;
mod download;
mod records;

pub use clean::{CleanError, CleanOutcome, clean_snapshot};
pub use download::{DownloadError, count_entities, download_snapshot};
pub use records::{CleanRecord, DropReason, RawEntity};
