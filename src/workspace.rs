//! Scratch-directory helpers for downloaded registry snapshots.
//!
//! The workspace defaults to the OS cache directory under `.brreg-dataset`,
//! with a `WORKSPACE_DIR` override for CI runs or portable setups.

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the scratch directory that lives under the OS cache root.
pub const WORKSPACE_DIR_NAME: &str = ".brreg-dataset";

/// Environment variable honored when no explicit workspace is configured.
pub const WORKSPACE_ENV_VAR: &str = "WORKSPACE_DIR";

static WORKSPACE_BASE_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> =
    LazyLock::new(|| Mutex::new(None));

/// Errors that can occur while resolving or preparing the workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// No suitable base directory could be resolved.
    #[error("No suitable base directory available for the download workspace")]
    NoBaseDir,
    /// Failed to create the workspace directory.
    #[error("Failed to create workspace directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Resolve the scratch directory for snapshot downloads, creating it if needed.
///
/// Precedence: explicit override from configuration, then the `WORKSPACE_DIR`
/// environment variable, then the OS cache directory.
pub fn temp_dir(configured: Option<&PathBuf>) -> Result<PathBuf, WorkspaceError> {
    let base = match configured {
        Some(path) => path.clone(),
        None => workspace_base_dir().ok_or(WorkspaceError::NoBaseDir)?,
    };
    let path = base.join("temp");
    std::fs::create_dir_all(&path).map_err(|source| WorkspaceError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Return the logs directory inside the workspace root, creating it if needed.
pub fn logs_dir() -> Result<PathBuf, WorkspaceError> {
    let base = workspace_base_dir().ok_or(WorkspaceError::NoBaseDir)?;
    let path = base.join("logs");
    std::fs::create_dir_all(&path).map_err(|source| WorkspaceError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn workspace_base_dir() -> Option<PathBuf> {
    if let Some(path) = WORKSPACE_BASE_OVERRIDE
        .lock()
        .ok()
        .and_then(|guard| guard.clone())
    {
        return Some(path);
    }
    if let Ok(path) = std::env::var(WORKSPACE_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    BaseDirs::new().map(|dirs| dirs.cache_dir().join(WORKSPACE_DIR_NAME))
}

#[cfg(test)]
fn set_workspace_base_override(path: PathBuf) {
    let mut guard = WORKSPACE_BASE_OVERRIDE
        .lock()
        .expect("workspace base override mutex poisoned");
    *guard = Some(path);
}

#[cfg(test)]
fn clear_workspace_base_override() {
    let mut guard = WORKSPACE_BASE_OVERRIDE
        .lock()
        .expect("workspace base override mutex poisoned");
    *guard = None;
}
