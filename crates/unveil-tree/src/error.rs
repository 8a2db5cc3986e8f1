//! Error types for unveil-tree.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for unveil-tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors that can occur while loading a resolved unit.
#[derive(Error, Debug)]
pub enum TreeError {
    /// Failed to read the unit file.
    #[error("Failed to read unit file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The unit is not valid JSON for this model.
    #[error("Failed to parse resolved unit: {0}")]
    Json(#[from] serde_json::Error),
}
