//! Error types for xport-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in xport-core
///
/// Directive parsing and export-root resolution never fail; these cover
/// snapshot loading, planning policy and the tracking file.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A collection or object id that is not present in the snapshot
    #[error("{kind} id {id} referenced by '{owner}' does not exist")]
    DanglingId {
        kind: &'static str,
        id: usize,
        owner: String,
    },

    /// The collection graph reachable from the scene roots loops back on itself
    #[error("collection '{0}' is its own ancestor")]
    CollectionCycle(String),

    /// No collection with the given name
    #[error("collection '{0}' not found")]
    CollectionNotFound(String),

    /// Strict validation found blocking issues
    #[error("export blocked: {0} directive error(s) found in strict mode")]
    ValidationFailed(usize),

    /// Two export jobs would write the same file
    #[error("more than one export job writes '{}'", .0.display())]
    DuplicateOutput(PathBuf),

    /// Settings carry no export directory
    #[error("no export directory specified")]
    MissingExportPath,

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
