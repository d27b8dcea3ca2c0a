//! Error types for mapping, fallback and rule storage.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from editing an accepted mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("field not found in schema: {0}")]
    FieldNotFound(String),
    #[error("column not found in source data: {0}")]
    ColumnNotFound(String),
    #[error("output name '{output}' is already used by '{holder}'")]
    OutputNameConflict { output: String, holder: String },
}

/// Failures of the external fallback classifier.
///
/// The matcher never propagates these; they degrade the column to unmapped.
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("fallback classifier timed out after {0} ms")]
    Timeout(u64),
    #[error("fallback command failed to start: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("fallback command I/O failed: {0}")]
    Io(#[source] std::io::Error),
    #[error("fallback command exited with status {0}")]
    Exit(String),
    #[error("malformed fallback response: {0}")]
    Malformed(String),
    #[error("fallback classifier disconnected")]
    Disconnected,
}

/// Failures writing the rule store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize rules: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("timed out waiting for lock {path}")]
    LockTimeout { path: PathBuf },

    #[error("kept output name '{output}' already belongs to column '{holder}'")]
    OutputNameTaken { output: String, holder: String },

    /// Atomic write failed (temp file couldn't be renamed).
    #[error("failed to replace {target_path} with {temp_path}: {source}")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
