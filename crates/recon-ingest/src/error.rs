use std::path::PathBuf;

use thiserror::Error;

/// Structural failures while reading a source table. All are fatal.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {source_name}: {message}")]
    Csv { source_name: String, message: String },

    #[error("{source_name} has no header row")]
    Empty { source_name: String },

    #[error("{source_name}: record {line} has {found} fields but the header has {expected}")]
    RaggedRow {
        source_name: String,
        line: u64,
        expected: usize,
        found: usize,
    },
}
