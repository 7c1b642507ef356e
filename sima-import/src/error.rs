//! Error types for sima-import

use thiserror::Error;

/// Import pipeline error type
#[derive(Debug, Error)]
pub enum ImportError {
    /// Uploaded file could not be parsed into rows
    #[error("Parse error: {0}")]
    Parse(String),

    /// File extension with no registered parser
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Batch not found
    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    /// Batch is in the wrong lifecycle state for the requested operation
    #[error("Invalid batch state: expected {expected}, found {found}")]
    InvalidState { expected: String, found: String },

    /// Stored upload file missing or unreadable at commit time
    #[error("Stored file unreadable: {0}")]
    StoredFileUnreadable(String),

    /// Sequence allocation failed (lock contention, timeout)
    #[error("Sequence allocation failed for unit {unit_id} year {join_year}: {source}")]
    Allocation {
        unit_id: i64,
        join_year: i32,
        #[source]
        source: sqlx::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// sima-common error
    #[error("Common error: {0}")]
    Common(#[from] sima_common::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;
