/// Errors raised by a [`Repository`](crate::Repository) or the snapshot file.
///
/// # Examples
///
/// ```rust
/// use pulse_storage::error::StorageError;
///
/// let err = StorageError::NotFound("PollCount".to_string());
/// assert!(err.to_string().contains("PollCount"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No metric is stored under the requested id.
    #[error("Storage: metric {0:?} not found")]
    NotFound(String),

    /// Query, transaction or pool failure, including acquire timeouts.
    #[error("Storage: database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A stored row cannot be turned back into a metric.
    #[error("Storage: corrupt row for metric {id:?}: {source}")]
    InvalidRow {
        id: String,
        source: pulse_common::MetricError,
    },

    #[error("Storage: I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization failure.
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend has no durable store to reach.
    #[error("Storage: {0}")]
    Unavailable(String),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
