use crate::types::MetricKind;

/// Validation and integrity failures for a metric submission.
///
/// Every variant is a request-level failure: nothing is written to the
/// repository once one of these is produced.
///
/// # Examples
///
/// ```
/// use pulse_common::MetricError;
///
/// let err = MetricError::UnsupportedKind("histogram".to_string());
/// assert!(err.to_string().contains("histogram"));
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricError {
    /// The `type` field is neither `gauge` nor `counter`.
    #[error("unsupported metric type {0:?}")]
    UnsupportedKind(String),

    /// The raw value does not parse as a number of the declared kind.
    #[error("invalid {kind} value {raw:?}")]
    Parse { kind: MetricKind, raw: String },

    #[error("metric id must not be empty")]
    MissingId,

    /// The payload carries no value for the declared kind.
    #[error("metric {id:?} has no {kind} value")]
    MissingValue { id: String, kind: MetricKind },

    /// The submitted hash does not match the one recomputed with the shared key.
    #[error("hash mismatch for metric {0:?}")]
    HashMismatch(String),

    #[error("metric batch is empty")]
    EmptyBatch,
}
