//! Error types for the vector store

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Validation and resource errors raised by the store.
///
/// Every variant is a synchronous, non-retryable failure. Operations that
/// return one of these leave the store exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Invalid dimension: must be greater than zero")]
    InvalidDimension,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Duplicate identifier: {id}")]
    DuplicateIdentifier { id: String },

    #[error("Unknown identifier: {id}")]
    UnknownIdentifier { id: String },

    #[error("Invalid k: must be greater than zero")]
    InvalidK,

    #[error("Unsupported metric: {name}")]
    UnsupportedMetric { name: String },

    #[error("Capacity overflow: cannot allocate {requested} rows")]
    CapacityOverflow { requested: usize },

    #[error("Invalid vector: {reason}")]
    InvalidVector { reason: String },

    #[error("Invalid parameter: {reason}")]
    InvalidParameter { reason: String },
}

impl StoreError {
    pub(crate) fn duplicate<K: std::fmt::Debug>(id: &K) -> Self {
        StoreError::DuplicateIdentifier {
            id: format!("{:?}", id),
        }
    }

    pub(crate) fn unknown<K: std::fmt::Debug>(id: &K) -> Self {
        StoreError::UnknownIdentifier {
            id: format!("{:?}", id),
        }
    }
}
