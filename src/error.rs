//! Error types for the vector database

use thiserror::Error;

use crate::index::IndexType;

/// Result type alias for Vector5db operations
pub type Result<T> = std::result::Result<T, VectorDbError>;

/// Error types that can occur in Vector5db operations
#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Unsupported metric: {name}")]
    UnsupportedMetric { name: String },

    #[error("Unsupported index: {index} is not configured on this collection")]
    UnsupportedIndex { index: IndexType },

    #[error("Item not found: {id}")]
    NotFound { id: String },

    #[error("Invalid vector: {reason}")]
    InvalidVector { reason: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for VectorDbError {
    fn from(err: serde_json::Error) -> Self {
        VectorDbError::SerializationError(err.to_string())
    }
}
