//! Search error types.
//!
//! This module defines the unified error type for the product search engine,
//! covering caller validation failures and backend failures.

use thiserror::Error;

/// Unified errors from product search operations.
///
/// Used by the provider traits and `ProductSearchService`. Callers are expected
/// to correct and retry a `ValidationError`; every other variant is an
/// infrastructure failure and is never downgraded into an empty result.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// Malformed request (inverted price bounds, zero page, unknown sort mode, ...).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The datastore or index failed to answer a read (timeout, connection loss,
    /// malformed index state or response).
    #[error("Retrieval error: {0}")]
    RetrievalError(String),

    /// Failed to establish a connection to the backend.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to prepare the backend schema or index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// An append or upsert failed (history record, term roll-up, projection sync).
    #[error("Write error: {0}")]
    WriteError(String),

    /// Batch size exceeds configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },
}

impl SearchError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a retrieval error.
    pub fn retrieval(msg: impl Into<String>) -> Self {
        Self::RetrievalError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a write error.
    pub fn write(msg: impl Into<String>) -> Self {
        Self::WriteError(msg.into())
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }

    /// Returns true for caller errors that must not be retried as-is.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_) | Self::BatchSizeExceeded { .. }
        )
    }

    /// Returns true for read-path infrastructure failures.
    pub fn is_retrieval(&self) -> bool {
        matches!(self, Self::RetrievalError(_) | Self::ConnectionError(_))
    }
}

impl From<sqlx::Error> for SearchError {
    fn from(err: sqlx::Error) -> Self {
        Self::RetrievalError(err.to_string())
    }
}
