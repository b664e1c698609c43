//! # Storage Errors

use thiserror::Error;

/// Errors from the record store and repositories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// No record with this id.
    #[error("{record_type}: record with id {id} not found")]
    RecordNotFound { record_type: String, id: String },

    /// A query expected at most one record and found several.
    #[error("{record_type}: multiple records found for query {query}")]
    RecordDuplicate { record_type: String, query: String },

    /// `save` was called for an id that already exists.
    #[error("{record_type}: record with id {id} already exists")]
    RecordAlreadyExists { record_type: String, id: String },

    /// The stored value could not be (de)serialized.
    #[error("Record serialization failed: {0}")]
    Serialization(String),

    /// Underlying store failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
