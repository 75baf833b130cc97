//! Errors raised by the in-memory engine.
//!
//! They reach callers as [`RepositoryError::Backend`] with the engine error kept as
//! the source, the same way driver errors surface from the MongoDB backend.

use pharmagob_core::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemoryStoreError {
    /// A document with the same `_id` already exists in the collection.
    #[error("duplicate key in {collection}: _id {id}")]
    DuplicateKey { collection: String, id: String },
    /// Query, update or expression operator the engine does not evaluate.
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),
    /// Aggregation stage the engine does not evaluate.
    #[error("unsupported pipeline stage: {0}")]
    UnsupportedStage(String),
    /// A stage is present but its body has the wrong shape.
    #[error("invalid {stage} stage: {reason}")]
    InvalidStage { stage: String, reason: String },
    /// A filter document has the wrong shape.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    /// An update document cannot be applied.
    #[error("invalid update: {0}")]
    InvalidUpdate(String),
}

impl MemoryStoreError {
    pub(crate) fn invalid_stage(stage: &str, reason: impl Into<String>) -> Self {
        MemoryStoreError::InvalidStage { stage: stage.to_string(), reason: reason.into() }
    }
}

pub type MemoryResult<T> = Result<T, MemoryStoreError>;

impl From<MemoryStoreError> for RepositoryError {
    fn from(err: MemoryStoreError) -> Self {
        RepositoryError::backend(err)
    }
}
