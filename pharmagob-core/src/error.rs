//! Error types and result types for repository operations.
//!
//! Use [`RepositoryResult<T>`] as the return type for fallible operations. Store-level
//! failures are wrapped in [`RepositoryError::Backend`] with their original error kept
//! as the source, so callers still see exactly what the store reported.

use bson::error::Error as BsonError;
use figment::Error as FigmentError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Boxed error reported by a store backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Represents all possible errors that can occur in the repository layer.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A generic condition used a comparison operator outside `=`, `>`, `<`, `>=`, `<=`.
    #[error("Operator not supported: {0}")]
    UnsupportedOperator(String),
    /// The document has an invalid structure for the requested operation.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The store answered with a document that does not have the expected shape.
    #[error("Malformed store response: {0}")]
    MalformedResponse(String),
    /// An error raised by the underlying store, passed through untouched.
    #[error("Backend error: {0}")]
    Backend(#[source] BoxError),
    /// Configuration could not be loaded or extracted.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RepositoryError {
    /// Wraps a store error, keeping it as the error source.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepositoryError::Backend(Box::new(err))
    }
}

/// A specialized `Result` type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<BsonError> for RepositoryError {
    fn from(err: BsonError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for RepositoryError {
    fn from(err: SerdeJsonError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<FigmentError> for RepositoryError {
    fn from(err: FigmentError) -> Self {
        RepositoryError::Config(err.to_string())
    }
}
