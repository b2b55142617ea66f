//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::storage::StorageError;

// == Cache Error Enum ==
/// Unified error type for the cache engine and its HTTP surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A table or column name failed validation
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The backing table could not be created or reached
    #[error("Database not ready: {0}")]
    DatabaseNotReady(String),

    /// The upsert for a key did not write a row
    #[error("Cache write failed: {0}")]
    CacheWriteFailed(String),

    /// Any other backend failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rejected delimiter or placeholder change
    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// A blocking cache task panicked or was cancelled
    #[error("Task failed: {0}")]
    TaskFailed(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidIdentifier(_)
            | CacheError::InvalidHierarchy(_)
            | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::DatabaseNotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::CacheWriteFailed(_)
            | CacheError::Storage(_)
            | CacheError::Serialization(_)
            | CacheError::TaskFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
