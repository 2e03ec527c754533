//! Error types for Rowscope

use thiserror::Error;

/// Core error type for engine-boundary operations
#[derive(Error, Debug)]
pub enum RowscopeError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Result type alias for engine-boundary operations
pub type Result<T> = std::result::Result<T, RowscopeError>;
