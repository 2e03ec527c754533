//! Error types for the browse layer

use thiserror::Error;

pub type BrowseResult<T> = Result<T, BrowseError>;

/// Errors surfaced by browse operations with user-facing messages
#[derive(Debug, Error)]
pub enum BrowseError {
    #[error("No table or view is currently open")]
    NoOpenObject,

    #[error("Query execution failed: {0}")]
    Execution(#[from] rowscope_core::RowscopeError),
}
