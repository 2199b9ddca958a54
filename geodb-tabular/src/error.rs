//! Error types for tabular operations.

use thiserror::Error;

/// Errors from schema and record-set operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TabularError {
    /// Structural error (duplicate or reserved column, value count mismatch, etc.)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Two schemas differ in column names or order.
    #[error("Schema mismatch: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Column lookup by name failed.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

/// Result type for tabular operations.
pub type Result<T> = std::result::Result<T, TabularError>;
