//! Error types for catalog discovery

use geodb_storage::StorageError;
use thiserror::Error;

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur while scanning a store's catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Store path does not exist
    #[error("Store not found: {0}")]
    NotFound(String),

    /// Path is not a directory or has no system table
    #[error("Invalid store: {0}")]
    InvalidStore(String),

    /// A metadata fragment could not be parsed
    #[error("Metadata parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
