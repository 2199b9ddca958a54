//! Error types for the storage crate

use geodb_spatial::SpatialError;
use geodb_tabular::TabularError;
use thiserror::Error;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Store or table does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Path exists but is not a usable store
    #[error("Invalid store: {0}")]
    InvalidStore(String),

    /// Table name cannot be mapped to a file inside the store
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    /// Table exists and overwrite was not requested
    #[error("Table already exists: {0}")]
    AlreadyExists(String),

    /// Table file is readable but its contents are inconsistent
    #[error("Corrupt table file: {0}")]
    Corrupt(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Spatial(#[from] SpatialError),

    #[error(transparent)]
    Tabular(#[from] TabularError),
}

impl StorageError {
    /// Create a not found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an invalid store error
    pub fn invalid_store(msg: impl Into<String>) -> Self {
        Self::InvalidStore(msg.into())
    }

    /// Create an invalid table name error
    pub fn invalid_table_name(name: impl Into<String>) -> Self {
        Self::InvalidTableName(name.into())
    }

    /// Create an already exists error
    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists(name.into())
    }

    /// Create a corrupt table error
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}
