//! Error types for the geodb API

use geodb_catalog::CatalogError;
use geodb_spatial::{Crs, SpatialError};
use geodb_storage::StorageError;
use geodb_tabular::TabularError;
use thiserror::Error;

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Main error type for the geodb API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Geometry parsing and resolution errors
    #[error("Geometry error: {0}")]
    Spatial(#[from] SpatialError),

    /// Schema and record errors
    #[error("Record error: {0}")]
    Tabular(#[from] TabularError),

    /// Record store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Catalog discovery errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Name breaks the naming rules
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Name already in use within the reachable scope
    #[error("Name already in use: {0}")]
    DuplicateName(String),

    /// Incoming rows have a different schema
    #[error("Schemas must match: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Dataset CRS invariant violated
    #[error("CRS mismatch: dataset has {}, feature class has {}", display_crs(.expected), display_crs(.found))]
    CrsMismatch {
        expected: Option<Crs>,
        found: Option<Crs>,
    },

    /// Bad row, column or index shape
    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    /// Missing dataset, class or store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),
}

fn display_crs(crs: &Option<Crs>) -> String {
    crs.as_ref()
        .map_or_else(|| "no CRS".to_string(), ToString::to_string)
}

impl ApiError {
    /// Create an invalid name error
    pub fn invalid_name(msg: impl Into<String>) -> Self {
        ApiError::InvalidName(msg.into())
    }

    /// Create a duplicate name error
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        ApiError::DuplicateName(name.into())
    }

    /// Create an invalid index error
    pub fn invalid_index(msg: impl Into<String>) -> Self {
        ApiError::InvalidIndex(msg.into())
    }

    /// Create a not found error
    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        ApiError::Config(msg.into())
    }

    /// Stable error code, shared by wrapped errors of the same kind.
    ///
    /// A missing table surfaces as `err:geodb/NotFound` whether it came from
    /// the store, the catalog or the container layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_)
            | ApiError::Storage(StorageError::NotFound(_))
            | ApiError::Catalog(CatalogError::NotFound(_))
            | ApiError::Catalog(CatalogError::Storage(StorageError::NotFound(_))) => {
                "err:geodb/NotFound"
            }
            ApiError::Storage(StorageError::InvalidStore(_))
            | ApiError::Catalog(CatalogError::InvalidStore(_))
            | ApiError::Catalog(CatalogError::Storage(StorageError::InvalidStore(_))) => {
                "err:geodb/InvalidStore"
            }
            ApiError::Storage(StorageError::AlreadyExists(_)) => "err:geodb/AlreadyExists",
            ApiError::InvalidName(_) | ApiError::Storage(StorageError::InvalidTableName(_)) => {
                "err:geodb/InvalidName"
            }
            ApiError::DuplicateName(_) => "err:geodb/DuplicateName",
            ApiError::SchemaMismatch { .. } | ApiError::Tabular(TabularError::SchemaMismatch { .. }) => {
                "err:geodb/SchemaMismatch"
            }
            ApiError::Spatial(SpatialError::IncompatibleGeometry(_))
            | ApiError::Storage(StorageError::Spatial(SpatialError::IncompatibleGeometry(_))) => {
                "err:geodb/IncompatibleGeometry"
            }
            ApiError::Spatial(SpatialError::UnsupportedGeometry(_))
            | ApiError::Storage(StorageError::Spatial(SpatialError::UnsupportedGeometry(_))) => {
                "err:geodb/UnsupportedGeometry"
            }
            ApiError::CrsMismatch { .. } => "err:geodb/CrsMismatch",
            ApiError::InvalidIndex(_) | ApiError::Tabular(TabularError::ColumnNotFound(_)) => {
                "err:geodb/InvalidIndex"
            }
            ApiError::Catalog(CatalogError::Parse(_))
            | ApiError::Spatial(SpatialError::WktParse(_))
            | ApiError::Storage(StorageError::Spatial(SpatialError::WktParse(_))) => {
                "err:geodb/ParseError"
            }
            ApiError::Config(_) => "err:geodb/Config",
            _ => "err:geodb/Internal",
        }
    }
}
