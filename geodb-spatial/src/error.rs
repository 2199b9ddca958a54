//! Error types for geometry handling.

use thiserror::Error;

use crate::geometry::GeometryType;

/// Geometry and CRS errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpatialError {
    /// WKT parsing error.
    #[error("WKT parse error: {0}")]
    WktParse(String),

    /// The collection mixes geometry types that cannot be unified.
    #[error("Incompatible geometry types: {0}")]
    IncompatibleGeometry(String),

    /// The collection holds a geometry type that cannot be stored at all.
    #[error("Unsupported geometry type: {0}")]
    UnsupportedGeometry(GeometryType),

    /// CRS identifier could not be interpreted.
    #[error("Invalid CRS: {0}")]
    InvalidCrs(String),
}

impl SpatialError {
    /// Create an incompatible geometry error from the offending type set.
    pub fn incompatible<'a>(types: impl IntoIterator<Item = &'a GeometryType>) -> Self {
        let names: Vec<&str> = types.into_iter().map(|t| t.as_str()).collect();
        Self::IncompatibleGeometry(names.join(", "))
    }
}

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, SpatialError>;
