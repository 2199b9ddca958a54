//! Geometry primitives for geodb.
//!
//! This crate provides the geometry layer shared by the table, storage and
//! container crates:
//!
//! - **Geometry values** with an explicit linear-ring variant
//! - **WKT** parsing and formatting
//! - **CRS** identifiers with normalized equality
//! - **Geometry-type resolution**: collapsing a mixed collection to one
//!   canonical type, promoting simple geometries to their multi form
//!
//! # Modules
//!
//! - [`geometry`]: `Geometry`, `GeometryType`, `BBox`, WKT helpers
//! - [`crs`]: coordinate reference system identifiers
//! - [`resolve`]: the resolution policy
//! - [`error`]: error types

pub mod crs;
pub mod error;
pub mod geometry;
pub mod resolve;

pub use crs::Crs;
pub use error::{Result, SpatialError};
pub use geometry::{parse_wkt, BBox, Geometry, GeometryType};
pub use resolve::{resolve, unify};
