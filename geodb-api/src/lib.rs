//! # geodb API
//!
//! In-memory GeoDatabase model: a GeoDatabase holds FeatureDatasets, which
//! hold FeatureClasses of rows with one resolved geometry type.
//!
//! This crate composes the lower-level crates:
//! - `geodb-spatial` - geometry values and type resolution
//! - `geodb-tabular` - schemas, rows and record sets
//! - `geodb-storage` - the record store boundary and the file store
//! - `geodb-catalog` - dataset discovery from a store's system table
//!
//! ## Quick Start
//!
//! ```ignore
//! use geodb_api::{FeatureDataset, GeoDatabase};
//!
//! let db = GeoDatabase::load("city.gdb")?;
//! for (name, fc) in db.fcs() {
//!     println!("{}: {} rows", name, fc.read().len());
//! }
//!
//! let zoning = FeatureDataset::default();
//! zoning.set("Parcels", parcels)?;
//! db.set("Zoning", zoning)?;
//! db.save("city", true)?;
//! ```

pub mod config;
mod error;
pub mod feature_class;
pub mod feature_dataset;
pub mod geodatabase;
pub mod index;

pub use config::GeoDbConfig;
pub use error::{ApiError, Result};
pub use feature_class::{Description, FeatureClass, RowRef};
pub use feature_dataset::{validate_name, FeatureDataset, SharedFeatureClass};
pub use geodatabase::{Entry, GeoDatabase, GeoDatabaseId, Item};
pub use index::{ColumnRef, Index};

pub use geodb_spatial::{Crs, Geometry, GeometryType};
pub use geodb_storage::{FileRecordStore, RecordStore, WriteOptions};
pub use geodb_tabular::{RecordSet, Row, Schema, Value};
