//! Tabular record types for geodb.
//!
//! This crate provides the row-oriented record model shared by the record
//! store and the FeatureClass container.
//!
//! # Design
//!
//! - **Row storage**: a record set is an ordered `Vec<Row>`; object IDs are
//!   positional and never stored on the row
//! - **Geometry apart from attributes**: every row carries exactly one optional
//!   geometry next to its attribute values
//! - **Ordered schema**: column names in order, with a name lookup

pub mod error;
pub mod record;
pub mod value;

pub use error::{Result, TabularError};
pub use record::{RecordSet, Row, Schema, GEOMETRY_FIELD, OBJECT_ID_FIELD};
pub use value::Value;
