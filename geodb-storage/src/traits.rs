//! The record store boundary.
//!
//! A record store lists, reads, writes and deletes named tables inside a
//! store directory. The container layer talks to storage only through
//! [`RecordStore`], so alternative backends can be swapped in.

use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use geodb_spatial::GeometryType;
use geodb_tabular::RecordSet;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Options for [`RecordStore::write_table`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Feature dataset the table is filed under; `None` for the store root.
    pub feature_dataset: Option<String>,

    /// Declared geometry type; derived from the rows when absent.
    pub geometry_type: Option<GeometryType>,

    /// Replace an existing table of the same name.
    pub overwrite: bool,

    /// Write in the format older readers understand.
    /// Default: true
    pub compatibility: bool,

    /// Rebuild the spatial index after writing.
    pub reindex: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            feature_dataset: None,
            geometry_type: None,
            overwrite: false,
            compatibility: true,
            reindex: false,
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature_dataset(mut self, dataset: Option<String>) -> Self {
        self.feature_dataset = dataset;
        self
    }

    pub fn with_geometry_type(mut self, geometry_type: GeometryType) -> Self {
        self.geometry_type = Some(geometry_type);
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_compatibility(mut self, compatibility: bool) -> Self {
        self.compatibility = compatibility;
        self
    }

    pub fn with_reindex(mut self, reindex: bool) -> Self {
        self.reindex = reindex;
        self
    }
}

/// Table-level access to a store directory.
pub trait RecordStore: Debug + Send + Sync {
    /// Ensure an empty, discoverable store exists at `store`.
    fn create_store(&self, store: &Path) -> Result<()>;

    /// Names of every table in the store.
    ///
    /// Fails `NotFound` for a missing path and `InvalidStore` for a path that
    /// is not a directory; an empty store yields an empty list.
    fn list_layers(&self, store: &Path) -> Result<Vec<String>>;

    /// Read one table as a record set.
    fn read_table(&self, store: &Path, name: &str) -> Result<RecordSet>;

    /// Write `records` as table `name`, creating the store if needed.
    fn write_table(
        &self,
        records: &RecordSet,
        store: &Path,
        name: &str,
        options: &WriteOptions,
    ) -> Result<()>;

    /// Delete table `name`. Returns `false` if it did not exist.
    fn delete_table(&self, store: &Path, name: &str) -> Result<bool>;
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn create_store(&self, store: &Path) -> Result<()> {
        (**self).create_store(store)
    }

    fn list_layers(&self, store: &Path) -> Result<Vec<String>> {
        (**self).list_layers(store)
    }

    fn read_table(&self, store: &Path, name: &str) -> Result<RecordSet> {
        (**self).read_table(store, name)
    }

    fn write_table(
        &self,
        records: &RecordSet,
        store: &Path,
        name: &str,
        options: &WriteOptions,
    ) -> Result<()> {
        (**self).write_table(records, store, name, options)
    }

    fn delete_table(&self, store: &Path, name: &str) -> Result<bool> {
        (**self).delete_table(store, name)
    }
}
