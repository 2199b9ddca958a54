//! Catalog discovery for geodb stores.
//!
//! A store's hierarchy (feature datasets, the classes inside them, rasters)
//! is not kept in the table files themselves. It is recovered by scanning
//! the store's system table for catalog paths, combined with the layer
//! listing from a [`RecordStore`].
//!
//! # Example
//!
//! ```ignore
//! use geodb_catalog::{CatalogConfig, CatalogIndex};
//! use geodb_storage::FileRecordStore;
//!
//! let store = FileRecordStore::default();
//! let catalog = CatalogIndex::open("city.gdb", &store, CatalogConfig::default())?;
//! for (dataset, tables) in catalog.list_datasets()? {
//!     println!("{:?}: {:?}", dataset, tables);
//! }
//! ```

pub mod config;
pub mod error;
pub mod info;
pub mod scan;

use std::path::{Path, PathBuf};

use geodb_storage::RecordStore;

pub use config::{CatalogConfig, DEFAULT_ROOT_ELEMENTS};
pub use error::{CatalogError, Result};
pub use info::{normalize_root_name, CatalogInfo};
pub use scan::DatasetMap;

/// A snapshot of one store's catalog.
///
/// The system table is read once on open; the layer listing is asked of the
/// record store on each call.
pub struct CatalogIndex<'a> {
    path: PathBuf,
    store: &'a dyn RecordStore,
    config: CatalogConfig,
    system_table: Vec<u8>,
}

impl std::fmt::Debug for CatalogIndex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogIndex")
            .field("path", &self.path)
            .field("store", &self.store)
            .field("system_table_bytes", &self.system_table.len())
            .finish()
    }
}

impl<'a> CatalogIndex<'a> {
    /// Open the catalog of the store at `path`.
    pub fn open(
        path: impl AsRef<Path>,
        store: &'a dyn RecordStore,
        config: CatalogConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(CatalogError::NotFound(path.display().to_string()));
        }
        if !path.is_dir() {
            return Err(CatalogError::InvalidStore(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let system_path = path.join(&config.system_file_name);
        if !system_path.is_file() {
            return Err(CatalogError::InvalidStore(format!(
                "{} has no system table {}",
                path.display(),
                config.system_file_name
            )));
        }
        let system_table = std::fs::read(&system_path)?;
        tracing::debug!(
            store = %path.display(),
            bytes = system_table.len(),
            "catalog opened"
        );

        Ok(Self {
            path,
            store,
            config,
            system_table,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Every table in the store.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.store.list_layers(&self.path)?)
    }

    /// Feature datasets and their tables; tables outside any dataset are
    /// listed under `None`.
    pub fn list_datasets(&self) -> Result<DatasetMap> {
        let _span = tracing::debug_span!("list_datasets", store = %self.path.display()).entered();
        let tables = self.list_tables()?;
        let paths = scan::dataset_paths(&self.system_table);
        let datasets = scan::fold_datasets(&paths, tables);
        tracing::debug!(datasets = datasets.len(), "datasets listed");
        Ok(datasets)
    }

    /// Root items that are neither tables nor feature datasets.
    pub fn list_rasters(&self) -> Result<Vec<String>> {
        let _span = tracing::debug_span!("list_rasters", store = %self.path.display()).entered();
        let tables = self.list_tables()?;
        let datasets = scan::fold_datasets(&scan::dataset_paths(&self.system_table), tables.clone());
        let root = scan::root_paths(&self.system_table);
        let rasters = scan::rasters(root, &tables, &datasets);
        tracing::debug!(rasters = rasters.len(), "rasters listed");
        Ok(rasters)
    }

    /// Parsed definition and documentation fragments, grouped by kind.
    pub fn get_info(&self) -> Result<CatalogInfo> {
        let _span = tracing::debug_span!("get_info", store = %self.path.display()).entered();
        info::collect_info(
            &self.system_table,
            &self.config.root_elements,
            self.config.strict_metadata,
        )
    }
}
