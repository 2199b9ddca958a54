//! GeoDatabase: the top-level container.
//!
//! A GeoDatabase maps dataset names to [`FeatureDataset`] handles. Classes
//! outside any named dataset live in the root dataset, keyed `None`, which
//! is created on first use. Feature class names are unique across every
//! dataset a database can reach.
//!
//! Linking a dataset records the database in the dataset's owner set, and
//! unlinking removes it, in the same call. The owner set holds weak
//! references, so a dropped database stops counting as an owner.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use geodb_catalog::CatalogIndex;
use geodb_storage::{FileRecordStore, RecordStore, WriteOptions};
use indexmap::IndexMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::config::GeoDbConfig;
use crate::error::{ApiError, Result};
use crate::feature_class::FeatureClass;
use crate::feature_dataset::{validate_name, FeatureDataset, SharedFeatureClass};

/// Process-unique identity of a GeoDatabase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeoDatabaseId(Uuid);

impl GeoDatabaseId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for GeoDatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) struct DatabaseInner {
    datasets: IndexMap<Option<String>, FeatureDataset>,
}

impl DatabaseInner {
    /// Handles of every linked dataset.
    pub(crate) fn datasets(&self) -> Vec<FeatureDataset> {
        self.datasets.values().cloned().collect()
    }
}

/// Value accepted by [`GeoDatabase::set`].
#[derive(Debug, Clone)]
pub enum Entry {
    /// A class to place in the root dataset.
    Class(FeatureClass),
    /// A class handle to link into the root dataset.
    SharedClass(SharedFeatureClass),
    /// A dataset to link under the given name.
    Dataset(FeatureDataset),
}

impl From<FeatureClass> for Entry {
    fn from(fc: FeatureClass) -> Self {
        Entry::Class(fc)
    }
}

impl From<SharedFeatureClass> for Entry {
    fn from(fc: SharedFeatureClass) -> Self {
        Entry::SharedClass(fc)
    }
}

impl From<FeatureDataset> for Entry {
    fn from(ds: FeatureDataset) -> Self {
        Entry::Dataset(ds)
    }
}

/// Value returned by [`GeoDatabase::get`].
#[derive(Debug, Clone)]
pub enum Item {
    Dataset(FeatureDataset),
    Class(SharedFeatureClass),
}

/// The top-level container of datasets and feature classes.
pub struct GeoDatabase {
    id: GeoDatabaseId,
    inner: Arc<RwLock<DatabaseInner>>,
    store: Arc<dyn RecordStore>,
    config: GeoDbConfig,
}

impl fmt::Debug for GeoDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoDatabase")
            .field("id", &self.id)
            .field("datasets", &self.fds_names())
            .field("store", &self.store)
            .finish()
    }
}

impl PartialEq for GeoDatabase {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GeoDatabase {}

impl Hash for GeoDatabase {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Default for GeoDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GeoDatabase {
    fn drop(&mut self) {
        let datasets = self.inner.read().datasets();
        for ds in datasets {
            ds.unlink_owner(self.id);
        }
    }
}

impl GeoDatabase {
    /// An empty database backed by the default file store.
    pub fn new() -> Self {
        Self::with_config(GeoDbConfig::default())
    }

    /// An empty database backed by a file store built from `config`.
    pub fn with_config(config: GeoDbConfig) -> Self {
        let store = Arc::new(FileRecordStore::new(config.store.clone()));
        Self::with_store(store, config)
    }

    /// An empty database backed by `store`.
    pub fn with_store(store: Arc<dyn RecordStore>, config: GeoDbConfig) -> Self {
        Self {
            id: GeoDatabaseId::new(),
            inner: Arc::new(RwLock::new(DatabaseInner {
                datasets: IndexMap::new(),
            })),
            store,
            config,
        }
    }

    /// Open the store at `path` with the default file store and config.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = GeoDbConfig::default();
        let store = Arc::new(FileRecordStore::new(config.store.clone()));
        Self::open(path, store, config)
    }

    /// Build a database from the store at `path`.
    ///
    /// The catalog decides which dataset each table belongs to; every table
    /// is then read through `store`. The root dataset never enforces CRS,
    /// named datasets follow `config.enforce_crs`.
    pub fn open(
        path: impl AsRef<Path>,
        store: Arc<dyn RecordStore>,
        config: GeoDbConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let _span = tracing::debug_span!("geodatabase_open", path = %path.display()).entered();
        config.validate()?;

        let db = Self::with_store(store, config);
        let buckets = {
            let catalog = CatalogIndex::open(path, db.store.as_ref(), db.config.catalog.clone())?;
            catalog.list_datasets()?
        };

        for (name, tables) in buckets {
            let enforce = name.is_some() && db.config.enforce_crs;
            let ds = FeatureDataset::new(None, enforce);
            for table in &tables {
                let fc = FeatureClass::load(db.store.as_ref(), path, table)?;
                ds.set(table, fc)?;
            }
            db.set_dataset(name.as_deref(), ds)?;
        }

        tracing::info!(
            path = %path.display(),
            datasets = db.inner.read().datasets.len(),
            classes = db.len(),
            "geodatabase opened"
        );
        Ok(db)
    }

    pub fn id(&self) -> GeoDatabaseId {
        self.id
    }

    pub fn config(&self) -> &GeoDbConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Add a class to the root dataset, or link a dataset under `name`.
    pub fn set(&self, name: &str, entry: impl Into<Entry>) -> Result<()> {
        match entry.into() {
            Entry::Class(fc) => self.set_root_class(name, Arc::new(RwLock::new(fc))),
            Entry::SharedClass(fc) => self.set_root_class(name, fc),
            Entry::Dataset(ds) => self.set_dataset(Some(name), ds),
        }
    }

    fn set_root_class(&self, name: &str, fc: SharedFeatureClass) -> Result<()> {
        let existing = self.inner.read().datasets.get(&None).cloned();
        let (root, created) = match existing {
            Some(root) => (root, false),
            None => {
                let root = FeatureDataset::new(None, false);
                self.set_dataset(None, root.clone())?;
                (root, true)
            }
        };

        match root.set_shared(name, fc) {
            Ok(()) => Ok(()),
            Err(e) => {
                if created {
                    self.delete(None)?;
                }
                Err(e)
            }
        }
    }

    /// Link `ds` under `name`; `None` is the root dataset.
    ///
    /// Fails `DuplicateName` if the key is taken, the dataset is already
    /// linked here, or one of its classes shares a name with a class this
    /// database can already reach.
    pub fn set_dataset(&self, name: Option<&str>, ds: FeatureDataset) -> Result<()> {
        if let Some(name) = name {
            validate_name(name)?;
        }
        let key = name.map(str::to_string);
        let incoming = ds.names();

        let mut inner = self.inner.write();
        if inner.datasets.contains_key(&key) {
            return Err(ApiError::duplicate_name(name.unwrap_or("<root>")));
        }
        for existing in inner.datasets.values() {
            if existing.ptr_eq(&ds) {
                return Err(ApiError::duplicate_name(format!(
                    "dataset already linked as {}",
                    name.unwrap_or("<root>")
                )));
            }
            if let Some(clash) = existing.names().into_iter().find(|n| incoming.contains(n)) {
                return Err(ApiError::duplicate_name(clash));
            }
        }

        ds.link_owner(self.id, Arc::downgrade(&self.inner));
        inner.datasets.insert(key, ds);
        tracing::debug!(
            dataset = name.unwrap_or("<root>"),
            classes = incoming.len(),
            "feature dataset linked"
        );
        Ok(())
    }

    /// Unlink the dataset called `name` and return it. The dataset stays
    /// alive for any other database that links it.
    pub fn delete(&self, name: Option<&str>) -> Result<FeatureDataset> {
        let key = name.map(str::to_string);
        let mut inner = self.inner.write();
        let ds = inner
            .datasets
            .shift_remove(&key)
            .ok_or_else(|| ApiError::not_found(format!("dataset '{}'", name.unwrap_or("<root>"))))?;
        ds.unlink_owner(self.id);
        tracing::debug!(dataset = name.unwrap_or("<root>"), "feature dataset unlinked");
        Ok(ds)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// A dataset by name, else a class by name across all datasets.
    pub fn get(&self, name: &str) -> Result<Item> {
        if let Some(ds) = self.inner.read().datasets.get(&Some(name.to_string())) {
            return Ok(Item::Dataset(ds.clone()));
        }
        self.class(name).map(Item::Class)
    }

    /// The dataset under `name`; `None` is the root dataset.
    pub fn dataset(&self, name: Option<&str>) -> Result<FeatureDataset> {
        self.inner
            .read()
            .datasets
            .get(&name.map(str::to_string))
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("dataset '{}'", name.unwrap_or("<root>"))))
    }

    /// A class by name across all datasets.
    pub fn class(&self, name: &str) -> Result<SharedFeatureClass> {
        self.fcs()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, fc)| fc)
            .ok_or_else(|| ApiError::not_found(format!("feature class '{}'", name)))
    }

    /// The `i`-th class across datasets in order; negative `i` counts from the end.
    pub fn get_index(&self, i: isize) -> Result<(String, SharedFeatureClass)> {
        let mut fcs = self.fcs();
        let pos = crate::index::single(i, fcs.len())?;
        Ok(fcs.swap_remove(pos))
    }

    /// Number of feature classes across all datasets.
    pub fn len(&self) -> usize {
        self.inner.read().datasets.values().map(FeatureDataset::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(name, class)` pairs across datasets, in dataset then insertion order.
    pub fn fcs(&self) -> Vec<(String, SharedFeatureClass)> {
        self.fds().iter().flat_map(FeatureDataset::iter).collect()
    }

    pub fn fc_names(&self) -> Vec<String> {
        self.fcs().into_iter().map(|(name, _)| name).collect()
    }

    pub fn fc_dict(&self) -> IndexMap<String, SharedFeatureClass> {
        self.fcs().into_iter().collect()
    }

    pub fn fds_names(&self) -> Vec<Option<String>> {
        self.inner.read().datasets.keys().cloned().collect()
    }

    pub fn fds(&self) -> Vec<FeatureDataset> {
        self.inner.read().datasets()
    }

    pub fn fds_dict(&self) -> IndexMap<Option<String>, FeatureDataset> {
        self.inner.read().datasets.clone()
    }

    /// `(dataset name, dataset)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Option<String>, FeatureDataset)> {
        self.fds_dict().into_iter()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write every class to the store at `path` and mark them saved.
    ///
    /// The configured suffix (`.gdb`) is appended when missing. With
    /// `overwrite`, an existing store at the path is removed first. Returns
    /// the store path actually written.
    pub fn save(&self, path: impl AsRef<Path>, overwrite: bool) -> Result<PathBuf> {
        let path = with_suffix(path.as_ref(), &self.config.store_suffix);
        let _span = tracing::debug_span!("geodatabase_save", path = %path.display()).entered();

        if overwrite && path.exists() {
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
            tracing::debug!(path = %path.display(), "existing store removed");
        }
        self.store.create_store(&path)?;

        let mut written = 0usize;
        for (dataset, ds) in self.fds_dict() {
            for (name, fc) in ds.iter() {
                let options = WriteOptions::new()
                    .with_feature_dataset(dataset.clone())
                    .with_overwrite(overwrite)
                    .with_compatibility(self.config.compatibility)
                    .with_reindex(self.config.reindex);
                fc.write().save(self.store.as_ref(), &path, &name, &options)?;
                written += 1;
            }
        }

        tracing::info!(path = %path.display(), classes = written, "geodatabase saved");
        Ok(path)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    if suffix.is_empty() || path.as_os_str().to_string_lossy().ends_with(suffix) {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
