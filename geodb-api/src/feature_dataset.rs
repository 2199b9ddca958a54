//! FeatureDataset: a named group of feature classes sharing one CRS.
//!
//! Datasets and their classes are shared by handle. A dataset may be linked
//! into several GeoDatabases; each link is recorded on both sides so that
//! name uniqueness can be checked against every database that can reach the
//! dataset.
//!
//! Lock order is database, then dataset, then class. A dataset never holds
//! its own lock while taking a database lock.

use std::fmt;
use std::sync::{Arc, Weak};

use geodb_spatial::Crs;
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::{ApiError, Result};
use crate::feature_class::FeatureClass;
use crate::geodatabase::{DatabaseInner, GeoDatabaseId};

/// Shared handle to a feature class.
pub type SharedFeatureClass = Arc<RwLock<FeatureClass>>;

pub(crate) struct DatasetInner {
    classes: IndexMap<String, SharedFeatureClass>,
    crs: Option<Crs>,
    enforce_crs: bool,
    owners: IndexMap<GeoDatabaseId, Weak<RwLock<DatabaseInner>>>,
}

/// Handle to a feature dataset. Clones share the same dataset.
#[derive(Clone)]
pub struct FeatureDataset {
    inner: Arc<RwLock<DatasetInner>>,
}

impl Default for FeatureDataset {
    fn default() -> Self {
        Self::new(None, true)
    }
}

impl fmt::Debug for FeatureDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("FeatureDataset")
            .field("classes", &inner.classes.keys().collect::<Vec<_>>())
            .field("crs", &inner.crs)
            .field("enforce_crs", &inner.enforce_crs)
            .field("owners", &inner.owners.len())
            .finish()
    }
}

/// Check a class or dataset name: an ASCII letter or underscore, then
/// letters, digits and underscores.
pub fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ApiError::invalid_name(format!(
            "'{}' must start with a letter or underscore and contain only letters, digits and underscores",
            name
        )))
    }
}

impl FeatureDataset {
    /// Create an empty dataset.
    ///
    /// With `enforce_crs` set, every member must share the dataset CRS and
    /// the first member seeds an unset one. Without it the CRS is ignored.
    pub fn new(crs: Option<Crs>, enforce_crs: bool) -> Self {
        Self {
            inner: Arc::new(RwLock::new(DatasetInner {
                classes: IndexMap::new(),
                crs: if enforce_crs { crs } else { None },
                enforce_crs,
                owners: IndexMap::new(),
            })),
        }
    }

    /// True if both handles point at the same dataset.
    pub fn ptr_eq(&self, other: &FeatureDataset) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn crs(&self) -> Option<Crs> {
        self.inner.read().crs.clone()
    }

    pub fn enforce_crs(&self) -> bool {
        self.inner.read().enforce_crs
    }

    pub fn len(&self) -> usize {
        self.inner.read().classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().classes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().classes.contains_key(name)
    }

    /// Member names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.inner.read().classes.keys().cloned().collect()
    }

    /// Member handles in insertion order.
    pub fn classes(&self) -> Vec<SharedFeatureClass> {
        self.inner.read().classes.values().cloned().collect()
    }

    /// Snapshot of the name to class mapping.
    pub fn fc_dict(&self) -> IndexMap<String, SharedFeatureClass> {
        self.inner.read().classes.clone()
    }

    /// `(name, class)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (String, SharedFeatureClass)> {
        self.fc_dict().into_iter()
    }

    /// Databases currently linking this dataset.
    pub fn owners(&self) -> Vec<GeoDatabaseId> {
        self.inner
            .read()
            .owners
            .iter()
            .filter(|(_, db)| db.strong_count() > 0)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn get(&self, name: &str) -> Result<SharedFeatureClass> {
        self.inner
            .read()
            .classes
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("feature class '{}'", name)))
    }

    /// The `i`-th member in insertion order; negative `i` counts from the end.
    pub fn get_index(&self, i: isize) -> Result<(String, SharedFeatureClass)> {
        let inner = self.inner.read();
        let pos = crate::index::single(i, inner.classes.len())?;
        inner
            .classes
            .get_index(pos)
            .map(|(name, fc)| (name.clone(), Arc::clone(fc)))
            .ok_or_else(|| ApiError::invalid_index(format!("position {}", i)))
    }

    /// Add `fc` under `name` and return its shared handle.
    pub fn set(&self, name: &str, fc: FeatureClass) -> Result<SharedFeatureClass> {
        let shared = Arc::new(RwLock::new(fc));
        self.set_shared(name, Arc::clone(&shared))?;
        Ok(shared)
    }

    /// Link an existing class handle under `name`.
    ///
    /// Fails `InvalidName`, `DuplicateName` (the name is used here or in any
    /// dataset of any owning database) or `CrsMismatch`. Nothing changes on
    /// failure.
    pub fn set_shared(&self, name: &str, fc: SharedFeatureClass) -> Result<()> {
        validate_name(name)?;
        if self.reachable_names().iter().any(|n| n == name) {
            return Err(ApiError::duplicate_name(name));
        }
        let fc_crs = fc.read().crs().cloned();

        let mut inner = self.inner.write();
        if inner.classes.contains_key(name) {
            return Err(ApiError::duplicate_name(name));
        }
        if inner.enforce_crs {
            match inner.crs.clone() {
                None => inner.crs = fc_crs,
                Some(crs) if fc_crs.as_ref() != Some(&crs) => {
                    return Err(ApiError::CrsMismatch {
                        expected: Some(crs),
                        found: fc_crs,
                    });
                }
                Some(_) => {}
            }
        }
        inner.classes.insert(name.to_string(), fc);
        tracing::debug!(class = %name, members = inner.classes.len(), "feature class added");
        Ok(())
    }

    /// Remove and return the class called `name`.
    pub fn delete(&self, name: &str) -> Result<SharedFeatureClass> {
        let removed = self.inner.write().classes.shift_remove(name);
        let fc = removed.ok_or_else(|| ApiError::not_found(format!("feature class '{}'", name)))?;
        tracing::debug!(class = %name, "feature class removed");
        Ok(fc)
    }

    /// Class names in every other dataset of every owning database.
    fn reachable_names(&self) -> Vec<String> {
        let owners: Vec<Arc<RwLock<DatabaseInner>>> = self
            .inner
            .read()
            .owners
            .values()
            .filter_map(Weak::upgrade)
            .collect();

        let mut names = Vec::new();
        for db in owners {
            let datasets = db.read().datasets();
            for ds in datasets.iter().filter(|ds| !ds.ptr_eq(self)) {
                names.extend(ds.names());
            }
        }
        names
    }

    pub(crate) fn link_owner(&self, id: GeoDatabaseId, db: Weak<RwLock<DatabaseInner>>) {
        let mut inner = self.inner.write();
        inner.owners.retain(|_, owner| owner.strong_count() > 0);
        inner.owners.insert(id, db);
    }

    pub(crate) fn unlink_owner(&self, id: GeoDatabaseId) {
        self.inner.write().owners.shift_remove(&id);
    }
}
