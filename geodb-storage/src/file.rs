//! File-backed record store.
//!
//! A store is a directory. Each table lives in its own JSON file:
//! - `{store}/{name}.gdbtable.json` - schema, CRS, dataset and rows
//! - `{store}/a00000004.gdbtable` - catalog system table, regenerated from
//!   the table files after every write or delete
//!
//! Object IDs are written 1-based and dense; on read they are discarded and
//! rows keep their file order.

use std::fs;
use std::path::{Path, PathBuf};

use geodb_spatial::resolve::{distinct_types, target_type};
use geodb_spatial::{Crs, Geometry, GeometryType};
use geodb_tabular::{RecordSet, Row, Schema, Value};
use serde::{Deserialize, Serialize};

use crate::config::FileStoreConfig;
use crate::error::{Result, StorageError};
use crate::system_table::{self, CatalogItem};
use crate::traits::{RecordStore, WriteOptions};

/// Record store over a directory of JSON table files.
#[derive(Debug, Clone, Default)]
pub struct FileRecordStore {
    config: FileStoreConfig,
}

/// Layer creation options persisted with the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct LayerOptions {
    #[serde(rename = "TARGET_ARCGIS_VERSION", default)]
    compatibility: bool,

    #[serde(rename = "OPENFILEGDB_IN_MEMORY_SPI", default)]
    reindex: bool,
}

/// JSON structure of a table file
#[derive(Debug, Serialize, Deserialize)]
struct TableFile {
    name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_dataset: Option<String>,

    geometry_type: GeometryType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    crs: Option<Crs>,

    fields: Schema,

    #[serde(default)]
    layer_options: LayerOptions,

    features: Vec<FeatureRecord>,
}

/// Table file without its features, for catalog regeneration.
#[derive(Debug, Deserialize)]
struct TableHeader {
    name: String,

    #[serde(default)]
    feature_dataset: Option<String>,

    geometry_type: GeometryType,

    #[serde(default)]
    crs: Option<Crs>,

    fields: Schema,
}

#[derive(Debug, Serialize, Deserialize)]
struct FeatureRecord {
    #[serde(rename = "ObjectID")]
    object_id: u64,

    attributes: Vec<Value>,

    /// WKT text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    geometry: Option<String>,
}

impl FileRecordStore {
    pub fn new(config: FileStoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FileStoreConfig {
        &self.config
    }

    fn table_path(&self, store: &Path, name: &str) -> PathBuf {
        store.join(self.config.table_file_name(name))
    }

    /// Path to the system table of `store`.
    pub fn system_file_path(&self, store: &Path) -> PathBuf {
        store.join(&self.config.system_file_name)
    }

    /// Fail unless `store` is an existing directory.
    fn check_store(store: &Path) -> Result<()> {
        if !store.exists() {
            return Err(StorageError::not_found(store.display().to_string()));
        }
        if !store.is_dir() {
            return Err(StorageError::invalid_store(format!(
                "{} is not a directory",
                store.display()
            )));
        }
        Ok(())
    }

    /// Create `store` if missing; fail if it exists as a non-directory.
    /// A table name must be a single path component.
    fn check_table_name(name: &str) -> Result<()> {
        let escapes = name.is_empty()
            || name == "."
            || name.contains("..")
            || name.contains(['/', '\\'])
            || Path::new(name).is_absolute();
        if escapes {
            return Err(StorageError::invalid_table_name(name));
        }
        Ok(())
    }

    fn ensure_store_dir(store: &Path) -> Result<()> {
        if store.exists() && !store.is_dir() {
            return Err(StorageError::invalid_store(format!(
                "{} is not a directory",
                store.display()
            )));
        }
        fs::create_dir_all(store)?;
        Ok(())
    }

    fn read_header(&self, store: &Path, name: &str) -> Result<TableHeader> {
        let content = fs::read_to_string(self.table_path(store, name))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write JSON to a temp file, then rename over the target.
    fn write_json_atomic<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let content = if self.config.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &content)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Regenerate the system table from the table files in `store`.
    ///
    /// Items are ordered: workspace, then each feature dataset followed by
    /// its tables, then the tables at the store root.
    fn rebuild_system_table(&self, store: &Path) -> Result<()> {
        let _span = tracing::debug_span!("rebuild_system_table", store = %store.display()).entered();

        let mut datasets: Vec<(String, Option<Crs>, Vec<CatalogItem>)> = Vec::new();
        let mut root_tables = Vec::new();

        for name in self.list_layers(store)? {
            let header = match self.read_header(store, &name) {
                Ok(header) => header,
                Err(e) => {
                    tracing::warn!(table = %name, error = %e, "skipping unreadable table file");
                    continue;
                }
            };

            let item = CatalogItem::table(
                header.name,
                header.feature_dataset.clone(),
                Some(header.geometry_type),
                header.crs.clone(),
                header.fields.into(),
            );

            match header.feature_dataset {
                Some(dataset) => match datasets.iter_mut().find(|(n, _, _)| *n == dataset) {
                    Some((_, _, items)) => items.push(item),
                    None => datasets.push((dataset, header.crs, vec![item])),
                },
                None => root_tables.push(item),
            }
        }

        let mut items = vec![CatalogItem::workspace()];
        for (dataset, crs, tables) in datasets {
            items.push(CatalogItem::feature_dataset(dataset, crs));
            items.extend(tables);
        }
        items.extend(root_tables);

        let bytes = system_table::encode(&items);
        tracing::debug!(items = items.len(), bytes = bytes.len(), "system table written");
        fs::write(self.system_file_path(store), bytes)?;
        Ok(())
    }
}

/// Geometry type recorded for a table: the explicit option, then the record
/// set's declared type, then whatever the rows resolve to.
fn declared_geometry_type(records: &RecordSet, options: &WriteOptions) -> Result<GeometryType> {
    if let Some(ty) = options.geometry_type.or(records.geometry_type()) {
        return Ok(ty);
    }
    if records.is_empty() {
        return Ok(GeometryType::None);
    }
    let distinct = distinct_types(&records.geometries());
    if distinct.is_empty() {
        return Ok(GeometryType::Unknown);
    }
    Ok(target_type(&distinct)?)
}

impl RecordStore for FileRecordStore {
    fn create_store(&self, store: &Path) -> Result<()> {
        Self::ensure_store_dir(store)?;
        if !self.system_file_path(store).exists() {
            self.rebuild_system_table(store)?;
        }
        Ok(())
    }

    fn list_layers(&self, store: &Path) -> Result<Vec<String>> {
        Self::check_store(store)?;

        let entries = match fs::read_dir(store) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(store = %store.display(), error = %e, "store is not readable");
                return Ok(Vec::new());
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                let file_name = entry.file_name().into_string().ok()?;
                self.config.table_name(&file_name).map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn read_table(&self, store: &Path, name: &str) -> Result<RecordSet> {
        let _span = tracing::debug_span!("read_table", table = name).entered();
        Self::check_table_name(name)?;
        Self::check_store(store)?;

        let path = self.table_path(store, name);
        if !path.is_file() {
            return Err(StorageError::not_found(format!(
                "table {} in {}",
                name,
                store.display()
            )));
        }

        let content = fs::read_to_string(&path)?;
        let file: TableFile = serde_json::from_str(&content)?;

        let mut records = RecordSet::empty(file.fields)
            .with_crs(file.crs)
            .with_geometry_type(Some(file.geometry_type));
        for feature in file.features {
            let geometry = feature
                .geometry
                .as_deref()
                .map(Geometry::from_wkt)
                .transpose()?;
            records.push(Row::new(feature.attributes, geometry))?;
        }

        tracing::debug!(rows = records.len(), "table read");
        Ok(records)
    }

    fn write_table(
        &self,
        records: &RecordSet,
        store: &Path,
        name: &str,
        options: &WriteOptions,
    ) -> Result<()> {
        let _span = tracing::debug_span!(
            "write_table",
            table = name,
            dataset = options.feature_dataset.as_deref().unwrap_or(""),
            rows = records.len()
        )
        .entered();

        Self::check_table_name(name)?;
        Self::ensure_store_dir(store)?;

        let path = self.table_path(store, name);
        if path.exists() && !options.overwrite {
            return Err(StorageError::already_exists(name));
        }

        let file = TableFile {
            name: name.to_string(),
            feature_dataset: options.feature_dataset.clone(),
            geometry_type: declared_geometry_type(records, options)?,
            crs: records.crs().cloned(),
            fields: records.schema().clone(),
            layer_options: LayerOptions {
                compatibility: options.compatibility,
                reindex: options.reindex,
            },
            features: records
                .rows()
                .iter()
                .enumerate()
                .map(|(i, row)| FeatureRecord {
                    object_id: i as u64 + 1,
                    attributes: row.values.clone(),
                    geometry: row.geometry.as_ref().map(Geometry::to_wkt),
                })
                .collect(),
        };

        self.write_json_atomic(&path, &file)?;
        self.rebuild_system_table(store)?;
        tracing::debug!(geometry_type = %file.geometry_type, "table written");
        Ok(())
    }

    fn delete_table(&self, store: &Path, name: &str) -> Result<bool> {
        Self::check_table_name(name)?;
        Self::check_store(store)?;

        let path = self.table_path(store, name);
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        self.rebuild_system_table(store)?;
        tracing::debug!(table = name, "table deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{point, polygon};
    use tempfile::TempDir;

    fn parcels() -> RecordSet {
        let schema = Schema::new(["apn", "zone"]).unwrap();
        let rows = vec![
            Row::new(
                vec!["001".into(), "R1".into()],
                Some(Geometry::Polygon(polygon![
                    (x: 0., y: 0.),
                    (x: 1., y: 0.),
                    (x: 1., y: 1.),
                ])),
            ),
            Row::new(vec!["002".into(), Value::Null], None),
        ];
        RecordSet::new(schema, rows)
            .unwrap()
            .with_crs(Some(Crs::Srid(2227)))
    }

    #[test]
    fn test_write_then_read() {
        let tmp = TempDir::new().unwrap();
        let store_path = tmp.path().join("city.gdb");
        let store = FileRecordStore::default();

        store
            .write_table(&parcels(), &store_path, "Parcels", &WriteOptions::default())
            .unwrap();

        let back = store.read_table(&store_path, "Parcels").unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.schema(), parcels().schema());
        assert_eq!(back.crs(), Some(&Crs::Srid(2227)));
        assert_eq!(back.geometry_type(), Some(GeometryType::Polygon));
        assert_eq!(back.rows()[1].geometry, None);
        assert!(store.system_file_path(&store_path).is_file());
    }

    #[test]
    fn test_object_ids_are_one_based() {
        let tmp = TempDir::new().unwrap();
        let store = FileRecordStore::default();
        store
            .write_table(&parcels(), tmp.path(), "Parcels", &WriteOptions::default())
            .unwrap();

        let content = fs::read_to_string(tmp.path().join("Parcels.gdbtable.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["features"][0]["ObjectID"], 1);
        assert_eq!(json["features"][1]["ObjectID"], 2);
        assert_eq!(json["layer_options"]["TARGET_ARCGIS_VERSION"], true);
    }

    #[test]
    fn test_write_twice_requires_overwrite() {
        let tmp = TempDir::new().unwrap();
        let store = FileRecordStore::default();
        let opts = WriteOptions::default();
        store.write_table(&parcels(), tmp.path(), "Parcels", &opts).unwrap();

        let err = store
            .write_table(&parcels(), tmp.path(), "Parcels", &opts)
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        let mut one = RecordSet::empty(Schema::new(["apn", "zone"]).unwrap());
        one.push(Row::new(vec!["009".into(), "C2".into()], None)).unwrap();
        store
            .write_table(&one, tmp.path(), "Parcels", &opts.with_overwrite(true))
            .unwrap();
        assert_eq!(store.read_table(tmp.path(), "Parcels").unwrap().len(), 1);
    }

    #[test]
    fn test_list_layers_errors() {
        let tmp = TempDir::new().unwrap();
        let store = FileRecordStore::default();

        assert!(store.list_layers(tmp.path()).unwrap().is_empty());
        assert!(matches!(
            store.list_layers(&tmp.path().join("missing")),
            Err(StorageError::NotFound(_))
        ));

        let file = tmp.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            store.list_layers(&file),
            Err(StorageError::InvalidStore(_))
        ));
        assert!(matches!(
            store.write_table(&parcels(), &file, "Parcels", &WriteOptions::default()),
            Err(StorageError::InvalidStore(_))
        ));
    }

    #[test]
    fn test_table_names_stay_inside_store() {
        let tmp = TempDir::new().unwrap();
        let store_dir = tmp.path().join("inner.gdb");
        let store = FileRecordStore::default();
        let opts = WriteOptions::default();

        for name in ["../escaped", "a/b", "a\\b", "..", ""] {
            assert!(
                matches!(
                    store.write_table(&parcels(), &store_dir, name, &opts),
                    Err(StorageError::InvalidTableName(_))
                ),
                "accepted {:?}",
                name
            );
        }
        assert!(!tmp.path().join("escaped").exists());
        assert!(fs::read_dir(tmp.path()).unwrap().all(|e| {
            e.unwrap().file_name() == "inner.gdb"
        }));
        assert!(matches!(
            store.read_table(&store_dir, "../escaped"),
            Err(StorageError::InvalidTableName(_))
        ));
        assert!(matches!(
            store.delete_table(&store_dir, "../escaped"),
            Err(StorageError::InvalidTableName(_))
        ));
    }

    #[test]
    fn test_delete_table() {
        let tmp = TempDir::new().unwrap();
        let store = FileRecordStore::default();
        store
            .write_table(&parcels(), tmp.path(), "Parcels", &WriteOptions::default())
            .unwrap();

        assert!(store.delete_table(tmp.path(), "Parcels").unwrap());
        assert!(!store.delete_table(tmp.path(), "Parcels").unwrap());
        assert!(store.list_layers(tmp.path()).unwrap().is_empty());
        assert!(matches!(
            store.read_table(tmp.path(), "Parcels"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_geometry_type_derivation() {
        let schema = Schema::new(["n"]).unwrap();
        let empty = RecordSet::empty(schema.clone());
        let opts = WriteOptions::default();
        assert_eq!(declared_geometry_type(&empty, &opts).unwrap(), GeometryType::None);

        let nulls = RecordSet::new(schema.clone(), vec![Row::new(vec![1.into()], None)]).unwrap();
        assert_eq!(declared_geometry_type(&nulls, &opts).unwrap(), GeometryType::Unknown);
        assert_eq!(
            declared_geometry_type(&nulls, &opts.clone().with_geometry_type(GeometryType::Point))
                .unwrap(),
            GeometryType::Point
        );

        let mixed = RecordSet::new(
            schema,
            vec![
                Row::new(vec![1.into()], Some(Geometry::Point(point!(x: 0., y: 0.)))),
                Row::new(
                    vec![2.into()],
                    Some(Geometry::MultiPoint(vec![point!(x: 1., y: 1.)].into())),
                ),
            ],
        )
        .unwrap();
        assert_eq!(declared_geometry_type(&mixed, &opts).unwrap(), GeometryType::MultiPoint);
    }

    #[test]
    fn test_system_table_lists_datasets() {
        let tmp = TempDir::new().unwrap();
        let store = FileRecordStore::default();
        let in_zoning = WriteOptions::default().with_feature_dataset(Some("Zoning".into()));
        store.write_table(&parcels(), tmp.path(), "Parcels", &in_zoning).unwrap();
        store
            .write_table(&parcels(), tmp.path(), "Parcels_Old", &WriteOptions::default())
            .unwrap();

        let bytes = fs::read(store.system_file_path(tmp.path())).unwrap();
        let items = system_table::decode(&bytes).unwrap();
        let paths: Vec<&str> = items
            .iter()
            .filter_map(|(_, xml)| {
                let start = xml.find("<CatalogPath>")? + "<CatalogPath>".len();
                let end = xml.find("</CatalogPath>")?;
                Some(&xml[start..end])
            })
            .collect();
        assert_eq!(paths, vec!["\\", "\\Zoning", "\\Zoning\\Parcels", "\\Parcels_Old"]);
    }
}
