//! FeatureClass: an ordered collection of rows with one geometry type.
//!
//! A FeatureClass owns its rows outright. Selections (`get`, `head`,
//! `select_rows`, ...) and `copy` produce independent classes; nothing is
//! aliased between instances.
//!
//! Geometry invariants:
//! - every non-null geometry is of the class type, or was promoted to it
//! - the class type only changes by promotion (simple to multi), which
//!   rewrites every row
//! - incompatible inserts fail before any row is touched

use std::path::{Path, PathBuf};

use geodb_spatial::resolve::{promote, promote_all};
use geodb_spatial::{resolve, unify, BBox, Crs, Geometry, GeometryType};
use geodb_storage::{RecordStore, WriteOptions};
use geodb_tabular::{RecordSet, Row, Schema, TabularError, Value, GEOMETRY_FIELD, OBJECT_ID_FIELD};
use serde::Serialize;

use crate::error::{ApiError, Result};
use crate::index::{self, ColumnRef, Index};

/// An ordered collection of rows sharing one schema, geometry type and CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureClass {
    schema: Schema,
    rows: Vec<Row>,
    geometry_type: GeometryType,
    crs: Option<Crs>,
    saved: bool,
}

impl Default for FeatureClass {
    fn default() -> Self {
        Self {
            schema: Schema::default(),
            rows: Vec::new(),
            geometry_type: GeometryType::None,
            crs: None,
            saved: false,
        }
    }
}

/// Borrowed view of one row, handed to predicates and calculators.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    schema: &'a Schema,
    row: &'a Row,
    position: usize,
}

impl<'a> RowRef<'a> {
    /// Attribute value by column name.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.schema.index_of(column).and_then(|i| self.row.get(i))
    }

    pub fn geometry(&self) -> Option<&'a Geometry> {
        self.row.geometry.as_ref()
    }

    pub fn object_id(&self) -> usize {
        self.position
    }

    pub fn row(&self) -> &'a Row {
        self.row
    }
}

/// Summary returned by [`FeatureClass::describe`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Description {
    pub rows: usize,
    pub fields: Vec<String>,
    pub geometry_type: GeometryType,
    pub crs: Option<Crs>,
    pub null_geometries: usize,
    pub bbox: Option<BBox>,
    pub saved: bool,
}

/// Resolve the geometry column of `rows`, honoring a declared type.
///
/// The declared type wins when it is the multi form of what the rows hold,
/// so an all-Polygon table declared MultiPolygon is promoted on load.
fn resolve_rows(
    mut rows: Vec<Row>,
    declared: Option<GeometryType>,
) -> Result<(GeometryType, Vec<Row>)> {
    let geometries: Vec<Option<Geometry>> = rows.iter_mut().map(|r| r.geometry.take()).collect();
    let (resolved, geometries) = resolve(geometries)?;

    let target = match declared {
        Some(declared) => unify(declared, resolved)?,
        None => resolved,
    };
    let geometries = if target != resolved && resolved.is_concrete() {
        promote_all(geometries, target)?
    } else {
        geometries
    };

    for (row, geometry) in rows.iter_mut().zip(geometries) {
        row.geometry = geometry;
    }
    Ok((target, rows))
}

fn schema_mismatch(err: TabularError) -> ApiError {
    match err {
        TabularError::SchemaMismatch { expected, found } => {
            ApiError::SchemaMismatch { expected, found }
        }
        other => ApiError::Tabular(other),
    }
}

impl FeatureClass {
    /// An empty class with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty class with the given columns.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            ..Self::default()
        }
    }

    /// Set the CRS of a class that has none yet.
    pub fn with_crs(mut self, crs: Option<Crs>) -> Self {
        self.crs = crs;
        self
    }

    /// Build a class from an in-memory record set, resolving its geometries.
    pub fn from_record_set(records: RecordSet) -> Result<Self> {
        let declared = records.geometry_type();
        let (schema, rows, crs) = records.into_parts();
        let (geometry_type, rows) = resolve_rows(rows, declared)?;
        Ok(Self {
            schema,
            rows,
            geometry_type,
            crs,
            saved: false,
        })
    }

    /// Load table `name` from the store at `path`. The result starts saved.
    pub fn load(store: &dyn RecordStore, path: &Path, name: &str) -> Result<Self> {
        let records = store.read_table(path, name)?;
        let mut fc = Self::from_record_set(records)?;
        fc.saved = true;
        tracing::debug!(
            table = %name,
            rows = fc.len(),
            geometry_type = %fc.geometry_type,
            "feature class loaded"
        );
        Ok(fc)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[inline]
    pub fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    #[inline]
    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// False after any mutation until the next successful save.
    #[inline]
    pub fn saved(&self) -> bool {
        self.saved
    }

    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Rows with their object IDs.
    pub fn iter(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().enumerate().map(|(position, row)| RowRef {
            schema: &self.schema,
            row,
            position,
        })
    }

    /// Row at a possibly negative position.
    pub fn row(&self, i: isize) -> Result<&Row> {
        Ok(&self.rows[index::single(i, self.len())?])
    }

    /// Object ID of the row at `i`. In memory, IDs are dense and 0-based.
    pub fn object_id(&self, i: isize) -> Result<usize> {
        index::single(i, self.len())
    }

    /// Position of the row with object ID `oid`.
    pub fn index_of(&self, oid: usize) -> Option<usize> {
        (oid < self.len()).then_some(oid)
    }

    /// Selected rows as a new class with the same schema, type and CRS.
    pub fn get(&self, index: impl Into<Index>) -> Result<FeatureClass> {
        let positions = index.into().positions(self.len())?;
        Ok(self.derive(positions.into_iter().map(|p| self.rows[p].clone()).collect()))
    }

    fn derive(&self, rows: Vec<Row>) -> FeatureClass {
        FeatureClass {
            schema: self.schema.clone(),
            rows,
            geometry_type: self.geometry_type,
            crs: self.crs.clone(),
            saved: false,
        }
    }

    fn column_position(&self, column: &ColumnRef) -> Result<usize> {
        match column {
            ColumnRef::Position(i) if *i < self.schema.len() => Ok(*i),
            ColumnRef::Position(i) => Err(ApiError::invalid_index(format!(
                "column {} out of range for {} columns",
                i,
                self.schema.len()
            ))),
            ColumnRef::Name(name) => self
                .schema
                .index_of(name)
                .ok_or_else(|| ApiError::invalid_index(format!("no column named '{}'", name))),
        }
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Set one attribute value.
    pub fn set(
        &mut self,
        row: isize,
        column: impl Into<ColumnRef>,
        value: impl Into<Value>,
    ) -> Result<()> {
        let pos = index::single(row, self.len())?;
        let col = self.column_position(&column.into())?;
        self.rows[pos].values[col] = value.into();
        self.saved = false;
        Ok(())
    }

    /// Replace one geometry, promoting the class if the new geometry needs it.
    pub fn set_geometry(&mut self, row: isize, geometry: Option<Geometry>) -> Result<()> {
        let pos = index::single(row, self.len())?;
        let (incoming, mut geometries) = resolve(vec![geometry])?;
        let target = unify(self.geometry_type, incoming)?;

        let existing = self.promoted_existing(target)?;
        let geometry = match geometries.pop().flatten() {
            Some(g) if incoming.is_concrete() && incoming != target => promote(Some(g), target)?,
            other => other,
        };

        if let Some(existing) = existing {
            self.apply_geometries(existing);
        }
        self.rows[pos].geometry = geometry;
        self.geometry_type = self.settled_type(target);
        self.saved = false;
        Ok(())
    }

    /// Existing geometries rewritten to `target`, or `None` if no rewrite is needed.
    fn promoted_existing(&self, target: GeometryType) -> Result<Option<Vec<Option<Geometry>>>> {
        if target == self.geometry_type || !self.geometry_type.is_concrete() {
            return Ok(None);
        }
        let geometries = self.rows.iter().map(|r| r.geometry.clone()).collect();
        Ok(Some(promote_all(geometries, target)?))
    }

    fn apply_geometries(&mut self, geometries: Vec<Option<Geometry>>) {
        for (row, geometry) in self.rows.iter_mut().zip(geometries) {
            row.geometry = geometry;
        }
    }

    /// A class that holds rows never falls back to `None`.
    fn settled_type(&self, target: GeometryType) -> GeometryType {
        if target == GeometryType::None && !self.rows.is_empty() {
            GeometryType::Unknown
        } else {
            target
        }
    }

    /// Remove the row at `i` and return it.
    pub fn delete(&mut self, i: isize) -> Result<Row> {
        let pos = index::single(i, self.len())?;
        let row = self.rows.remove(pos);
        self.saved = false;
        tracing::trace!(position = pos, remaining = self.rows.len(), "row deleted");
        Ok(row)
    }

    /// Remove and return the last row.
    pub fn pop(&mut self) -> Option<Row> {
        let row = self.rows.pop()?;
        self.saved = false;
        Some(row)
    }

    /// Insert `records` at `i`: `0` prepends, `-1` appends, any other
    /// position splits the rows there (negative positions count from the end).
    ///
    /// Schema, CRS and geometry compatibility are checked before any row
    /// moves; on error the class is unchanged.
    pub fn insert(&mut self, i: isize, records: RecordSet) -> Result<()> {
        let adopt_schema = self.schema.is_empty() && self.rows.is_empty();
        if !adopt_schema {
            self.schema
                .ensure_matches(records.schema())
                .map_err(schema_mismatch)?;
        }

        let adopt_crs = match (&self.crs, records.crs()) {
            (Some(existing), Some(found)) if existing != found => {
                return Err(ApiError::CrsMismatch {
                    expected: Some(existing.clone()),
                    found: Some(found.clone()),
                })
            }
            (None, Some(_)) => true,
            _ => false,
        };

        let declared = records.geometry_type();
        let (schema, rows, crs) = records.into_parts();
        let (incoming, mut rows) = resolve_rows(rows, declared)?;
        let target = unify(self.geometry_type, incoming)?;

        let existing = self.promoted_existing(target)?;
        if incoming != target && incoming.is_concrete() {
            let geometries = rows.iter_mut().map(|r| r.geometry.take()).collect();
            for (row, geometry) in rows.iter_mut().zip(promote_all(geometries, target)?) {
                row.geometry = geometry;
            }
        }

        // All checks passed.
        if adopt_schema && self.schema != schema {
            self.schema = schema;
            self.saved = false;
        }
        if adopt_crs {
            self.crs = crs;
            self.saved = false;
        }
        if rows.is_empty() {
            return Ok(());
        }
        if let Some(existing) = existing {
            self.apply_geometries(existing);
        }

        let len = self.len();
        let at = match i {
            -1 => len,
            i if i < 0 => (len as isize + i).max(0) as usize,
            i => (i as usize).min(len),
        };
        let inserted = rows.len();
        self.rows.splice(at..at, rows);
        self.geometry_type = self.settled_type(target);
        self.saved = false;

        tracing::debug!(
            position = at,
            rows = inserted,
            geometry_type = %self.geometry_type,
            "rows inserted"
        );
        Ok(())
    }

    /// Append `records` at the end.
    pub fn append(&mut self, records: RecordSet) -> Result<()> {
        self.insert(-1, records)
    }

    /// Append several record sets in order, stopping at the first failure.
    pub fn extend<I>(&mut self, batches: I) -> Result<()>
    where
        I: IntoIterator<Item = RecordSet>,
    {
        for records in batches {
            self.append(records)?;
        }
        Ok(())
    }

    /// Drop every row; the schema and geometry type stay.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.saved = false;
    }

    /// Compute `column` for every row, adding the column if it is new.
    pub fn calculate<F>(&mut self, column: &str, mut f: F) -> Result<()>
    where
        F: FnMut(RowRef<'_>) -> Value,
    {
        let values: Vec<Value> = self.iter().map(&mut f).collect();
        let col = match self.schema.index_of(column) {
            Some(col) => col,
            None => {
                self.schema = self.schema.with_column(column)?;
                for row in &mut self.rows {
                    row.values.push(Value::Null);
                }
                self.schema.len() - 1
            }
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.values[col] = value;
        }
        self.saved = false;
        Ok(())
    }

    // ========================================================================
    // Derived classes
    // ========================================================================

    /// Independent deep copy. The copy starts unsaved.
    pub fn copy(&self) -> FeatureClass {
        self.derive(self.rows.clone())
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> FeatureClass {
        self.derive(self.rows[..n.min(self.len())].to_vec())
    }

    /// Field names including the implicit object ID and geometry fields.
    pub fn list_fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(self.schema.len() + 2);
        fields.push(OBJECT_ID_FIELD.to_string());
        fields.extend(self.schema.columns().iter().cloned());
        if self.geometry_type != GeometryType::None {
            fields.push(GEOMETRY_FIELD.to_string());
        }
        fields
    }

    /// A class with only the named columns, in the order given.
    pub fn select_columns(&self, columns: &[&str], keep_geometry: bool) -> Result<FeatureClass> {
        let positions = self
            .schema
            .positions(columns)
            .map_err(|e| ApiError::invalid_index(e.to_string()))?;
        let schema = Schema::new(columns.iter().copied())?;
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let values = positions.iter().map(|&p| row.values[p].clone()).collect();
                let geometry = if keep_geometry { row.geometry.clone() } else { None };
                Row::new(values, geometry)
            })
            .collect();

        Ok(FeatureClass {
            schema,
            rows,
            geometry_type: if keep_geometry {
                self.geometry_type
            } else {
                GeometryType::None
            },
            crs: if keep_geometry { self.crs.clone() } else { None },
            saved: false,
        })
    }

    /// Rows matching `predicate`.
    pub fn select_rows<P>(&self, predicate: P) -> FeatureClass
    where
        P: Fn(&RowRef<'_>) -> bool,
    {
        let rows = self
            .iter()
            .filter(|r| predicate(r))
            .map(|r| r.row.clone())
            .collect();
        self.derive(rows)
    }

    /// A new class with the rows ordered by `column`; `self` is left as is.
    ///
    /// The sort is stable and nulls go last in both directions. The result
    /// starts unsaved.
    pub fn sort(&self, column: &str, ascending: bool) -> Result<FeatureClass> {
        let col = self.column_position(&ColumnRef::Name(column.to_string()))?;
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            let (a, b) = (&a.values[col], &b.values[col]);
            if ascending || a.is_null() || b.is_null() {
                a.sort_cmp(b)
            } else {
                b.sort_cmp(a)
            }
        });
        Ok(self.derive(rows))
    }

    /// Row count, fields, geometry summary and save state.
    pub fn describe(&self) -> Description {
        let bbox = self
            .rows
            .iter()
            .filter_map(|r| r.geometry.as_ref().and_then(Geometry::bbox))
            .reduce(|acc, b| acc.union(&b));
        Description {
            rows: self.len(),
            fields: self.list_fields(),
            geometry_type: self.geometry_type,
            crs: self.crs.clone(),
            null_geometries: self.rows.iter().filter(|r| r.geometry.is_none()).count(),
            bbox,
            saved: self.saved,
        }
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Snapshot as a record set carrying the class CRS and geometry type.
    pub fn to_record_set(&self) -> Result<RecordSet> {
        Ok(RecordSet::new(self.schema.clone(), self.rows.clone())?
            .with_crs(self.crs.clone())
            .with_geometry_type(Some(self.geometry_type)))
    }

    /// GeoJSON feature collection; feature IDs are the object IDs.
    pub fn to_geojson(&self) -> Result<geojson::FeatureCollection> {
        let mut features = Vec::with_capacity(self.len());
        for r in self.iter() {
            let mut properties = geojson::JsonObject::new();
            for (name, value) in self.schema.columns().iter().zip(&r.row.values) {
                properties.insert(name.clone(), serde_json::to_value(value)?);
            }
            let geometry = r
                .geometry()
                .map(|g| geojson::Geometry::new(geojson::Value::from(&g.to_geo())));
            features.push(geojson::Feature {
                bbox: None,
                geometry,
                id: Some(geojson::feature::Id::Number(r.object_id().into())),
                properties: Some(properties),
                foreign_members: None,
            });
        }
        Ok(geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }

    /// Write the class as GeoJSON. `.geojson` is appended unless the path
    /// already ends in `.json` or `.geojson`.
    pub fn write_geojson(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let has_ext = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("json") | Some("geojson")
        );
        let path = if has_ext {
            path.to_path_buf()
        } else {
            let mut name = path.as_os_str().to_owned();
            name.push(".geojson");
            PathBuf::from(name)
        };

        let collection = self.to_geojson()?;
        std::fs::write(&path, serde_json::to_vec(&collection)?)?;
        tracing::debug!(path = %path.display(), features = self.len(), "geojson written");
        Ok(path)
    }

    /// Persist as table `name` and mark the class saved.
    ///
    /// The class geometry type is declared unless `options` already names one.
    pub fn save(
        &mut self,
        store: &dyn RecordStore,
        path: &Path,
        name: &str,
        options: &WriteOptions,
    ) -> Result<()> {
        let _span = tracing::debug_span!("feature_class_save", table = %name).entered();
        let mut options = options.clone();
        if options.geometry_type.is_none() {
            options.geometry_type = Some(self.geometry_type);
        }
        store.write_table(&self.to_record_set()?, path, name, &options)?;
        self.saved = true;
        Ok(())
    }
}
