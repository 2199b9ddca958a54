//! Schemas, rows and record sets.

use std::collections::HashMap;

use geodb_spatial::{Crs, Geometry, GeometryType};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TabularError};
use crate::value::Value;

/// Name of the positional object identifier field.
pub const OBJECT_ID_FIELD: &str = "ObjectID";

/// Name of the geometry field.
pub const GEOMETRY_FIELD: &str = "geometry";

/// Ordered attribute column names.
///
/// The object ID and geometry fields are implicit and may not be declared as
/// attribute columns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Schema {
    /// Column names in order.
    columns: Vec<String>,
    /// Lookup by name.
    name_to_index: HashMap<String, usize>,
}

impl Schema {
    /// Create a schema, rejecting duplicate and reserved names.
    pub fn new<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut name_to_index = HashMap::with_capacity(columns.len());

        for (i, name) in columns.iter().enumerate() {
            if name == OBJECT_ID_FIELD || name == GEOMETRY_FIELD {
                return Err(TabularError::Schema(format!(
                    "'{}' is a reserved field name",
                    name
                )));
            }
            if name_to_index.insert(name.clone(), i).is_some() {
                return Err(TabularError::Schema(format!("Duplicate column: {}", name)));
            }
        }

        Ok(Self {
            columns,
            name_to_index,
        })
    }

    /// Get column index by name.
    #[inline]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Get column name by index.
    #[inline]
    pub fn column(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Fail unless `other` has the same column names in the same order.
    pub fn ensure_matches(&self, other: &Schema) -> Result<()> {
        if self.columns == other.columns {
            Ok(())
        } else {
            Err(TabularError::SchemaMismatch {
                expected: self.columns.clone(),
                found: other.columns.clone(),
            })
        }
    }

    /// Schema with a column appended.
    pub fn with_column(&self, name: impl Into<String>) -> Result<Schema> {
        let mut columns = self.columns.clone();
        columns.push(name.into());
        Schema::new(columns)
    }

    /// Positions of the named columns, in the order given.
    pub fn positions(&self, names: &[&str]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                self.index_of(name)
                    .ok_or_else(|| TabularError::ColumnNotFound((*name).to_string()))
            })
            .collect()
    }
}

impl TryFrom<Vec<String>> for Schema {
    type Error = TabularError;

    fn try_from(columns: Vec<String>) -> Result<Self> {
        Schema::new(columns)
    }
}

impl From<Schema> for Vec<String> {
    fn from(schema: Schema) -> Self {
        schema.columns
    }
}

/// One record: attribute values in schema order plus one optional geometry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub values: Vec<Value>,
    pub geometry: Option<Geometry>,
}

impl Row {
    pub fn new(values: Vec<Value>, geometry: Option<Geometry>) -> Self {
        Self { values, geometry }
    }

    /// Attribute value at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// An ordered set of rows sharing one schema and an optional CRS.
///
/// This is the unit exchanged with a record store. The declared geometry
/// type, when present, is what the source recorded for the table; it may be
/// more specific than the rows alone reveal (e.g. an all-null Polygon table).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    schema: Schema,
    rows: Vec<Row>,
    crs: Option<Crs>,
    geometry_type: Option<GeometryType>,
}

impl RecordSet {
    /// Create a record set, checking every row against the schema width.
    pub fn new(schema: Schema, rows: Vec<Row>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            check_width(&schema, row, i)?;
        }
        Ok(Self {
            schema,
            rows,
            crs: None,
            geometry_type: None,
        })
    }

    /// Create an empty record set with the given schema.
    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            crs: None,
            geometry_type: None,
        }
    }

    /// Set the CRS.
    pub fn with_crs(mut self, crs: Option<Crs>) -> Self {
        self.crs = crs;
        self
    }

    /// Set the declared geometry type.
    pub fn with_geometry_type(mut self, geometry_type: Option<GeometryType>) -> Self {
        self.geometry_type = geometry_type;
        self
    }

    /// Append a row.
    pub fn push(&mut self, row: Row) -> Result<()> {
        check_width(&self.schema, &row, self.rows.len())?;
        self.rows.push(row);
        Ok(())
    }

    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[inline]
    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    #[inline]
    pub fn geometry_type(&self) -> Option<GeometryType> {
        self.geometry_type
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Geometry column, in row order.
    pub fn geometries(&self) -> Vec<Option<Geometry>> {
        self.rows.iter().map(|r| r.geometry.clone()).collect()
    }

    /// Split into schema, rows and CRS.
    pub fn into_parts(self) -> (Schema, Vec<Row>, Option<Crs>) {
        (self.schema, self.rows, self.crs)
    }
}

fn check_width(schema: &Schema, row: &Row, index: usize) -> Result<()> {
    if row.values.len() != schema.len() {
        return Err(TabularError::Schema(format!(
            "Column count mismatch: row {} has {} values, schema has {} columns",
            index,
            row.values.len(),
            schema.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::point;

    fn sample_schema() -> Schema {
        Schema::new(["name", "zone", "area"]).unwrap()
    }

    #[test]
    fn test_schema_lookup() {
        let schema = sample_schema();
        assert_eq!(schema.index_of("name"), Some(0));
        assert_eq!(schema.index_of("area"), Some(2));
        assert_eq!(schema.index_of("unknown"), None);
        assert_eq!(schema.column(1), Some("zone"));
        assert_eq!(schema.positions(&["area", "name"]).unwrap(), vec![2, 0]);
        assert!(matches!(
            schema.positions(&["nope"]),
            Err(TabularError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_schema_rejects_duplicates_and_reserved() {
        assert!(Schema::new(["a", "a"]).is_err());
        assert!(Schema::new(["ObjectID"]).is_err());
        assert!(Schema::new(["geometry"]).is_err());
    }

    #[test]
    fn test_schema_order_matters() {
        let a = Schema::new(["x", "y"]).unwrap();
        let b = Schema::new(["y", "x"]).unwrap();
        assert!(a.ensure_matches(&a.clone()).is_ok());
        assert!(matches!(
            a.ensure_matches(&b),
            Err(TabularError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_record_set_width_checked() {
        let schema = sample_schema();
        let bad = Row::new(vec![Value::from("only one")], None);
        assert!(RecordSet::new(schema.clone(), vec![bad.clone()]).is_err());

        let mut rs = RecordSet::empty(schema);
        assert!(rs.push(bad).is_err());
        rs.push(Row::new(
            vec!["lot 1".into(), "R1".into(), 12.5.into()],
            Some(Geometry::Point(point!(x: 1., y: 2.))),
        ))
        .unwrap();
        assert_eq!(rs.len(), 1);
        assert_eq!(rs.geometries().len(), 1);
    }

    #[test]
    fn test_schema_serde() {
        let json = serde_json::to_string(&sample_schema()).unwrap();
        assert_eq!(json, r#"["name","zone","area"]"#);
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample_schema());
        assert!(serde_json::from_str::<Schema>(r#"["a","a"]"#).is_err());
    }
}
