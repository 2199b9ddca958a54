//! Catalog system table writer.
//!
//! The system table lists every item in a store as an XML definition
//! fragment, the same way a file geodatabase's `a00000004.gdbtable` does.
//! Readers treat the file as opaque bytes and scan it for
//! `<CatalogPath>` elements, so only the fragments need to be well formed.
//!
//! # Layout
//!
//! ```text
//! magic        8 bytes   "GDBSYST\0"
//! version      u32 LE
//! item count   u32 LE
//! per item:
//!   length     u32 LE    (object id + definition)
//!   object id  u32 LE    (1-based)
//!   definition UTF-8 XML
//! ```

use geodb_spatial::{Crs, GeometryType};
use quick_xml::escape::escape;

/// File magic.
pub const MAGIC: &[u8; 8] = b"GDBSYST\0";

/// Current layout version.
pub const VERSION: u32 = 1;

const XMLNS: &str = r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:typens="http://www.esri.com/schemas/ArcGIS/10.3""#;

/// What a system table item describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Workspace,
    FeatureDataset,
    FeatureClass,
    Table,
}

impl ItemKind {
    fn root_element(&self) -> &'static str {
        match self {
            ItemKind::Workspace => "DEWorkspace",
            ItemKind::FeatureDataset => "DEFeatureDataset",
            ItemKind::FeatureClass => "DEFeatureClassInfo",
            ItemKind::Table => "DETableInfo",
        }
    }

    fn dataset_type(&self) -> &'static str {
        match self {
            ItemKind::Workspace => "esriDTContainer",
            ItemKind::FeatureDataset => "esriDTFeatureDataset",
            ItemKind::FeatureClass => "esriDTFeatureClass",
            ItemKind::Table => "esriDTTable",
        }
    }
}

/// One catalog item.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub kind: ItemKind,
    pub name: String,
    /// Owning feature dataset, for feature classes and tables.
    pub dataset: Option<String>,
    pub geometry_type: Option<GeometryType>,
    pub crs: Option<Crs>,
    pub fields: Vec<String>,
}

impl CatalogItem {
    pub fn workspace() -> Self {
        Self {
            kind: ItemKind::Workspace,
            name: String::new(),
            dataset: None,
            geometry_type: None,
            crs: None,
            fields: Vec::new(),
        }
    }

    pub fn feature_dataset(name: impl Into<String>, crs: Option<Crs>) -> Self {
        Self {
            kind: ItemKind::FeatureDataset,
            name: name.into(),
            dataset: None,
            geometry_type: None,
            crs,
            fields: Vec::new(),
        }
    }

    /// A table item; it is a feature class when `geometry_type` has a shape type.
    pub fn table(
        name: impl Into<String>,
        dataset: Option<String>,
        geometry_type: Option<GeometryType>,
        crs: Option<Crs>,
        fields: Vec<String>,
    ) -> Self {
        let kind = match geometry_type.and_then(|t| t.esri_shape_type()) {
            Some(_) => ItemKind::FeatureClass,
            None => ItemKind::Table,
        };
        Self {
            kind,
            name: name.into(),
            dataset,
            geometry_type,
            crs,
            fields,
        }
    }

    /// `\Dataset\Name`, `\Name`, or `\` for the workspace.
    pub fn catalog_path(&self) -> String {
        match (&self.kind, &self.dataset) {
            (ItemKind::Workspace, _) => "\\".to_string(),
            (_, Some(dataset)) => format!("\\{}\\{}", dataset, self.name),
            (_, None) => format!("\\{}", self.name),
        }
    }

    /// XML definition fragment.
    pub fn definition(&self) -> String {
        let root = self.kind.root_element();
        let mut xml = format!(
            r#"<{root} xsi:type="typens:{root}" {XMLNS}><CatalogPath>{}</CatalogPath><Name>{}</Name><DatasetType>{}</DatasetType>"#,
            escape(self.catalog_path().as_str()),
            escape(self.name.as_str()),
            self.kind.dataset_type(),
        );

        if matches!(self.kind, ItemKind::FeatureClass | ItemKind::Table) {
            xml.push_str("<HasOID>true</HasOID><OIDFieldName>ObjectID</OIDFieldName><Fields><FieldArray>");
            for field in &self.fields {
                xml.push_str(&format!("<Field><Name>{}</Name></Field>", escape(field.as_str())));
            }
            xml.push_str("</FieldArray></Fields>");
        }

        if self.kind == ItemKind::FeatureClass {
            if let Some(shape) = self.geometry_type.and_then(|t| t.esri_shape_type()) {
                xml.push_str(&format!(
                    "<FeatureType>esriFTSimple</FeatureType><ShapeType>{}</ShapeType><ShapeFieldName>SHAPE</ShapeFieldName>",
                    shape
                ));
            }
        }

        if let Some(crs) = &self.crs {
            xml.push_str(&spatial_reference(crs));
        }

        xml.push_str(&format!("</{root}>"));
        xml
    }
}

fn spatial_reference(crs: &Crs) -> String {
    match crs.srid() {
        Some(code) => format!(
            r#"<SpatialReference xsi:type="typens:SpatialReference"><WKID>{}</WKID><LatestWKID>{}</LatestWKID></SpatialReference>"#,
            code, code
        ),
        None => format!(
            r#"<SpatialReference xsi:type="typens:SpatialReference"><WKT>{}</WKT></SpatialReference>"#,
            escape(crs.to_string().as_str())
        ),
    }
}

/// Encode items into system table bytes.
pub fn encode(items: &[CatalogItem]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64 + items.len() * 512);
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&(items.len() as u32).to_le_bytes());

    for (i, item) in items.iter().enumerate() {
        let definition = item.definition();
        let object_id = (i + 1) as u32;
        let len = (4 + definition.len()) as u32;
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&object_id.to_le_bytes());
        buf.extend_from_slice(definition.as_bytes());
    }

    buf
}

/// Decode system table bytes into `(object id, definition)` pairs.
///
/// Returns `None` if the bytes are not a system table in this layout.
pub fn decode(bytes: &[u8]) -> Option<Vec<(u32, String)>> {
    let rest = bytes.strip_prefix(MAGIC.as_slice())?;
    let (version, rest) = read_u32(rest)?;
    if version != VERSION {
        return None;
    }
    let (count, mut rest) = read_u32(rest)?;

    let mut items = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (len, tail) = read_u32(rest)?;
        let len = len as usize;
        if len < 4 || tail.len() < len {
            return None;
        }
        let (record, tail) = tail.split_at(len);
        let (object_id, definition) = read_u32(record)?;
        items.push((object_id, String::from_utf8(definition.to_vec()).ok()?));
        rest = tail;
    }
    Some(items)
}

fn read_u32(bytes: &[u8]) -> Option<(u32, &[u8])> {
    if bytes.len() < 4 {
        return None;
    }
    let (head, tail) = bytes.split_at(4);
    let value = u32::from_le_bytes([head[0], head[1], head[2], head[3]]);
    Some((value, tail))
}
