//! Geometry values and geometry-type classification.
//!
//! This module provides:
//! - [`GeometryType`]: the type label a FeatureClass resolves to
//! - [`Geometry`]: a geometry value with an explicit `LinearRing` variant
//! - WKT parsing/formatting on top of the `wkt` crate
//! - [`BBox`] for summaries
//!
//! # Design
//!
//! `geo_types` has no linear-ring geometry, but stores distinguish a closed
//! ring from an open line string. [`Geometry`] therefore wraps the `geo_types`
//! primitives and adds `LinearRing`, which always holds a closed
//! `LineString`. Conversion to `geo_types::Geometry` is lossless except that a
//! ring becomes a plain line string.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SpatialError};
use geo::BoundingRect;
use geo_types::{
    GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
};
use serde::{Deserialize, Serialize};
use wkt::ToWkt;

/// Geometry type discriminator.
///
/// `None` and `Unknown` only ever describe a collection: `None` for an empty
/// or non-spatial collection, `Unknown` for rows whose geometries are all null.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum GeometryType {
    None,
    Unknown,
    Point,
    MultiPoint,
    LineString,
    LinearRing,
    MultiLineString,
    Polygon,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryType {
    /// Canonical label.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryType::None => "None",
            GeometryType::Unknown => "Unknown",
            GeometryType::Point => "Point",
            GeometryType::MultiPoint => "MultiPoint",
            GeometryType::LineString => "LineString",
            GeometryType::LinearRing => "LinearRing",
            GeometryType::MultiLineString => "MultiLineString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPolygon => "MultiPolygon",
            GeometryType::GeometryCollection => "GeometryCollection",
        }
    }

    /// True for the types a single geometry value can have.
    pub fn is_concrete(&self) -> bool {
        !matches!(self, GeometryType::None | GeometryType::Unknown)
    }

    /// True for `Multi*` types.
    pub fn is_multi(&self) -> bool {
        matches!(
            self,
            GeometryType::MultiPoint | GeometryType::MultiLineString | GeometryType::MultiPolygon
        )
    }

    /// The promoted ("multi") form of this type, if it has one.
    pub fn multi(&self) -> Option<GeometryType> {
        match self {
            GeometryType::Point | GeometryType::MultiPoint => Some(GeometryType::MultiPoint),
            GeometryType::LineString
            | GeometryType::LinearRing
            | GeometryType::MultiLineString => Some(GeometryType::MultiLineString),
            GeometryType::Polygon | GeometryType::MultiPolygon => Some(GeometryType::MultiPolygon),
            _ => None,
        }
    }

    /// Shape type name used in catalog metadata.
    pub fn esri_shape_type(&self) -> Option<&'static str> {
        match self {
            GeometryType::Point => Some("esriGeometryPoint"),
            GeometryType::MultiPoint => Some("esriGeometryMultipoint"),
            GeometryType::LineString
            | GeometryType::LinearRing
            | GeometryType::MultiLineString => Some("esriGeometryPolyline"),
            GeometryType::Polygon | GeometryType::MultiPolygon => Some("esriGeometryPolygon"),
            _ => None,
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeometryType {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self> {
        let ty = match s.trim().to_ascii_lowercase().as_str() {
            "none" => GeometryType::None,
            "unknown" => GeometryType::Unknown,
            "point" => GeometryType::Point,
            "multipoint" => GeometryType::MultiPoint,
            "linestring" => GeometryType::LineString,
            "linearring" => GeometryType::LinearRing,
            "multilinestring" => GeometryType::MultiLineString,
            "polygon" => GeometryType::Polygon,
            "multipolygon" => GeometryType::MultiPolygon,
            "geometrycollection" => GeometryType::GeometryCollection,
            other => {
                return Err(SpatialError::WktParse(format!(
                    "unknown geometry type: {}",
                    other
                )))
            }
        };
        Ok(ty)
    }
}

/// A single geometry value.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point<f64>),
    MultiPoint(MultiPoint<f64>),
    LineString(LineString<f64>),
    /// Closed line string.
    LinearRing(LineString<f64>),
    MultiLineString(MultiLineString<f64>),
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
    GeometryCollection(GeometryCollection<f64>),
}

impl Geometry {
    /// Classify this geometry.
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::LinearRing(_) => GeometryType::LinearRing,
            Geometry::MultiLineString(_) => GeometryType::MultiLineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryType::GeometryCollection,
        }
    }

    /// Build a linear ring, closing the line string if it is open.
    pub fn linear_ring(mut line: LineString<f64>) -> Self {
        line.close();
        Geometry::LinearRing(line)
    }

    /// The empty geometry of `ty`, for the types that have one.
    ///
    /// Points and polygons have no empty form that survives a WKT round trip,
    /// so only the line and multi types are covered.
    pub fn empty(ty: GeometryType) -> Option<Self> {
        match ty {
            GeometryType::MultiPoint => Some(Geometry::MultiPoint(MultiPoint(Vec::new()))),
            GeometryType::LineString => Some(Geometry::LineString(LineString(Vec::new()))),
            GeometryType::MultiLineString => {
                Some(Geometry::MultiLineString(MultiLineString(Vec::new())))
            }
            GeometryType::MultiPolygon => Some(Geometry::MultiPolygon(MultiPolygon(Vec::new()))),
            _ => None,
        }
    }

    /// True if the geometry has no coordinates.
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(_) => false,
            Geometry::MultiPoint(mp) => mp.0.is_empty(),
            Geometry::LineString(ls) | Geometry::LinearRing(ls) => ls.0.is_empty(),
            Geometry::MultiLineString(mls) => mls.0.is_empty(),
            Geometry::Polygon(p) => p.exterior().0.is_empty(),
            Geometry::MultiPolygon(mp) => mp.0.is_empty(),
            Geometry::GeometryCollection(gc) => gc.0.is_empty(),
        }
    }

    /// Convert to a `geo_types` geometry. Rings become line strings.
    pub fn to_geo(&self) -> geo_types::Geometry<f64> {
        match self {
            Geometry::Point(p) => geo_types::Geometry::Point(*p),
            Geometry::MultiPoint(mp) => geo_types::Geometry::MultiPoint(mp.clone()),
            Geometry::LineString(ls) | Geometry::LinearRing(ls) => {
                geo_types::Geometry::LineString(ls.clone())
            }
            Geometry::MultiLineString(mls) => geo_types::Geometry::MultiLineString(mls.clone()),
            Geometry::Polygon(p) => geo_types::Geometry::Polygon(p.clone()),
            Geometry::MultiPolygon(mp) => geo_types::Geometry::MultiPolygon(mp.clone()),
            Geometry::GeometryCollection(gc) => {
                geo_types::Geometry::GeometryCollection(gc.clone())
            }
        }
    }

    /// Parse WKT. Accepts `LINEARRING (...)` in addition to the standard tags.
    pub fn from_wkt(text: &str) -> Result<Self> {
        let trimmed = text.trim_start();
        let is_ring = trimmed
            .get(..10)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("LINEARRING"));
        if is_ring {
            let as_line = format!("LINESTRING{}", &trimmed[10..]);
            return match parse_wkt(&as_line)? {
                geo_types::Geometry::LineString(ls) if ls.is_closed() => {
                    Ok(Geometry::LinearRing(ls))
                }
                _ => Err(SpatialError::WktParse(format!(
                    "linear ring is not closed: {}",
                    text
                ))),
            };
        }
        Ok(Geometry::from(parse_wkt(text)?))
    }

    /// Format as WKT.
    pub fn to_wkt(&self) -> String {
        let text = self.to_geo().wkt_string();
        match self {
            Geometry::LinearRing(_) => match text.strip_prefix("LINESTRING") {
                Some(rest) => format!("LINEARRING{}", rest),
                None => text,
            },
            _ => text,
        }
    }

    /// Bounding box, if the geometry is non-empty.
    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_geometry(&self.to_geo())
    }
}

impl From<geo_types::Geometry<f64>> for Geometry {
    fn from(geom: geo_types::Geometry<f64>) -> Self {
        match geom {
            geo_types::Geometry::Point(p) => Geometry::Point(p),
            geo_types::Geometry::MultiPoint(mp) => Geometry::MultiPoint(mp),
            geo_types::Geometry::LineString(ls) => Geometry::LineString(ls),
            geo_types::Geometry::Line(l) => Geometry::LineString(LineString(vec![l.start, l.end])),
            geo_types::Geometry::MultiLineString(mls) => Geometry::MultiLineString(mls),
            geo_types::Geometry::Polygon(p) => Geometry::Polygon(p),
            geo_types::Geometry::Rect(r) => Geometry::Polygon(r.to_polygon()),
            geo_types::Geometry::Triangle(t) => Geometry::Polygon(t.to_polygon()),
            geo_types::Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(mp),
            geo_types::Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(gc),
        }
    }
}

impl From<Point<f64>> for Geometry {
    fn from(p: Point<f64>) -> Self {
        Geometry::Point(p)
    }
}

impl From<LineString<f64>> for Geometry {
    fn from(ls: LineString<f64>) -> Self {
        Geometry::LineString(ls)
    }
}

impl From<Polygon<f64>> for Geometry {
    fn from(p: Polygon<f64>) -> Self {
        Geometry::Polygon(p)
    }
}

impl FromStr for Geometry {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self> {
        Geometry::from_wkt(s)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wkt())
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    /// Compute from a geo-types Geometry.
    pub fn from_geometry(geom: &geo_types::Geometry<f64>) -> Option<Self> {
        let rect = geom.bounding_rect()?;
        Some(Self {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
        })
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// Parse WKT string to geo-types Geometry.
pub fn parse_wkt(wkt: &str) -> Result<geo_types::Geometry<f64>> {
    wkt::Wkt::from_str(wkt)
        .map_err(|e| SpatialError::WktParse(format!("{:?}", e)))
        .and_then(|w| {
            w.try_into()
                .map_err(|e: wkt::conversion::Error| SpatialError::WktParse(format!("{:?}", e)))
        })
}
