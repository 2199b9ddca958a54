//! Shared fixtures for geodb-api integration tests.

#![allow(dead_code)]

pub mod span_capture;

use geo_types::{polygon, Point, Polygon};
use geodb_api::{Crs, FeatureClass, Geometry, RecordSet, Row, Schema, Value};

pub fn parcel_schema() -> Schema {
    Schema::new(["apn", "zone"]).unwrap()
}

pub fn square(x: f64, y: f64) -> Polygon<f64> {
    polygon![
        (x: x, y: y),
        (x: x + 1.0, y: y),
        (x: x + 1.0, y: y + 1.0),
        (x: x, y: y + 1.0),
    ]
}

/// One row per `(apn, zone, geometry)`.
pub fn records(rows: Vec<(&str, &str, Option<Geometry>)>) -> RecordSet {
    let rows = rows
        .into_iter()
        .map(|(apn, zone, geometry)| Row::new(vec![Value::from(apn), Value::from(zone)], geometry))
        .collect();
    RecordSet::new(parcel_schema(), rows).unwrap()
}

/// Three polygon parcels in EPSG:2227.
pub fn parcels() -> FeatureClass {
    let rs = records(vec![
        ("001", "R1", Some(Geometry::Polygon(square(0.0, 0.0)))),
        ("002", "R2", Some(Geometry::Polygon(square(2.0, 0.0)))),
        ("003", "C1", None),
    ])
    .with_crs(Some(Crs::Srid(2227)));
    FeatureClass::from_record_set(rs).unwrap()
}

/// Two point wells in EPSG:2227.
pub fn wells() -> FeatureClass {
    let rs = records(vec![
        ("W1", "", Some(Geometry::Point(Point::new(0.5, 0.5)))),
        ("W2", "", Some(Geometry::Point(Point::new(2.5, 0.5)))),
    ])
    .with_crs(Some(Crs::Srid(2227)));
    FeatureClass::from_record_set(rs).unwrap()
}

/// A class with the parcel schema and no geometry or CRS.
pub fn plain(apn: &str) -> FeatureClass {
    FeatureClass::from_record_set(records(vec![(apn, "R1", None)])).unwrap()
}
