//! Container semantics: naming, shared datasets, schema and geometry checks.

mod support;

use geodb_api::{
    ApiError, Crs, FeatureDataset, GeoDatabase, Geometry, GeometryType, Item, RecordSet, Row,
    Schema, Value,
};
use geodb_spatial::resolve::demote;
use support::{parcels, plain, records, square, wells};

#[test]
fn duplicate_name_checked_against_every_owner() {
    let a = GeoDatabase::new();
    let b = GeoDatabase::new();
    a.set("Wells", wells()).unwrap();
    b.set("Roads", plain("r1")).unwrap();

    let shared = FeatureDataset::new(None, false);
    a.set("Zoning", shared.clone()).unwrap();
    b.set("Zoning", shared.clone()).unwrap();

    let err = shared.set("Wells", plain("x")).unwrap_err();
    assert_eq!(err.error_code(), "err:geodb/DuplicateName");
    assert!(matches!(
        shared.set("Roads", plain("x")),
        Err(ApiError::DuplicateName(_))
    ));

    shared.set("Parcels", plain("x")).unwrap();
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 2);
    assert!(matches!(
        b.set("Parcels", plain("y")),
        Err(ApiError::DuplicateName(_))
    ));
}

#[test]
fn deleting_shared_dataset_keeps_other_owner() {
    let a = GeoDatabase::new();
    let b = GeoDatabase::new();
    let d = FeatureDataset::default();
    d.set("Parcels", parcels()).unwrap();
    a.set("Zoning", d.clone()).unwrap();
    b.set("Zoning", d.clone()).unwrap();

    let mut owners = d.owners();
    owners.sort();
    let mut expected = vec![a.id(), b.id()];
    expected.sort();
    assert_eq!(owners, expected);

    let removed = a.delete(Some("Zoning")).unwrap();
    assert!(removed.ptr_eq(&d));
    assert_eq!(d.owners(), vec![b.id()]);
    assert!(a.is_empty());

    match b.get("Zoning").unwrap() {
        Item::Dataset(ds) => assert_eq!(ds.names(), vec!["Parcels"]),
        Item::Class(_) => panic!("expected a dataset"),
    }
    assert_eq!(b.fc_names(), vec!["Parcels"]);

    // A no longer reaches D, so the name is free there again.
    a.set("Parcels", plain("x")).unwrap();
}

#[test]
fn dataset_enforces_crs() {
    let zoning = FeatureDataset::default();
    zoning.set("Parcels", parcels()).unwrap();
    assert_eq!(zoning.crs(), Some(Crs::Srid(2227)));

    let err = zoning
        .set("Wells", wells().with_crs(Some(Crs::WGS84)))
        .unwrap_err();
    assert_eq!(err.error_code(), "err:geodb/CrsMismatch");
    assert_eq!(zoning.names(), vec!["Parcels"]);
}

#[test]
fn insert_with_other_schema_fails_regardless_of_geometry() {
    let mut fc = parcels();
    let other = RecordSet::new(
        Schema::new(["zone", "apn"]).unwrap(),
        vec![Row::new(
            vec![Value::from("R1"), Value::from("009")],
            Some(Geometry::Polygon(square(9.0, 9.0))),
        )],
    )
    .unwrap()
    .with_crs(Some(Crs::Srid(2227)));

    let err = fc.append(other).unwrap_err();
    assert_eq!(err.error_code(), "err:geodb/SchemaMismatch");
    assert_eq!(fc.len(), 3);
}

#[test]
fn polygon_into_multipoint_fails() {
    let multipoint = geodb_spatial::resolve::promote(
        Some(Geometry::Point(geo_types::Point::new(1.0, 1.0))),
        GeometryType::MultiPoint,
    )
    .unwrap();
    let mut fc =
        geodb_api::FeatureClass::from_record_set(records(vec![("001", "R1", multipoint)])).unwrap();
    assert_eq!(fc.geometry_type(), GeometryType::MultiPoint);

    let err = fc
        .append(records(vec![(
            "002",
            "R1",
            Some(Geometry::Polygon(square(0.0, 0.0))),
        )]))
        .unwrap_err();
    assert_eq!(err.error_code(), "err:geodb/IncompatibleGeometry");
    assert_eq!(fc.len(), 1);
    assert_eq!(fc.geometry_type(), GeometryType::MultiPoint);
}

#[test]
fn multipolygon_insert_promotes_and_unwraps_to_originals() {
    let mut fc = parcels();
    let originals: Vec<Option<Geometry>> = fc.rows().iter().map(|r| r.geometry.clone()).collect();

    let multi = geodb_spatial::resolve::promote(
        Some(Geometry::Polygon(square(5.0, 5.0))),
        GeometryType::MultiPolygon,
    )
    .unwrap();
    fc.insert(0, records(vec![("100", "C2", multi)]).with_crs(Some(Crs::Srid(2227))))
        .unwrap();

    assert_eq!(fc.geometry_type(), GeometryType::MultiPolygon);
    assert_eq!(fc.len(), 4);
    for (row, original) in fc.rows()[1..].iter().zip(originals) {
        match (row.geometry.clone(), original) {
            (Some(promoted), Some(original)) => {
                assert!(matches!(promoted, Geometry::MultiPolygon(_)));
                assert_eq!(demote(promoted), original);
            }
            (promoted, None) => assert!(promoted.map_or(true, |g| g.is_empty())),
            (None, Some(_)) => panic!("geometry lost on promotion"),
        }
    }
}

#[test]
fn shared_class_mutation_is_visible_through_every_dataset() {
    let left = FeatureDataset::new(None, false);
    let right = FeatureDataset::new(None, false);
    let fc = left.set("Parcels", parcels()).unwrap();
    right.set_shared("Parcels", fc).unwrap();

    left.get("Parcels")
        .unwrap()
        .write()
        .set(0, "zone", "X9")
        .unwrap();
    let through_right = right.get("Parcels").unwrap();
    let guard = through_right.read();
    assert_eq!(guard.rows()[0].values[1], Value::from("X9"));
    assert!(!guard.saved());
}

#[test]
fn copy_is_not_aliased() {
    let db = GeoDatabase::new();
    db.set("Parcels", parcels()).unwrap();
    let original = db.class("Parcels").unwrap();
    let mut copy = original.read().copy();
    copy.clear();
    assert_eq!(original.read().len(), 3);
    assert!(copy.is_empty());
}
