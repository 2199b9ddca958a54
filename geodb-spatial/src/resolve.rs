//! Geometry-type resolution.
//!
//! A FeatureClass stores one geometry type. Collections that mix a simple
//! type with its multi form (plus the line-string / linear-ring pair) are
//! unified by promoting the simple members; every other mix is rejected.
//!
//! # Policy
//!
//! | distinct types                              | result            |
//! |---------------------------------------------|-------------------|
//! | (none, empty input)                         | `None`            |
//! | (none, only nulls)                          | `Unknown`         |
//! | any set containing `GeometryCollection`     | unsupported       |
//! | `{LinearRing}`                              | `LineString`      |
//! | `{T}`                                       | `T`, unchanged    |
//! | `{Point, MultiPoint}`                       | `MultiPoint`      |
//! | `{LineString, LinearRing}`                  | `LineString`      |
//! | `{MultiLineString, LineString\|LinearRing}` | `MultiLineString` |
//! | `{Polygon, MultiPolygon}`                   | `MultiPolygon`    |
//! | `{LineString, LinearRing, MultiLineString}` | `MultiLineString` |
//! | anything else                               | incompatible      |
//!
//! When promotion happens every row is rewritten, nulls included: a null
//! becomes the empty geometry of the target type.

use std::collections::BTreeSet;

use geo_types::{LineString, MultiLineString, MultiPoint, MultiPolygon};

use crate::error::{Result, SpatialError};
use crate::geometry::{Geometry, GeometryType};

use GeometryType as T;

/// Distinct concrete geometry types present in a collection, nulls skipped.
pub fn distinct_types(geometries: &[Option<Geometry>]) -> BTreeSet<GeometryType> {
    geometries
        .iter()
        .flatten()
        .map(Geometry::geometry_type)
        .collect()
}

/// Decide the canonical type for a non-empty set of distinct types.
pub fn target_type(distinct: &BTreeSet<GeometryType>) -> Result<GeometryType> {
    if distinct.contains(&T::GeometryCollection) {
        return Err(SpatialError::UnsupportedGeometry(T::GeometryCollection));
    }

    let has = |t: GeometryType| distinct.contains(&t);
    let resolved = match distinct.len() {
        1 if has(T::LinearRing) => Some(T::LineString),
        1 => distinct.iter().next().copied(),
        2 if has(T::Point) && has(T::MultiPoint) => Some(T::MultiPoint),
        2 if has(T::LineString) && has(T::LinearRing) => Some(T::LineString),
        2 if has(T::MultiLineString) && (has(T::LineString) || has(T::LinearRing)) => {
            Some(T::MultiLineString)
        }
        2 if has(T::Polygon) && has(T::MultiPolygon) => Some(T::MultiPolygon),
        3 if has(T::LineString) && has(T::LinearRing) && has(T::MultiLineString) => {
            Some(T::MultiLineString)
        }
        _ => None,
    };

    resolved.ok_or_else(|| SpatialError::incompatible(distinct))
}

/// Resolve a collection of geometries to one canonical type.
///
/// Returns the type together with the (possibly rewritten) geometries.
pub fn resolve(geometries: Vec<Option<Geometry>>) -> Result<(GeometryType, Vec<Option<Geometry>>)> {
    if geometries.is_empty() {
        return Ok((T::None, geometries));
    }

    let distinct = distinct_types(&geometries);
    if distinct.is_empty() {
        return Ok((T::Unknown, geometries));
    }

    let target = target_type(&distinct)?;
    if !distinct.iter().any(|&t| t != target) {
        return Ok((target, geometries));
    }

    tracing::debug!(
        from = ?distinct,
        to = %target,
        rows = geometries.len(),
        "promoting mixed geometries"
    );

    let promoted = promote_all(geometries, target)?;
    Ok((target, promoted))
}

/// Unify the fixed type of a collection with the resolved type of incoming rows.
///
/// The rule is symmetric: either side may be the simple form as long as the
/// other is that type's own promotion.
pub fn unify(existing: GeometryType, incoming: GeometryType) -> Result<GeometryType> {
    if !existing.is_concrete() {
        return Ok(incoming);
    }
    if !incoming.is_concrete() || existing == incoming {
        return Ok(existing);
    }

    let pair: BTreeSet<GeometryType> = [existing, incoming].into_iter().collect();
    target_type(&pair)
}

/// Rewrite every geometry to `target`.
pub fn promote_all(
    geometries: Vec<Option<Geometry>>,
    target: GeometryType,
) -> Result<Vec<Option<Geometry>>> {
    geometries
        .into_iter()
        .map(|geom| promote(geom, target))
        .collect()
}

/// Rewrite one geometry to `target`.
///
/// Nulls become the empty geometry of `target` where one exists and stay
/// null otherwise.
pub fn promote(geometry: Option<Geometry>, target: GeometryType) -> Result<Option<Geometry>> {
    let Some(geometry) = geometry else {
        return Ok(Geometry::empty(target));
    };

    let source = geometry.geometry_type();
    if source == target {
        return Ok(Some(geometry));
    }

    let promoted = match (geometry, target) {
        (Geometry::Point(p), T::MultiPoint) => Geometry::MultiPoint(MultiPoint(vec![p])),
        (Geometry::LinearRing(ls), T::LineString) => Geometry::LineString(ls),
        (Geometry::LineString(ls) | Geometry::LinearRing(ls), T::MultiLineString) => {
            Geometry::MultiLineString(MultiLineString(vec![ls]))
        }
        (Geometry::Polygon(p), T::MultiPolygon) => Geometry::MultiPolygon(MultiPolygon(vec![p])),
        _ => return Err(SpatialError::incompatible(&[source, target])),
    };
    Ok(Some(promoted))
}

/// Undo a promotion: a single-part multi geometry becomes its only part.
///
/// Anything else is returned unchanged.
pub fn demote(geometry: Geometry) -> Geometry {
    match geometry {
        Geometry::MultiPoint(mut mp) if mp.0.len() == 1 => Geometry::Point(mp.0.remove(0)),
        Geometry::MultiLineString(mut mls) if mls.0.len() == 1 => {
            let line: LineString<f64> = mls.0.remove(0);
            Geometry::LineString(line)
        }
        Geometry::MultiPolygon(mut mp) if mp.0.len() == 1 => Geometry::Polygon(mp.0.remove(0)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, point, polygon};

    fn pt(x: f64, y: f64) -> Option<Geometry> {
        Some(Geometry::Point(point!(x: x, y: y)))
    }

    #[test]
    fn test_empty_input_is_none() {
        let (ty, geoms) = resolve(Vec::new()).unwrap();
        assert_eq!(ty, GeometryType::None);
        assert!(geoms.is_empty());
    }

    #[test]
    fn test_all_null_is_unknown() {
        let (ty, geoms) = resolve(vec![None, None]).unwrap();
        assert_eq!(ty, GeometryType::Unknown);
        assert_eq!(geoms, vec![None, None]);
    }

    #[test]
    fn test_single_type_unchanged_with_nulls() {
        let input = vec![pt(0., 0.), None, pt(1., 1.)];
        let (ty, geoms) = resolve(input.clone()).unwrap();
        assert_eq!(ty, GeometryType::Point);
        assert_eq!(geoms, input);
    }

    #[test]
    fn test_point_multipoint_promotes_nulls_to_empty() {
        let multi = Some(Geometry::MultiPoint(MultiPoint(vec![
            point!(x: 5., y: 5.),
            point!(x: 6., y: 6.),
        ])));
        let (ty, geoms) = resolve(vec![pt(1., 2.), None, multi.clone()]).unwrap();
        assert_eq!(ty, GeometryType::MultiPoint);
        assert_eq!(
            geoms[0],
            Some(Geometry::MultiPoint(MultiPoint(vec![point!(x: 1., y: 2.)])))
        );
        assert_eq!(geoms[1], Some(Geometry::MultiPoint(MultiPoint(Vec::new()))));
        assert_eq!(geoms[2], multi);
    }

    #[test]
    fn test_linestring_linearring_to_linestring() {
        let ring = Geometry::linear_ring(line_string![(x: 0., y: 0.), (x: 1., y: 0.), (x: 1., y: 1.)]);
        let line = Geometry::LineString(line_string![(x: 0., y: 0.), (x: 3., y: 3.)]);
        let (ty, geoms) = resolve(vec![Some(ring), Some(line.clone()), None]).unwrap();
        assert_eq!(ty, GeometryType::LineString);
        assert!(matches!(geoms[0], Some(Geometry::LineString(ref ls)) if ls.is_closed()));
        assert_eq!(geoms[1], Some(line));
        assert_eq!(geoms[2], Some(Geometry::LineString(LineString(Vec::new()))));
    }

    #[test]
    fn test_ring_only_resolves_to_linestring() {
        let ring = Geometry::linear_ring(line_string![(x: 0., y: 0.), (x: 2., y: 0.), (x: 2., y: 2.)]);
        let (ty, geoms) = resolve(vec![Some(ring.clone()), None, Some(ring)]).unwrap();
        assert_eq!(ty, GeometryType::LineString);
        assert!(matches!(geoms[0], Some(Geometry::LineString(ref ls)) if ls.is_closed()));
        assert_eq!(geoms[1], Some(Geometry::LineString(LineString(Vec::new()))));
        assert_eq!(unify(T::Unknown, ty).unwrap(), T::LineString);
    }

    #[test]
    fn test_incompatible_pair() {
        let poly = Some(Geometry::Polygon(polygon![
            (x: 0., y: 0.),
            (x: 1., y: 0.),
            (x: 1., y: 1.),
        ]));
        let err = resolve(vec![pt(0., 0.), poly]).unwrap_err();
        assert!(matches!(err, SpatialError::IncompatibleGeometry(_)));
    }

    #[test]
    fn test_geometry_collection_unsupported() {
        let gc = Some(Geometry::GeometryCollection(geo_types::GeometryCollection(vec![])));
        let err = resolve(vec![pt(0., 0.), gc]).unwrap_err();
        assert_eq!(err, SpatialError::UnsupportedGeometry(GeometryType::GeometryCollection));
    }

    #[test]
    fn test_four_types_incompatible() {
        let set: BTreeSet<_> = [T::LineString, T::LinearRing, T::MultiLineString, T::Point]
            .into_iter()
            .collect();
        assert!(matches!(
            target_type(&set),
            Err(SpatialError::IncompatibleGeometry(_))
        ));
    }

    #[test]
    fn test_unify_is_symmetric() {
        assert_eq!(unify(T::Polygon, T::MultiPolygon).unwrap(), T::MultiPolygon);
        assert_eq!(unify(T::MultiPolygon, T::Polygon).unwrap(), T::MultiPolygon);
        assert_eq!(unify(T::Unknown, T::Point).unwrap(), T::Point);
        assert_eq!(unify(T::LineString, T::None).unwrap(), T::LineString);
        assert!(unify(T::MultiPoint, T::Polygon).is_err());
        assert!(unify(T::Polygon, T::MultiPoint).is_err());
    }

    #[test]
    fn test_demote_undoes_promote() {
        let original = Geometry::Polygon(polygon![
            (x: 0., y: 0.),
            (x: 4., y: 0.),
            (x: 4., y: 4.),
        ]);
        let promoted = promote(Some(original.clone()), T::MultiPolygon)
            .unwrap()
            .unwrap();
        assert_eq!(demote(promoted), original);
    }

    #[test]
    fn test_promote_null_without_empty_form_stays_null() {
        assert_eq!(promote(None, T::Polygon).unwrap(), None);
    }
}
