//! Geometry helpers over the `geo` / `geojson` / `rstar` stack.
//!
//! Stored geometry is WGS84 `GeoJSON`; wire coordinate order is
//! `(lon, lat)` which maps directly onto `geo`'s `(x, y)`. The public
//! [`district_map_models::Point`] type is `(lat, lon)` and conversion
//! happens at this boundary.

use geo::{
    BooleanOps, BoundingRect, ClosestPoint, Contains, EuclideanDistance, GeodesicArea,
    HaversineDistance, LineString, MultiPolygon,
};
use geojson::GeoJson;
use rstar::AABB;

use district_map_models::{DistrictMap, DistrictType, Point, Polygon};

/// Parses a `GeoJSON` geometry string into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
#[must_use]
pub fn multipolygon_from_geojson(geojson_str: &str) -> Option<MultiPolygon<f64>> {
    let geojson: GeoJson = geojson_str.parse().ok()?;
    if let GeoJson::Geometry(geom) = geojson {
        let geo_geom: geo::Geometry<f64> = geom.try_into().ok()?;
        match geo_geom {
            geo::Geometry::MultiPolygon(mp) => Some(mp),
            geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
            _ => None,
        }
    } else {
        None
    }
}

/// Computes the bounding box envelope for a [`MultiPolygon`].
#[must_use]
pub fn envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

/// True when the polygon contains the point.
#[must_use]
pub fn contains(mp: &MultiPolygon<f64>, point: Point) -> bool {
    mp.contains(&geo::Point::new(point.lon, point.lat))
}

/// Converts a [`MultiPolygon`] into the wire-facing [`DistrictMap`]
/// with `(lat, lon)` rings. Interior rings are dropped; district
/// boundaries are rendered from their exteriors.
#[must_use]
pub fn district_map_from(
    mp: &MultiPolygon<f64>,
    district_type: Option<DistrictType>,
    name: Option<&str>,
    code: Option<&str>,
) -> DistrictMap {
    let polygons: Vec<Polygon> = mp
        .0
        .iter()
        .map(|polygon| {
            Polygon::new(
                polygon
                    .exterior()
                    .points()
                    .map(|p| Point::new(p.y(), p.x()))
                    .collect(),
            )
        })
        .collect();

    DistrictMap {
        geometry_type: if mp.0.len() > 1 { "MultiPolygon" } else { "Polygon" }.to_string(),
        polygons,
        district_type,
        district_name: name.map(ToString::to_string),
        district_code: code.map(ToString::to_string),
    }
}

fn boundary_rings(mp: &MultiPolygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    mp.0.iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
}

/// Distance from a point to the polygon boundary in coordinate
/// (degree) units. Zero-ish values mean the point sits on the edge;
/// points deep inside a district still report their distance to the
/// nearest ring.
#[must_use]
pub fn boundary_distance_degrees(mp: &MultiPolygon<f64>, point: Point) -> f64 {
    let p = geo::Point::new(point.lon, point.lat);
    boundary_rings(mp)
        .map(|ring| p.euclidean_distance(ring))
        .fold(f64::INFINITY, f64::min)
}

/// Great-circle distance in meters from a point to the closest point
/// on the polygon boundary.
#[must_use]
pub fn boundary_distance_meters(mp: &MultiPolygon<f64>, point: Point) -> f64 {
    let p = geo::Point::new(point.lon, point.lat);
    let mut best = f64::INFINITY;
    for ring in boundary_rings(mp) {
        let candidate = match ring.closest_point(&p) {
            geo::Closest::SinglePoint(c) | geo::Closest::Intersection(c) => {
                p.haversine_distance(&c)
            }
            geo::Closest::Indeterminate => ring
                .points()
                .map(|c| p.haversine_distance(&c))
                .fold(f64::INFINITY, f64::min),
        };
        best = best.min(candidate);
    }
    best
}

/// Geodesic area of a polygon in square meters.
#[must_use]
pub fn area_sq_meters(mp: &MultiPolygon<f64>) -> f64 {
    mp.geodesic_area_unsigned()
}

/// Union of a set of polygons. Returns `None` for an empty input.
#[must_use]
pub fn union_all<'a>(polygons: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> Option<MultiPolygon<f64>> {
    let mut iter = polygons.into_iter();
    let first = iter.next()?.clone();
    Some(iter.fold(first, |acc, mp| acc.union(mp)))
}

/// Intersection of two polygons.
#[must_use]
pub fn intersection(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    a.intersection(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 1x1 degree square with corners at (lon, lat) and (lon+1, lat+1).
    pub fn square(lon: f64, lat: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![geo::Polygon::new(
            LineString::from(vec![
                (lon, lat),
                (lon + 1.0, lat),
                (lon + 1.0, lat + 1.0),
                (lon, lat + 1.0),
                (lon, lat),
            ]),
            vec![],
        )])
    }

    #[test]
    fn parses_polygon_geojson() {
        let geojson = r#"{"type":"Polygon","coordinates":[[[-74.0,42.0],[-73.0,42.0],[-73.0,43.0],[-74.0,43.0],[-74.0,42.0]]]}"#;
        let mp = multipolygon_from_geojson(geojson).unwrap();
        assert_eq!(mp.0.len(), 1);
        assert!(contains(&mp, Point::new(42.5, -73.5)));
        assert!(!contains(&mp, Point::new(44.0, -73.5)));
    }

    #[test]
    fn parses_multipolygon_geojson() {
        let geojson = r#"{"type":"MultiPolygon","coordinates":[[[[-74.0,42.0],[-73.0,42.0],[-73.0,43.0],[-74.0,42.0]]],[[[-72.0,42.0],[-71.0,42.0],[-71.0,43.0],[-72.0,42.0]]]]}"#;
        let mp = multipolygon_from_geojson(geojson).unwrap();
        assert_eq!(mp.0.len(), 2);
    }

    #[test]
    fn rejects_non_polygon_geometry() {
        assert!(multipolygon_from_geojson(r#"{"type":"Point","coordinates":[-73.0,42.0]}"#).is_none());
        assert!(multipolygon_from_geojson("not json").is_none());
    }

    #[test]
    fn district_map_flips_coordinate_order() {
        let mp = square(-74.0, 42.0);
        let map = district_map_from(&mp, Some(DistrictType::Senate), Some("SD 44"), Some("44"));
        assert_eq!(map.geometry_type, "Polygon");
        let first = map.polygons[0].points[0];
        assert!((first.lat - 42.0).abs() < f64::EPSILON);
        assert!((first.lon - -74.0).abs() < f64::EPSILON);
    }

    #[test]
    fn boundary_distance_in_degrees() {
        let mp = square(-74.0, 42.0);
        // Center of the square is half a degree from every edge.
        let d = boundary_distance_degrees(&mp, Point::new(42.5, -73.5));
        assert!((d - 0.5).abs() < 1e-9);
        // A point just inside the west edge.
        let d = boundary_distance_degrees(&mp, Point::new(42.5, -73.999_7));
        assert!((d - 0.000_3).abs() < 1e-9);
    }

    #[test]
    fn boundary_distance_in_meters_is_plausible() {
        let mp = square(-74.0, 42.0);
        // ~0.1 degrees of longitude at 42N is roughly 8.2km.
        let d = boundary_distance_meters(&mp, Point::new(42.5, -74.1));
        assert!(d > 7_000.0 && d < 10_000.0, "unexpected distance {d}");
    }

    #[test]
    fn area_of_a_degree_square() {
        let mp = square(-74.0, 42.0);
        let area = area_sq_meters(&mp);
        // A 1x1 degree cell near 42N is on the order of 9.2e9 m^2.
        assert!(area > 8.0e9 && area < 1.1e10, "unexpected area {area}");
    }

    #[test]
    fn union_and_intersection() {
        let a = square(-74.0, 42.0);
        let b = square(-73.5, 42.0);
        let unioned = union_all([&a, &b]).unwrap();
        assert!(contains(&unioned, Point::new(42.5, -72.9)));

        let overlap = intersection(&a, &b);
        // The overlap is the half-degree strip between -73.5 and -73.0.
        assert!(area_sq_meters(&overlap) > 0.0);
        assert!(contains(&overlap, Point::new(42.5, -73.25)));
        assert!(!contains(&overlap, Point::new(42.5, -73.75)));
    }

    #[test]
    fn empty_union_is_none() {
        assert!(union_all(std::iter::empty::<&MultiPolygon<f64>>()).is_none());
    }
}
