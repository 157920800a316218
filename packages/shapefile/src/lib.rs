#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shapefile district lookup.
//!
//! Census district polygons live in `DuckDB` as `GeoJSON` and are
//! loaded once at startup into an R-tree-backed [`ShapefileStore`].
//! This crate provides the default [`DistrictService`] (point-in-
//! polygon with boundary proximity), the [`MapService`] backed by the
//! per-code map cache, and the multi-match overlap path used when a
//! geocode is too coarse for house-level assignment.

pub mod multimatch;
pub mod spatial;
pub mod store;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use district_map_models::{
    DistrictInfo, DistrictMap, DistrictMatchLevel, DistrictResult, DistrictType, GeocodedAddress,
    MapResult, Point, ResultStatus,
};
use district_map_provider::{
    validate_district_info, validate_district_input, DistrictService, MapService,
};

pub use multimatch::multi_match;
pub use store::{ShapeEntry, ShapefileError, ShapefileStore, RETRIEVE_MAP_TYPES};

/// Provider name used in registries and result sources.
pub const PROVIDER_NAME: &str = "shapefile";

/// Search radius for neighboring-district lookups, in meters.
pub const NEARBY_MAX_DISTANCE_METERS: f64 = 500.0;

/// Shapefile-backed district provider.
///
/// Instances are per-request (the `fetch_maps` flag is request
/// state); the heavy store is shared behind an `Arc`.
pub struct DistrictShapefile {
    store: Arc<ShapefileStore>,
    fetch_maps: bool,
}

impl DistrictShapefile {
    #[must_use]
    pub const fn new(store: Arc<ShapefileStore>) -> Self {
        Self {
            store,
            fetch_maps: false,
        }
    }

    /// Fills in boundary maps for every assigned district from the map
    /// cache. Existing maps (e.g. school maps captured during the
    /// point lookup) are kept unless `replace` is set.
    pub fn assign_maps(&self, info: &mut DistrictInfo, replace: bool) {
        for district_type in info.assigned_districts() {
            if !replace && info.maps.contains_key(&district_type) {
                continue;
            }
            let Some(code) = info.code(district_type) else {
                continue;
            };
            if let Some(map) = self.store.district_map(district_type, code) {
                info.maps.insert(district_type, map);
            }
        }
    }

    /// The shared shape store.
    #[must_use]
    pub fn store(&self) -> &Arc<ShapefileStore> {
        &self.store
    }
}

#[async_trait]
impl DistrictService for DistrictShapefile {
    fn requires_geocode(&self) -> bool {
        true
    }

    fn fetch_maps(&mut self, fetch: bool) {
        self.fetch_maps = fetch;
    }

    async fn assign_districts(
        &self,
        geocoded_address: &GeocodedAddress,
        district_types: &[DistrictType],
    ) -> DistrictResult {
        let mut result = DistrictResult::new(PROVIDER_NAME);
        if !validate_district_input(geocoded_address, &mut result, true) {
            return result;
        }

        let point = geocoded_address
            .geocode
            .as_ref()
            .map_or_else(|| Point::new(0.0, 0.0), |gc| gc.point());

        let mut info = self.store.district_info(point, district_types, true, true);
        if validate_district_info(&info, district_types, &mut result) {
            if self.fetch_maps {
                self.assign_maps(&mut info, false);
            }
            result.match_level = DistrictMatchLevel::House;
            result.district_info = Some(info);
            result.geocoded_address = Some(geocoded_address.clone());
        }
        result
    }

    async fn nearby_districts(
        &self,
        geocoded_address: &GeocodedAddress,
        district_type: DistrictType,
        count: usize,
    ) -> BTreeMap<String, DistrictMap> {
        if !geocoded_address.is_valid_geocode() {
            return BTreeMap::new();
        }
        let point = geocoded_address
            .geocode
            .as_ref()
            .expect("validated geocode")
            .point();
        self.store
            .nearby_districts(district_type, point, NEARBY_MAX_DISTANCE_METERS, count)
            .into_iter()
            .collect()
    }
}

impl MapService for DistrictShapefile {
    fn get_district_map(&self, district_type: DistrictType, code: &str) -> MapResult {
        if code.trim().is_empty() {
            return MapResult::new(ResultStatus::MissingInputParams);
        }
        self.store.district_map(district_type, code).map_or_else(
            || MapResult::new(ResultStatus::NoDistrictResult),
            |map| MapResult::success(vec![map]),
        )
    }

    fn get_district_maps(&self, district_type: DistrictType) -> MapResult {
        match self.store.district_maps(district_type) {
            Some(maps) if !maps.is_empty() => MapResult::success(maps),
            _ => MapResult::new(ResultStatus::NoDistrictResult),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use district_map_database::districts_db;
    use district_map_models::{Address, Geocode, GeocodeQuality, StreetRange};
    use district_map_provider::{CityZipService, StreetLookupService};

    fn square_geojson(lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> String {
        format!(
            r#"{{"type":"Polygon","coordinates":[[[{lon0},{lat0}],[{lon1},{lat0}],[{lon1},{lat1}],[{lon0},{lat1}],[{lon0},{lat0}]]]}}"#
        )
    }

    /// Fixture layout (lon east-positive, all lat 42..43):
    /// senate 44 covers -74..-73.5, senate 41 covers -73.5..-73,
    /// senate 40 covers -73..-72.5. Zip 12210 covers -74..-73.6,
    /// zip 12211 covers -73.6..-73.4. County FIPS 36001 -> id 1 covers
    /// the whole area, as do assembly 109 / congressional 20 / town
    /// ALBANY / school 6.
    fn fixture_store() -> Arc<ShapefileStore> {
        let conn = districts_db::open_in_memory().unwrap();

        districts_db::insert_district(
            &conn,
            DistrictType::Senate,
            "Senate District 44",
            "044",
            &square_geojson(-74.0, 42.0, -73.5, 43.0),
        )
        .unwrap();
        districts_db::insert_district(
            &conn,
            DistrictType::Senate,
            "Senate District 41",
            "041",
            &square_geojson(-73.5, 42.0, -73.0, 43.0),
        )
        .unwrap();
        districts_db::insert_district(
            &conn,
            DistrictType::Senate,
            "Senate District 40",
            "040",
            &square_geojson(-73.0, 42.0, -72.5, 43.0),
        )
        .unwrap();

        districts_db::insert_district(
            &conn,
            DistrictType::Assembly,
            "Assembly District 109",
            "109",
            &square_geojson(-74.0, 42.0, -72.5, 43.0),
        )
        .unwrap();
        districts_db::insert_district(
            &conn,
            DistrictType::Congressional,
            "Congressional District 20",
            "20",
            &square_geojson(-74.0, 42.0, -72.5, 43.0),
        )
        .unwrap();
        districts_db::insert_district(
            &conn,
            DistrictType::County,
            "Albany",
            "36001",
            &square_geojson(-74.0, 42.0, -72.5, 43.0),
        )
        .unwrap();
        districts_db::insert_district(
            &conn,
            DistrictType::Town,
            "Albany",
            "ALBANY",
            &square_geojson(-74.0, 42.0, -72.5, 43.0),
        )
        .unwrap();
        districts_db::insert_district(
            &conn,
            DistrictType::School,
            "Albany City SD",
            "006",
            &square_geojson(-74.0, 42.0, -72.5, 43.0),
        )
        .unwrap();

        districts_db::insert_district(
            &conn,
            DistrictType::Zip,
            "",
            "12210",
            &square_geojson(-74.0, 42.0, -73.6, 43.0),
        )
        .unwrap();
        districts_db::insert_district(
            &conn,
            DistrictType::Zip,
            "",
            "12211",
            &square_geojson(-73.6, 42.0, -73.4, 43.0),
        )
        .unwrap();

        districts_db::insert_county(&conn, 36001, 1, "Albany").unwrap();

        Arc::new(ShapefileStore::load(&conn).unwrap())
    }

    fn geocoded(lat: f64, lon: f64, quality: GeocodeQuality) -> GeocodedAddress {
        GeocodedAddress::new(
            Some(Address::new("200 State St", "", "Albany", "NY", "12210", "")),
            Some(Geocode::new(lat, lon, quality, "test")),
        )
    }

    #[tokio::test]
    async fn assigns_standard_districts_for_a_point() {
        let provider = DistrictShapefile::new(fixture_store());
        let result = provider
            .assign_districts(
                &geocoded(42.5, -73.8, GeocodeQuality::House),
                DistrictType::standard_types(),
            )
            .await;

        assert_eq!(result.status, ResultStatus::Success);
        assert_eq!(result.match_level, DistrictMatchLevel::House);
        let info = result.district_info.unwrap();
        assert_eq!(info.code(DistrictType::Senate), Some("44"));
        assert_eq!(info.code(DistrictType::Assembly), Some("109"));
        // County FIPS 36001 translated to the internal id.
        assert_eq!(info.code(DistrictType::County), Some("1"));
        // School maps are fetched with the point lookup.
        assert!(info.maps.contains_key(&DistrictType::School));
    }

    #[tokio::test]
    async fn leading_zeros_are_trimmed() {
        let provider = DistrictShapefile::new(fixture_store());
        let result = provider
            .assign_districts(
                &geocoded(42.5, -73.2, GeocodeQuality::House),
                &[DistrictType::Senate],
            )
            .await;
        let info = result.district_info.unwrap();
        assert_eq!(info.code(DistrictType::Senate), Some("40"));
    }

    #[tokio::test]
    async fn proximity_reflects_boundary_distance() {
        let provider = DistrictShapefile::new(fixture_store());
        // 0.0003 degrees west of the 44/41 boundary at -73.5.
        let result = provider
            .assign_districts(
                &geocoded(42.5, -73.500_3, GeocodeQuality::House),
                &[DistrictType::Senate],
            )
            .await;
        let info = result.district_info.unwrap();
        assert_eq!(info.code(DistrictType::Senate), Some("44"));
        let proximity = info.proximity(DistrictType::Senate).unwrap();
        assert!((proximity - 0.000_3).abs() < 1e-9, "proximity {proximity}");
    }

    #[tokio::test]
    async fn out_of_area_point_is_no_district_result() {
        let provider = DistrictShapefile::new(fixture_store());
        let result = provider
            .assign_districts(
                &geocoded(10.0, 10.0, GeocodeQuality::House),
                DistrictType::standard_types(),
            )
            .await;
        assert_eq!(result.status, ResultStatus::NoDistrictResult);
    }

    #[tokio::test]
    async fn nearby_excludes_containing_district() {
        let provider = DistrictShapefile::new(fixture_store());
        // Just inside senate 44, ~30m west of the 41 boundary.
        let nearby = provider
            .nearby_districts(
                &geocoded(42.5, -73.500_3, GeocodeQuality::House),
                DistrictType::Senate,
                2,
            )
            .await;
        assert!(nearby.contains_key("41"));
        assert!(!nearby.contains_key("44"));
    }

    #[test]
    fn map_service_serves_cached_maps() {
        let provider = DistrictShapefile::new(fixture_store());
        let result = provider.get_district_map(DistrictType::Senate, "044");
        assert_eq!(result.status, ResultStatus::Success);
        assert_eq!(result.maps[0].district_code.as_deref(), Some("44"));

        let all = provider.get_district_maps(DistrictType::Senate);
        assert_eq!(all.maps.len(), 3);

        // School maps are not cached by code.
        let school = provider.get_district_map(DistrictType::School, "6");
        assert_eq!(school.status, ResultStatus::NoDistrictResult);
    }

    #[test]
    fn overlap_measures_intersections() {
        let store = fixture_store();
        let zips = BTreeSet::from(["12210".to_string(), "12211".to_string()]);
        let overlap = store
            .district_overlap(DistrictType::Senate, None, DistrictType::Zip, &zips)
            .unwrap();

        // The zip union spans -74..-73.4: all of senate 44 plus a
        // 0.1-degree sliver of 41; senate 40 does not intersect.
        assert!(overlap.target_overlap.contains_key("44"));
        assert!(overlap.target_overlap.contains_key("41"));
        assert!(!overlap.target_overlap.contains_key("40"));
        assert!(overlap.target_overlap["44"] > overlap.target_overlap["41"]);
        assert_eq!(overlap.overlap_district_codes()[0], "44");
        assert!(overlap.total_area > 0.0);
        // Senate targets carry intersection geometry.
        assert!(overlap.intersection_maps.contains_key("44"));
    }

    #[test]
    fn reference_boundary_unions_zips() {
        let store = fixture_store();
        let zips = BTreeSet::from(["12210".to_string(), "12211".to_string()]);
        let map = store
            .overlap_reference_boundary(DistrictType::Zip, &zips)
            .unwrap();
        assert!(!map.is_empty());
    }

    #[test]
    fn clear_cache_empties_map_lookup() {
        let store = fixture_store();
        assert!(store.district_map(DistrictType::Senate, "44").is_some());
        store.clear_cache();
        assert!(store.district_map(DistrictType::Senate, "44").is_none());
        store.cache_district_maps();
        assert!(store.district_map(DistrictType::Senate, "44").is_some());
    }

    // --- multi-match ---

    struct FakeStreets;

    impl StreetLookupService for FakeStreets {
        fn all_district_matches(
            &self,
            _streets: &[String],
            zip5s: &[String],
        ) -> BTreeMap<DistrictType, BTreeSet<String>> {
            let mut matches = BTreeMap::new();
            if zip5s.is_empty() {
                return matches;
            }
            matches.insert(
                DistrictType::Senate,
                BTreeSet::from(["44".to_string(), "41".to_string()]),
            );
            matches.insert(DistrictType::Assembly, BTreeSet::from(["109".to_string()]));
            matches
        }

        fn street_ranges(&self, _street: &str, _zip5s: &[String]) -> Vec<StreetRange> {
            vec![StreetRange::default()]
        }
    }

    struct FakeCityZip;

    impl CityZipService for FakeCityZip {
        fn zips_by_city(&self, city: &str) -> Vec<String> {
            if city.eq_ignore_ascii_case("albany") {
                vec!["12210".to_string(), "12211".to_string()]
            } else {
                Vec::new()
            }
        }
    }

    #[test]
    fn city_level_multi_match_attaches_overlaps() {
        let store = fixture_store();
        let geocoded = GeocodedAddress::new(
            Some(Address::new("", "", "Albany", "NY", "", "")),
            Some(Geocode::new(42.5, -73.8, GeocodeQuality::City, "test")),
        );

        let result = multi_match(&store, &FakeStreets, &FakeCityZip, &geocoded, false);
        assert_eq!(result.status, ResultStatus::Success);
        assert_eq!(result.match_level, DistrictMatchLevel::City);

        let info = result.district_info.unwrap();
        // Ambiguous senate candidates stay unset but carry an overlap.
        assert!(info.code(DistrictType::Senate).is_none());
        assert_eq!(info.overlaps[&DistrictType::Senate].target_overlap.len(), 2);
        // Singleton assembly collapses to its code.
        assert_eq!(info.code(DistrictType::Assembly), Some("109"));
        // City matches carry the zip union as the reference boundary.
        assert!(info.reference_map.is_some());
    }

    #[test]
    fn zip_level_multi_match_uses_the_supplied_zip() {
        let store = fixture_store();
        let geocoded = GeocodedAddress::new(
            Some(Address::new("", "", "Albany", "NY", "12210", "")),
            Some(Geocode::new(42.5, -73.8, GeocodeQuality::Zip, "test")),
        );

        let result = multi_match(&store, &FakeStreets, &FakeCityZip, &geocoded, true);
        assert_eq!(result.match_level, DistrictMatchLevel::Zip5);
        let info = result.district_info.unwrap();
        // Senate always gets an overlap; only zip 12210 is in the
        // reference so senate 44 wins outright.
        let senate = &info.overlaps[&DistrictType::Senate];
        assert_eq!(senate.target_overlap.len(), 1);
        assert_eq!(info.code(DistrictType::Senate), Some("44"));
    }

    #[test]
    fn sub_city_quality_is_rejected() {
        let store = fixture_store();
        let geocoded = GeocodedAddress::new(
            Some(Address::new("", "", "Albany", "NY", "", "")),
            Some(Geocode::new(42.5, -73.8, GeocodeQuality::County, "test")),
        );

        let result = multi_match(&store, &FakeStreets, &FakeCityZip, &geocoded, false);
        assert_eq!(result.status, ResultStatus::InsufficientAddress);
        assert_eq!(result.match_level, DistrictMatchLevel::NoMatch);
    }

    #[test]
    fn street_level_multi_match_collects_ranges() {
        let store = fixture_store();
        let geocoded = GeocodedAddress::new(
            Some(Address::new("State St", "", "Albany", "NY", "12210", "")),
            Some(Geocode::new(42.5, -73.8, GeocodeQuality::Street, "test")),
        );

        let result = multi_match(&store, &FakeStreets, &FakeCityZip, &geocoded, true);
        assert_eq!(result.match_level, DistrictMatchLevel::Street);
        let info = result.district_info.unwrap();
        assert!(!info.street_ranges.is_empty());
        // Street level skips the zip reference map.
        assert!(info.reference_map.is_none());
    }
}
