//! The in-memory district shape store.
//!
//! Loaded once at startup from the districts `DuckDB`: every boundary
//! row is decoded from `GeoJSON` and indexed in one R-tree per
//! district type for point lookups. A second structure, the map cache,
//! unions geometry per district code for map retrieval and overlap
//! math. School district codes are not unique statewide, so that type
//! is excluded from the code cache and its maps are produced from the
//! matched row during point lookups instead.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use duckdb::Connection;
use geo::MultiPolygon;
use rstar::{RTree, RTreeObject, AABB};

use district_map_database::districts_db::{self, County};
use district_map_database::DbError;
use district_map_models::{
    trim_leading_zeros, DistrictInfo, DistrictMap, DistrictOverlap, DistrictType, Point,
};

use crate::spatial;

/// District types whose codes are not unique statewide; their maps are
/// fetched per matched row rather than cached per code.
pub const RETRIEVE_MAP_TYPES: &[DistrictType] = &[DistrictType::School];

/// One boundary row held in the R-tree.
pub struct ShapeEntry {
    pub district_type: DistrictType,
    pub name: String,
    /// Trimmed public code (county rows already translated from FIPS).
    pub code: String,
    pub polygon: MultiPolygon<f64>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for ShapeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Per-code unioned geometry and maps, rebuilt by
/// [`ShapefileStore::cache_district_maps`].
#[derive(Default)]
struct MapCache {
    maps_by_type: BTreeMap<DistrictType, Vec<DistrictMap>>,
    maps_by_code: BTreeMap<DistrictType, BTreeMap<String, DistrictMap>>,
    geometry_by_code: BTreeMap<DistrictType, BTreeMap<String, MultiPolygon<f64>>>,
}

/// Errors from loading the shape store.
#[derive(Debug, thiserror::Error)]
pub enum ShapefileError {
    /// Reading boundary rows failed.
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

/// The process-wide district shape store.
///
/// The R-trees are immutable after load. The map cache sits behind a
/// lock only so the administrative `clear_cache`/`cache_district_maps`
/// pair can swap it; request paths take read access.
pub struct ShapefileStore {
    trees: BTreeMap<DistrictType, RTree<ShapeEntry>>,
    counties: BTreeMap<i64, County>,
    cache: RwLock<MapCache>,
}

impl ShapefileStore {
    /// Loads all district polygons and builds the spatial indexes and
    /// map caches.
    ///
    /// # Errors
    ///
    /// Returns [`ShapefileError`] if the database reads fail. Rows
    /// with undecodable geometry are skipped with a warning.
    pub fn load(conn: &Connection) -> Result<Self, ShapefileError> {
        let counties = districts_db::fips_county_map(conn)?;

        let mut trees = BTreeMap::new();
        for district_type in DistrictType::ALL {
            let rows = districts_db::district_rows(conn, *district_type)?;
            let mut entries = Vec::new();
            for (name, raw_code, geojson) in rows {
                let Some(polygon) = spatial::multipolygon_from_geojson(&geojson) else {
                    log::warn!("Undecodable geometry for {district_type} {raw_code}, skipping");
                    continue;
                };
                let code = resolve_code(*district_type, &raw_code, &counties);
                let envelope = spatial::envelope(&polygon);
                entries.push(ShapeEntry {
                    district_type: *district_type,
                    name,
                    code,
                    polygon,
                    envelope,
                });
            }
            if !entries.is_empty() {
                log::info!("Indexed {} {district_type} shapes", entries.len());
            }
            trees.insert(*district_type, RTree::bulk_load(entries));
        }

        let store = Self {
            trees,
            counties,
            cache: RwLock::new(MapCache::default()),
        };
        store.cache_district_maps();
        Ok(store)
    }

    /// Rebuilds the per-type and per-code map caches from the indexed
    /// shapes.
    pub fn cache_district_maps(&self) {
        let mut cache = MapCache::default();
        for (district_type, tree) in &self.trees {
            if RETRIEVE_MAP_TYPES.contains(district_type) {
                continue;
            }
            let mut grouped: BTreeMap<String, (String, Vec<&MultiPolygon<f64>>)> = BTreeMap::new();
            for entry in tree.iter() {
                let slot = grouped
                    .entry(entry.code.clone())
                    .or_insert_with(|| (entry.name.clone(), Vec::new()));
                slot.1.push(&entry.polygon);
            }

            let mut by_code = BTreeMap::new();
            let mut geometry = BTreeMap::new();
            let mut maps = Vec::new();
            for (code, (name, polygons)) in grouped {
                let Some(unioned) = spatial::union_all(polygons) else {
                    continue;
                };
                let map = spatial::district_map_from(
                    &unioned,
                    Some(*district_type),
                    Some(&name),
                    Some(&code),
                );
                maps.push(map.clone());
                by_code.insert(code.clone(), map);
                geometry.insert(code, unioned);
            }
            cache.maps_by_type.insert(*district_type, maps);
            cache.maps_by_code.insert(*district_type, by_code);
            cache.geometry_by_code.insert(*district_type, geometry);
        }
        *self.cache.write().expect("map cache poisoned") = cache;
        log::info!("Cached standard district maps");
    }

    /// Empties the map caches. Administrative operation; must not run
    /// concurrently with request traffic.
    pub fn clear_cache(&self) {
        *self.cache.write().expect("map cache poisoned") = MapCache::default();
    }

    /// Resolves the districts containing a point.
    ///
    /// One row per requested type: name, trimmed code, optionally the
    /// row geometry for the non-cacheable types, and optionally the
    /// distance to the district boundary in coordinate units.
    #[must_use]
    pub fn district_info(
        &self,
        point: Point,
        district_types: &[DistrictType],
        fetch_special_maps: bool,
        fetch_proximity: bool,
    ) -> DistrictInfo {
        let mut info = DistrictInfo::default();
        for district_type in district_types {
            let Some(tree) = self.trees.get(district_type) else {
                continue;
            };
            let query = AABB::from_point([point.lon, point.lat]);
            let hit = tree
                .locate_in_envelope_intersecting(&query)
                .find(|entry| spatial::contains(&entry.polygon, point));
            let Some(entry) = hit else {
                continue;
            };

            info.set_district(*district_type, &entry.name, &entry.code);
            if fetch_special_maps && RETRIEVE_MAP_TYPES.contains(district_type) {
                info.maps.insert(
                    *district_type,
                    spatial::district_map_from(
                        &entry.polygon,
                        Some(*district_type),
                        Some(&entry.name),
                        Some(&entry.code),
                    ),
                );
            }
            if fetch_proximity {
                info.proximities.insert(
                    *district_type,
                    spatial::boundary_distance_degrees(&entry.polygon, point),
                );
            }
        }
        info
    }

    /// Districts of one type near a point, excluding the containing
    /// district, ordered closest-first and truncated to `limit`.
    #[must_use]
    pub fn nearby_districts(
        &self,
        district_type: DistrictType,
        point: Point,
        max_distance_meters: f64,
        limit: usize,
    ) -> Vec<(String, DistrictMap)> {
        let Some(tree) = self.trees.get(&district_type) else {
            return Vec::new();
        };

        // Closest distance per code; a district can span several rows.
        let mut by_code: BTreeMap<String, (f64, &ShapeEntry)> = BTreeMap::new();
        for entry in tree.iter() {
            if spatial::contains(&entry.polygon, point) {
                continue;
            }
            let distance = spatial::boundary_distance_meters(&entry.polygon, point);
            if distance >= max_distance_meters {
                continue;
            }
            match by_code.get(&entry.code) {
                Some((best, _)) if *best <= distance => {}
                _ => {
                    by_code.insert(entry.code.clone(), (distance, entry));
                }
            }
        }

        let mut ordered: Vec<(String, f64, &ShapeEntry)> = by_code
            .into_iter()
            .map(|(code, (distance, entry))| (code, distance, entry))
            .collect();
        ordered.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        ordered.truncate(limit);

        ordered
            .into_iter()
            .map(|(code, _, entry)| {
                let map = spatial::district_map_from(
                    &entry.polygon,
                    Some(district_type),
                    Some(&entry.name),
                    Some(&code),
                );
                (code, map)
            })
            .collect()
    }

    /// Computes the intersection areas between target districts and
    /// the union of a reference district set.
    ///
    /// With `target_codes = None`, every district of the target type
    /// that intersects the reference area (area > 0) is included.
    /// Senate targets additionally carry their intersection polygon.
    /// Returns `None` when the reference set resolves to no geometry.
    #[must_use]
    pub fn district_overlap(
        &self,
        target_type: DistrictType,
        target_codes: Option<&BTreeSet<String>>,
        ref_type: DistrictType,
        ref_codes: &BTreeSet<String>,
    ) -> Option<DistrictOverlap> {
        let cache = self.cache.read().expect("map cache poisoned");

        let ref_geometry = {
            let by_code = cache.geometry_by_code.get(&ref_type)?;
            let polygons: Vec<&MultiPolygon<f64>> = ref_codes
                .iter()
                .filter_map(|code| by_code.get(&trim_leading_zeros(code)))
                .collect();
            spatial::union_all(polygons)?
        };

        let targets = cache.geometry_by_code.get(&target_type)?;
        let wanted: Option<BTreeSet<String>> =
            target_codes.map(|codes| codes.iter().map(|c| trim_leading_zeros(c)).collect());

        let mut overlap = DistrictOverlap::new(ref_type, target_type, ref_codes.clone());
        overlap.total_area = spatial::area_sq_meters(&ref_geometry);

        for (code, geometry) in targets {
            if let Some(wanted) = &wanted {
                if !wanted.contains(code) {
                    continue;
                }
            }
            let intersected = spatial::intersection(geometry, &ref_geometry);
            let area = spatial::area_sq_meters(&intersected);
            if area <= 0.0 {
                continue;
            }
            overlap.target_overlap.insert(code.clone(), area);
            if target_type == DistrictType::Senate {
                overlap.intersection_maps.insert(
                    code.clone(),
                    spatial::district_map_from(&intersected, Some(target_type), None, Some(code)),
                );
            }
        }
        Some(overlap)
    }

    /// The polygonized union of a reference district set, or `None`
    /// when no geometry matches.
    #[must_use]
    pub fn overlap_reference_boundary(
        &self,
        ref_type: DistrictType,
        ref_codes: &BTreeSet<String>,
    ) -> Option<DistrictMap> {
        let cache = self.cache.read().expect("map cache poisoned");
        let by_code = cache.geometry_by_code.get(&ref_type)?;
        let polygons: Vec<&MultiPolygon<f64>> = ref_codes
            .iter()
            .filter_map(|code| by_code.get(&trim_leading_zeros(code)))
            .collect();
        let unioned = spatial::union_all(polygons)?;
        Some(spatial::district_map_from(&unioned, Some(ref_type), None, None))
    }

    /// The cached boundary map for one district.
    #[must_use]
    pub fn district_map(&self, district_type: DistrictType, code: &str) -> Option<DistrictMap> {
        let cache = self.cache.read().expect("map cache poisoned");
        cache
            .maps_by_code
            .get(&district_type)?
            .get(&trim_leading_zeros(code))
            .cloned()
    }

    /// All cached boundary maps of one district type.
    #[must_use]
    pub fn district_maps(&self, district_type: DistrictType) -> Option<Vec<DistrictMap>> {
        let cache = self.cache.read().expect("map cache poisoned");
        cache.maps_by_type.get(&district_type).cloned()
    }

    /// The FIPS → county translation loaded with the store.
    #[must_use]
    pub const fn counties(&self) -> &BTreeMap<i64, County> {
        &self.counties
    }
}

/// Translates a stored district code to its public form. County rows
/// are keyed by census FIPS and map to the internal county id; every
/// code loses its leading zeros.
fn resolve_code(
    district_type: DistrictType,
    raw_code: &str,
    counties: &BTreeMap<i64, County>,
) -> String {
    if district_type == DistrictType::County {
        if let Ok(fips) = raw_code.trim().parse::<i64>() {
            if let Some(county) = counties.get(&fips) {
                return county.id.to_string();
            }
        }
        log::warn!("No county mapping for FIPS {raw_code}");
    }
    trim_leading_zeros(raw_code)
}
