//! District assignment and result consolidation.
//!
//! With no explicit provider, assignment runs the shapefile and
//! street-file lookups concurrently and reconciles them. Census
//! shapefile boundaries are locally imprecise; the street files encode
//! the authoritative enumeration near boundaries but are incomplete in
//! rural areas and for some district kinds. Consolidation therefore
//! starts from the shapefile result and, near a boundary, lets a
//! street-file code that names a *neighboring* shapefile district win.

use std::collections::BTreeSet;
use std::sync::Arc;

use district_map_models::{
    DistrictRequest, DistrictResult, DistrictStrategy, DistrictType, GeocodedAddress,
    ResultStatus,
};
use district_map_provider::{validate_district_info, DistrictService, ProviderRegistry};

/// Default number of neighboring districts consulted per mismatch.
pub const NEARBY_COUNT: usize = 2;

/// Default proximity threshold in coordinate units.
pub const DEFAULT_PROXIMITY_THRESHOLD: f64 = 0.001;

/// The district assignment orchestrator.
pub struct DistrictAssigner {
    registry: Arc<ProviderRegistry<dyn DistrictService>>,
    proximity_threshold: f64,
}

impl DistrictAssigner {
    #[must_use]
    pub const fn new(
        registry: Arc<ProviderRegistry<dyn DistrictService>>,
        proximity_threshold: f64,
    ) -> Self {
        Self {
            registry,
            proximity_threshold,
        }
    }

    /// Assigns districts per the request's provider or strategy.
    pub async fn assign(
        &self,
        geocoded_address: &GeocodedAddress,
        request: &DistrictRequest,
    ) -> DistrictResult {
        let district_types = request.requested_types();

        // An explicit provider bypasses consolidation entirely.
        if let Some(name) = request.provider.as_deref().filter(|name| !name.is_empty()) {
            let Some(mut provider) = self.registry.new_instance(Some(name)) else {
                log::warn!("Unsupported district provider requested: {name}");
                let mut result = DistrictResult::new(name);
                result.status = ResultStatus::ProviderNotSupported;
                return result;
            };
            provider.fetch_maps(request.show_maps);
            return provider.assign_districts(geocoded_address, &district_types).await;
        }

        if request.strategy == DistrictStrategy::StreetOnly {
            return self
                .single_provider("streetfile", geocoded_address, &district_types, false)
                .await;
        }

        let Some(mut shape_service) = self.registry.new_instance(Some("shapefile")) else {
            log::error!("Shapefile district provider is not registered");
            let mut result = DistrictResult::new("shapefile");
            result.status = ResultStatus::InternalError;
            return result;
        };
        shape_service.fetch_maps(request.show_maps);

        let street_future = self.single_provider("streetfile", geocoded_address, &district_types, false);
        let shape_future = shape_service.assign_districts(geocoded_address, &district_types);
        let (shape_result, street_result) = tokio::join!(shape_future, street_future);

        match request.strategy {
            DistrictStrategy::NeighborMatch => {
                self.consolidate_neighbor_match(
                    shape_result,
                    &street_result,
                    shape_service.as_ref(),
                    geocoded_address,
                    &district_types,
                )
                .await
            }
            DistrictStrategy::StreetFallback => {
                consolidate_fallback(shape_result, &street_result, &district_types)
            }
            DistrictStrategy::ShapeFallback => {
                consolidate_fallback(street_result, &shape_result, &district_types)
            }
            DistrictStrategy::StreetOnly => unreachable!("handled above"),
        }
    }

    async fn single_provider(
        &self,
        name: &str,
        geocoded_address: &GeocodedAddress,
        district_types: &[DistrictType],
        fetch_maps: bool,
    ) -> DistrictResult {
        let Some(mut provider) = self.registry.new_instance(Some(name)) else {
            let mut result = DistrictResult::new(name);
            result.status = ResultStatus::ProviderNotSupported;
            return result;
        };
        provider.fetch_maps(fetch_maps);
        provider.assign_districts(geocoded_address, district_types).await
    }

    /// Reconciles shapefile and street-file results.
    ///
    /// For every shapefile district whose geocode sits within the
    /// proximity threshold of the boundary:
    /// - matching street-file code: leave it;
    /// - street-file code naming a *neighboring* district: swap in the
    ///   street-file code and the neighbor's polygon;
    /// - anything else: keep the shapefile code and flag the type as
    ///   uncertain.
    ///
    /// Types the shapefile missed are copied from the street file.
    /// Given fixed inputs the output is deterministic and stable under
    /// repeated application.
    pub async fn consolidate_neighbor_match(
        &self,
        mut shape_result: DistrictResult,
        street_result: &DistrictResult,
        shape_service: &dyn DistrictService,
        geocoded_address: &GeocodedAddress,
        requested_types: &[DistrictType],
    ) -> DistrictResult {
        let shape_ok = shape_result.is_success() || shape_result.is_partial_success();
        let street_ok = street_result.is_success() || street_result.is_partial_success();

        if !shape_ok {
            // The shapefile found nothing; the street-file result (a
            // building-range match) stands on its own when present.
            if street_ok {
                log::info!(
                    "No shapefile result for {:?}; using street file alone",
                    shape_result.address().map(ToString::to_string)
                );
                return street_result.clone();
            }
            return shape_result;
        }

        let Some(mut shape_info) = shape_result.district_info.take() else {
            return shape_result;
        };
        let address = shape_result
            .address()
            .map_or_else(|| "missing address".to_string(), ToString::to_string);

        if street_ok {
            let street_info = street_result.district_info.clone().unwrap_or_default();
            let street_assigned = street_info.assigned_districts();

            for district_type in shape_info.assigned_districts() {
                let proximity = shape_info
                    .proximity(district_type)
                    .unwrap_or(f64::INFINITY);
                if proximity >= self.proximity_threshold {
                    continue;
                }
                let shape_code = shape_info.code(district_type).unwrap_or("").to_string();
                match street_info.code(district_type) {
                    Some(street_code) if !street_code.eq_ignore_ascii_case(&shape_code) => {
                        let nearby = shape_service
                            .nearby_districts(geocoded_address, district_type, NEARBY_COUNT)
                            .await;
                        if let Some(map) = nearby.get(street_code) {
                            log::debug!(
                                "Consolidating {district_type} district from {shape_code} to {street_code} for {address}"
                            );
                            let street_code = street_code.to_string();
                            if let Some(name) = &map.district_name {
                                shape_info.names.insert(district_type, name.clone());
                            }
                            shape_info.maps.insert(district_type, map.clone());
                            shape_info.codes.insert(district_type, street_code);
                        } else {
                            log::warn!(
                                "Mismatch on {district_type} | shape: {shape_code} street: {street_code} for {address}"
                            );
                            shape_info.uncertain.insert(district_type);
                        }
                    }
                    Some(_) => {
                        // Street file corroborates the shapefile.
                    }
                    None => {
                        log::trace!("{district_type} district could not be verified for {address}");
                        shape_info.uncertain.insert(district_type);
                    }
                }
            }

            // Street-file districts the shapefile has no answer for.
            let shape_assigned = shape_info.assigned_districts();
            for district_type in street_assigned.difference(&shape_assigned) {
                if let Some(code) = street_info.code(*district_type) {
                    shape_info.codes.insert(*district_type, code.to_string());
                }
            }
        } else {
            log::info!("No street file result for {address}");
            for district_type in shape_info.assigned_districts() {
                if shape_info.proximity(district_type).unwrap_or(f64::INFINITY)
                    < self.proximity_threshold
                {
                    shape_info.uncertain.insert(district_type);
                }
            }
        }

        validate_district_info(&shape_info, requested_types, &mut shape_result);
        shape_result.district_info = Some(shape_info);
        shape_result
    }
}

/// Base-plus-fill consolidation for the fallback strategies: the
/// secondary result only contributes district types the base result
/// is missing. No neighbor checks, no uncertainty marking.
#[must_use]
pub fn consolidate_fallback(
    mut base: DistrictResult,
    fill: &DistrictResult,
    requested_types: &[DistrictType],
) -> DistrictResult {
    let base_ok = base.is_success() || base.is_partial_success();
    let fill_ok = fill.is_success() || fill.is_partial_success();

    if !base_ok {
        return if fill_ok { fill.clone() } else { base };
    }
    let Some(mut base_info) = base.district_info.take() else {
        return base;
    };

    if fill_ok {
        if let Some(fill_info) = &fill.district_info {
            let assigned: BTreeSet<DistrictType> = base_info.assigned_districts();
            for district_type in fill_info.assigned_districts().difference(&assigned) {
                if let Some(code) = fill_info.code(*district_type) {
                    base_info.codes.insert(*district_type, code.to_string());
                }
                if let Some(name) = fill_info.names.get(district_type) {
                    base_info.names.insert(*district_type, name.clone());
                }
                if let Some(map) = fill_info.maps.get(district_type) {
                    base_info.maps.insert(*district_type, map.clone());
                }
            }
        }
    }

    validate_district_info(&base_info, requested_types, &mut base);
    base.district_info = Some(base_info);
    base
}
