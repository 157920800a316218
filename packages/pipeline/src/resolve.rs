//! The end-to-end district resolution pipeline.
//!
//! Orchestrates the full flow for one request: parse → optional USPS
//! correction → geocode (with cache and fallback chain) → district
//! assignment (standard or multi-match) → PO box restoration → map
//! attachment → member metadata. Point input reverse-geocodes first
//! and proceeds with a POINT-quality geocode.

use std::sync::Arc;

use district_map_address as address_parser;
use district_map_database::{districts_db, SharedConnection};
use district_map_models::{
    Address, DistrictRequest, DistrictResult, Geocode, GeocodeQuality, GeocodeRequest,
    GeocodedAddress, Point, ResultStatus, StreetAddress,
};
use district_map_provider::{
    AddressService, CityZipService, ProviderRegistry, StreetLookupService,
};
use district_map_shapefile::{multi_match, ShapefileStore};

use crate::assign::DistrictAssigner;
use crate::geocode::GeocodeServiceProvider;
use crate::parallel::ordered_fan_out;

/// Source tag for results produced by the resolver itself (input
/// validation failures and the like).
pub const SOURCE: &str = "assign";

/// Method tag for caller-supplied points.
pub const POINT_METHOD: &str = "user supplied";

/// District types that carry member metadata.
const MEMBER_TYPES: &[district_map_models::DistrictType] = &[
    district_map_models::DistrictType::Senate,
    district_map_models::DistrictType::Assembly,
    district_map_models::DistrictType::Congressional,
];

/// The top-level resolution pipeline.
pub struct DistrictResolver {
    address_registry: Arc<ProviderRegistry<dyn AddressService>>,
    geocoder: Arc<GeocodeServiceProvider>,
    assigner: Arc<DistrictAssigner>,
    store: Arc<ShapefileStore>,
    street_lookup: Arc<dyn StreetLookupService>,
    city_zip: Arc<dyn CityZipService>,
    members_conn: Option<SharedConnection>,
    threads: usize,
}

impl DistrictResolver {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub const fn new(
        address_registry: Arc<ProviderRegistry<dyn AddressService>>,
        geocoder: Arc<GeocodeServiceProvider>,
        assigner: Arc<DistrictAssigner>,
        store: Arc<ShapefileStore>,
        street_lookup: Arc<dyn StreetLookupService>,
        city_zip: Arc<dyn CityZipService>,
        members_conn: Option<SharedConnection>,
        threads: usize,
    ) -> Self {
        Self {
            address_registry,
            geocoder,
            assigner,
            store,
            street_lookup,
            city_zip,
            members_conn,
            threads,
        }
    }

    /// Resolves districts for one request.
    pub async fn resolve(&self, request: &DistrictRequest) -> DistrictResult {
        if let Some(address) = request.address.as_ref().filter(|a| !a.is_empty()) {
            self.resolve_address(address, request).await
        } else if let Some(point) = request.point {
            self.resolve_point(point, request).await
        } else {
            let mut result = DistrictResult::new(SOURCE);
            result.status = ResultStatus::MissingInputParams;
            result
        }
    }

    async fn resolve_address(&self, address: &Address, request: &DistrictRequest) -> DistrictResult {
        // Out-of-state input fails fast; no providers are consulted.
        if !address.is_ny_state() {
            let mut result = DistrictResult::new(SOURCE);
            result.status = ResultStatus::NonNyState;
            result.geocoded_address = Some(GeocodedAddress::from_address(address.clone()));
            return result;
        }

        let sa = address_parser::parse(address);
        let is_po_box = sa.is_po_box();
        let mut zip_provided = sa.zip5.len() == 5;

        // USPS correction, parsed form first, raw input as a retry.
        let validated = if request.usps_validate {
            let corrected = match self.correct_address(&sa.to_address()).await {
                Some(corrected) => Some(corrected),
                None => self.correct_address(address).await,
            };
            if let Some(corrected) = &corrected {
                // The validated zip drives downstream multi-match.
                zip_provided = address_parser::parse(corrected).zip5.len() == 5;
            }
            corrected
        } else {
            None
        };

        let address_to_geocode = validated.clone().unwrap_or_else(|| address.clone());
        let mut geocoded = GeocodedAddress::from_address(address_to_geocode.clone());

        if !request.skip_geocode {
            // PO box geocoding works better with the box line blanked;
            // providers then resolve the city/zip centroid.
            let mut geocode_input = address_to_geocode.clone();
            if is_po_box {
                geocode_input.addr1 = String::new();
            }
            let mut geocode_request = GeocodeRequest::for_address(geocode_input);
            geocode_request.provider = request.geo_provider.clone();
            let geocode_result = self.geocoder.geocode(&geocode_request).await;
            if let Some(ga) = geocode_result.geocoded_address {
                geocoded = ga;
            }
        }
        if let Some(validated) = &validated {
            geocoded.address = Some(validated.clone());
        }

        let mut result = self
            .perform_assign(&geocoded, request, zip_provided, is_po_box)
            .await;

        // A PO box that skipped USPS validation gets its box line back
        // (geocoding saw a blanked line).
        if validated.is_none() && is_po_box {
            restore_po_box_line(&mut result, &sa);
        }

        self.finish(&mut result, request);
        result
    }

    async fn resolve_point(&self, point: Point, request: &DistrictRequest) -> DistrictResult {
        let geocode = Geocode::new(point.lat, point.lon, GeocodeQuality::Point, POINT_METHOD);
        let mut geocoded = GeocodedAddress::new(None, Some(geocode));

        if !request.skip_geocode {
            let reverse_result = self.geocoder.geocode(&GeocodeRequest::for_point(point)).await;
            if let Some(ga) = reverse_result.geocoded_address {
                geocoded.address = ga.address;
            }
        }

        let mut result = self.perform_assign(&geocoded, request, false, false).await;
        self.finish(&mut result, request);
        result
    }

    /// Routes between the standard assignment path and multi-match
    /// based on geocode quality and input shape.
    async fn perform_assign(
        &self,
        geocoded: &GeocodedAddress,
        request: &DistrictRequest,
        zip_provided: bool,
        is_po_box: bool,
    ) -> DistrictResult {
        if geocoded.is_valid_address() {
            if geocoded.is_valid_geocode() {
                let quality = geocoded
                    .geocode
                    .as_ref()
                    .map_or(GeocodeQuality::Unknown, |gc| gc.quality);
                if quality >= GeocodeQuality::House || is_po_box {
                    self.assigner.assign(geocoded, request).await
                } else {
                    multi_match(
                        self.store.as_ref(),
                        self.street_lookup.as_ref(),
                        self.city_zip.as_ref(),
                        geocoded,
                        zip_provided,
                    )
                }
            } else if request.provider.as_ref().is_some_and(|p| !p.is_empty()) {
                // A named provider validates its own input; the street
                // file needs no geocode at all.
                self.assigner.assign(geocoded, request).await
            } else {
                let mut result = DistrictResult::new(SOURCE);
                result.status = ResultStatus::InvalidGeocode;
                result.geocoded_address = Some(geocoded.clone());
                result
            }
        } else if geocoded.is_valid_geocode() {
            // Geocode-only input can still be resolved by shapefiles.
            let mut shape_request = request.clone();
            shape_request.provider = Some("shapefile".to_string());
            self.assigner.assign(geocoded, &shape_request).await
        } else {
            let mut result = DistrictResult::new(SOURCE);
            result.status = ResultStatus::MissingAddress;
            result
        }
    }

    /// Post-assignment steps shared by both input kinds: boundary maps
    /// and member metadata.
    fn finish(&self, result: &mut DistrictResult, request: &DistrictRequest) {
        if !(result.is_success() || result.is_partial_success()) {
            return;
        }
        if request.show_maps {
            if let Some(info) = &mut result.district_info {
                for district_type in info.assigned_districts() {
                    if info.maps.contains_key(&district_type) {
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
        }
        if request.show_members {
            self.attach_members(result);
        }
    }

    fn attach_members(&self, result: &mut DistrictResult) {
        let Some(conn) = &self.members_conn else {
            return;
        };
        let Some(info) = &mut result.district_info else {
            return;
        };
        let conn = conn.lock().expect("districts connection poisoned");
        for district_type in MEMBER_TYPES {
            let Some(code) = info.code(*district_type) else {
                continue;
            };
            match districts_db::member_for(&conn, *district_type, code) {
                Ok(Some(member)) => {
                    info.members.insert(*district_type, member);
                }
                Ok(None) => {}
                Err(e) => log::warn!("Member lookup failed for {district_type} {code}: {e}"),
            }
        }
    }

    async fn correct_address(&self, address: &Address) -> Option<Address> {
        let provider = self.address_registry.new_instance(None)?;
        log::debug!("USPS validating: {address}");
        let result = provider.validate(address).await;
        if result.validated {
            result.address
        } else {
            None
        }
    }

    /// Resolves a batch of addresses: batch geocode, batch USPS
    /// validation, then bounded-parallel assignment. Results are in
    /// one-to-one positional correspondence with the inputs.
    pub async fn resolve_batch(
        &self,
        addresses: &[Address],
        request: &DistrictRequest,
    ) -> Vec<DistrictResult> {
        let geocode_results = if request.skip_geocode {
            None
        } else {
            Some(
                self.geocoder
                    .geocode_batch(addresses, request.geo_provider.as_deref())
                    .await,
            )
        };

        let validated = if request.usps_validate {
            match self.address_registry.new_instance(None) {
                Some(provider) => Some(provider.validate_batch(addresses).await),
                None => None,
            }
        } else {
            None
        };

        let items: Vec<(usize, Address)> = addresses
            .iter()
            .cloned()
            .enumerate()
            .collect();

        ordered_fan_out(items, self.threads, |(index, address)| {
            let geocode = geocode_results
                .as_ref()
                .and_then(|results| results.get(index))
                .and_then(|r| r.geocoded_address.as_ref())
                .and_then(|ga| ga.geocode.clone());
            let corrected = validated
                .as_ref()
                .and_then(|results| results.get(index))
                .filter(|r| r.validated)
                .and_then(|r| r.address.clone());

            async move {
                let effective = corrected.clone().unwrap_or(address);
                let sa = address_parser::parse(&effective);
                let geocoded = GeocodedAddress::new(Some(effective), geocode);
                let mut result = self
                    .perform_assign(
                        &geocoded,
                        request,
                        sa.zip5.len() == 5,
                        sa.is_po_box(),
                    )
                    .await;
                if corrected.is_none() && sa.is_po_box() {
                    restore_po_box_line(&mut result, &sa);
                }
                self.finish(&mut result, request);
                result
            }
        })
        .await
    }
}

/// Rewrites the result's street line back to `PO Box {n}`.
fn restore_po_box_line(result: &mut DistrictResult, sa: &StreetAddress) {
    if let Some(address) = result
        .geocoded_address
        .as_mut()
        .and_then(|ga| ga.address.as_mut())
    {
        address.addr1 = format!("PO Box {}", sa.po_box);
    }
}
