//! Capability traits implemented by service providers.
//!
//! Each trait is one pluggable concern. Providers are constructed
//! fresh for every request through the registry; shared resources
//! (database handles, HTTP clients, caches) enter through `Arc`s
//! captured by the factory closure, so per-request state like the
//! `fetch_maps` flag never leaks across requests.

use std::collections::BTreeMap;

use async_trait::async_trait;

use district_map_models::{
    Address, AddressResult, DistrictMap, DistrictResult, DistrictType, GeocodeResult,
    GeocodedAddress, MapResult, Point, StreetRange,
};

/// Address validation and lookup (USPS-style correction).
#[async_trait]
pub trait AddressService: Send + Sync {
    /// Validates and corrects an address, filling in missing fields.
    async fn validate(&self, address: &Address) -> AddressResult;

    /// Validates a batch of addresses; the result list is positional.
    async fn validate_batch(&self, addresses: &[Address]) -> Vec<AddressResult> {
        let mut results = Vec::with_capacity(addresses.len());
        for address in addresses {
            results.push(self.validate(address).await);
        }
        results
    }

    /// Fills in the city and state for a zip-only address.
    async fn lookup_city_state(&self, address: &Address) -> AddressResult;

    /// Fills in the zip code for a city/state address.
    async fn lookup_zipcode(&self, address: &Address) -> AddressResult;
}

/// Forward and reverse geocoding.
#[async_trait]
pub trait GeocodeService: Send + Sync {
    /// Resolves an address to a coordinate pair.
    async fn geocode(&self, address: &Address) -> GeocodeResult;

    /// Resolves a point to the nearest address.
    async fn reverse_geocode(&self, point: Point) -> GeocodeResult;

    /// Native batch geocode; the default implementation is sequential,
    /// and the pipeline substitutes its bounded fan-out when a
    /// provider keeps this default.
    async fn geocode_batch(&self, addresses: &[Address]) -> Vec<GeocodeResult> {
        let mut results = Vec::with_capacity(addresses.len());
        for address in addresses {
            results.push(self.geocode(address).await);
        }
        results
    }
}

/// District assignment for a geocoded address.
#[async_trait]
pub trait DistrictService: Send + Sync {
    /// Whether this provider needs a geocode (rather than just an
    /// address) to assign districts.
    fn requires_geocode(&self) -> bool {
        true
    }

    /// Requests boundary maps on the results of subsequent calls.
    fn fetch_maps(&mut self, fetch: bool);

    /// Assigns the requested district types to a geocoded address.
    async fn assign_districts(
        &self,
        geocoded_address: &GeocodedAddress,
        district_types: &[DistrictType],
    ) -> DistrictResult;

    /// Districts of the given type near the geocode, excluding the one
    /// containing it, keyed by district code.
    async fn nearby_districts(
        &self,
        geocoded_address: &GeocodedAddress,
        district_type: DistrictType,
        count: usize,
    ) -> BTreeMap<String, DistrictMap>;
}

/// District boundary map retrieval.
pub trait MapService: Send + Sync {
    /// The boundary map for one district.
    fn get_district_map(&self, district_type: DistrictType, code: &str) -> MapResult;

    /// All boundary maps of one district type.
    fn get_district_maps(&self, district_type: DistrictType) -> MapResult;
}

/// City name → zip code set lookup.
pub trait CityZipService: Send + Sync {
    /// The zip codes covering a city.
    fn zips_by_city(&self, city: &str) -> Vec<String>;
}

/// Street-file range queries used by multi-match resolution.
pub trait StreetLookupService: Send + Sync {
    /// Distinct district codes per type across the matching rows.
    /// An empty street list matches any street within the zips.
    fn all_district_matches(
        &self,
        streets: &[String],
        zip5s: &[String],
    ) -> BTreeMap<DistrictType, std::collections::BTreeSet<String>>;

    /// Raw range rows for a street within the given zips.
    fn street_ranges(&self, street: &str, zip5s: &[String]) -> Vec<StreetRange>;
}
