#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Provider framework: capability traits and the name-keyed registry.
//!
//! A *capability* is one pluggable concern (address validation,
//! geocoding, district assignment, map retrieval, city/zip lookup,
//! street-file queries). A *provider* is a named implementation of a
//! capability. The registry maps names to constructors, carries the
//! default provider and the ordered fallback chain, and tracks which
//! providers feed the geocode cache.

pub mod registry;
pub mod services;

pub use registry::{ProviderFactory, ProviderRegistry};
pub use services::{
    AddressService, CityZipService, DistrictService, GeocodeService, MapService,
    StreetLookupService,
};

/// Shorthand for validating a district-assignment input.
///
/// Checks the geocoded address for presence, address content, geocode
/// validity (when required), and New York state membership. On failure
/// the appropriate status is recorded on `result` and `false` is
/// returned; providers bail out without touching their backends.
pub fn validate_district_input(
    geocoded_address: &district_map_models::GeocodedAddress,
    result: &mut district_map_models::DistrictResult,
    require_geocode: bool,
) -> bool {
    use district_map_models::ResultStatus;

    if geocoded_address.address.is_none() && geocoded_address.geocode.is_none() {
        result.status = ResultStatus::MissingAddress;
        return false;
    }
    if let Some(address) = &geocoded_address.address {
        if address.is_empty() && geocoded_address.geocode.is_none() {
            result.status = ResultStatus::InsufficientAddress;
            return false;
        }
        if !address.is_ny_state() {
            result.status = ResultStatus::NonNyState;
            return false;
        }
    }
    if require_geocode && !geocoded_address.is_valid_geocode() {
        result.status = ResultStatus::MissingGeocode;
        return false;
    }
    true
}

/// Validates a provider's district response: an empty assignment is a
/// failure, an incomplete one is a partial success.
///
/// Returns `false` (with status `NO_DISTRICT_RESULT`) when nothing was
/// assigned; otherwise sets `PARTIAL_DISTRICT_RESULT` when some
/// requested types are missing and returns `true`.
pub fn validate_district_info(
    district_info: &district_map_models::DistrictInfo,
    requested_types: &[district_map_models::DistrictType],
    result: &mut district_map_models::DistrictResult,
) -> bool {
    use district_map_models::ResultStatus;

    let assigned = district_info.assigned_districts();
    if assigned.is_empty() {
        result.status = ResultStatus::NoDistrictResult;
        return false;
    }
    if requested_types.iter().any(|t| !assigned.contains(t)) {
        result.status = ResultStatus::PartialDistrictResult;
    } else {
        result.status = ResultStatus::Success;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use district_map_models::{
        Address, DistrictInfo, DistrictResult, DistrictType, Geocode, GeocodeQuality,
        GeocodedAddress, ResultStatus,
    };

    fn albany() -> GeocodedAddress {
        GeocodedAddress::new(
            Some(Address::new("200 State St", "", "Albany", "NY", "12210", "")),
            Some(Geocode::new(42.65, -73.76, GeocodeQuality::House, "test")),
        )
    }

    #[test]
    fn rejects_missing_input() {
        let mut result = DistrictResult::new("test");
        assert!(!validate_district_input(&GeocodedAddress::default(), &mut result, true));
        assert_eq!(result.status, ResultStatus::MissingAddress);
    }

    #[test]
    fn rejects_out_of_state() {
        let mut result = DistrictResult::new("test");
        let boston = GeocodedAddress::from_address(Address::new(
            "", "", "Boston", "MA", "02108", "",
        ));
        assert!(!validate_district_input(&boston, &mut result, false));
        assert_eq!(result.status, ResultStatus::NonNyState);
    }

    #[test]
    fn requires_geocode_when_asked() {
        let mut result = DistrictResult::new("test");
        let mut geocoded = albany();
        geocoded.geocode = None;
        assert!(!validate_district_input(&geocoded, &mut result, true));
        assert_eq!(result.status, ResultStatus::MissingGeocode);
        assert!(validate_district_input(&geocoded, &mut result, false));
    }

    #[test]
    fn partial_assignment_is_partial_success() {
        let mut result = DistrictResult::new("test");
        let mut info = DistrictInfo::default();
        info.set_district(DistrictType::Senate, "", "44");

        assert!(validate_district_info(&info, DistrictType::standard_types(), &mut result));
        assert_eq!(result.status, ResultStatus::PartialDistrictResult);
    }

    #[test]
    fn empty_assignment_is_failure() {
        let mut result = DistrictResult::new("test");
        let info = DistrictInfo::default();
        assert!(!validate_district_info(&info, DistrictType::standard_types(), &mut result));
        assert_eq!(result.status, ResultStatus::NoDistrictResult);
    }
}
