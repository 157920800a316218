#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Domain models for the district map service.
//!
//! Everything that crosses a component boundary lives here: addresses
//! (raw and parsed), geocodes, district assignments, provider results,
//! status codes, and the request structs accepted by the pipelines.

pub mod address;
pub mod district;
pub mod geo;
pub mod request;
pub mod result;

pub use address::{Address, GeocodedAddress, GeocodedStreetAddress, StreetAddress};
pub use district::{
    DistrictInfo, DistrictMap, DistrictMatchLevel, DistrictMember, DistrictOverlap, DistrictType,
    StreetRange,
};
pub use geo::{Geocode, GeocodeQuality, Point, Polygon};
pub use request::{DistrictRequest, DistrictStrategy, GeocodeRequest};
pub use result::{AddressResult, DistrictResult, GeocodeResult, MapResult, ResultStatus};

/// Strips leading zeros from a district code.
///
/// Census data pads codes (`"043"`); every code exposed through a
/// public result is stored and compared in trimmed form (`"43"`).
/// An all-zero code collapses to `"0"`.
#[must_use]
pub fn trim_leading_zeros(code: &str) -> String {
    let trimmed = code.trim().trim_start_matches('0');
    if trimmed.is_empty() && !code.trim().is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_leading_zeros() {
        assert_eq!(trim_leading_zeros("043"), "43");
        assert_eq!(trim_leading_zeros("40"), "40");
        assert_eq!(trim_leading_zeros("  007 "), "7");
    }

    #[test]
    fn all_zero_code_collapses() {
        assert_eq!(trim_leading_zeros("000"), "0");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(trim_leading_zeros(""), "");
    }
}
