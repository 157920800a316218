//! Request structs accepted by the geocode and district pipelines.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::address::Address;
use crate::district::DistrictType;
use crate::geo::Point;

/// How district assignment reconciles the shapefile and street-file
/// lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
#[serde(rename_all = "camelCase")]
pub enum DistrictStrategy {
    /// Run both lookups in parallel; near a boundary, let a street-file
    /// code that matches a neighboring shapefile district win.
    #[default]
    NeighborMatch,
    /// Shapefile is authoritative; street-file only fills in the types
    /// the shapefile missed.
    StreetFallback,
    /// Street-file is authoritative; shapefile fills the gaps.
    ShapeFallback,
    /// Street-file only.
    StreetOnly,
}

/// A request to geocode an address (or reverse-geocode a point).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeRequest {
    pub address: Option<Address>,
    pub point: Option<Point>,
    /// Provider to try first; the fallback chain follows.
    pub provider: Option<String>,
    pub reverse: bool,
    /// Walk the fallback chain when the first provider fails.
    pub use_fallback: bool,
    /// Consult (and write through to) the geocode cache.
    pub use_cache: bool,
}

impl GeocodeRequest {
    #[must_use]
    pub fn for_address(address: Address) -> Self {
        Self {
            address: Some(address),
            use_fallback: true,
            use_cache: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn for_point(point: Point) -> Self {
        Self {
            point: Some(point),
            reverse: true,
            use_fallback: true,
            use_cache: false,
            ..Self::default()
        }
    }
}

/// A request to resolve districts for an address or point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistrictRequest {
    pub address: Option<Address>,
    pub point: Option<Point>,
    /// Explicit district provider; when unset, the parallel
    /// shapefile/street-file assignment runs.
    pub provider: Option<String>,
    /// Explicit geocode provider passed to the geocode pipeline.
    pub geo_provider: Option<String>,
    pub usps_validate: bool,
    pub skip_geocode: bool,
    pub show_maps: bool,
    pub show_members: bool,
    pub show_multi_match: bool,
    pub strategy: DistrictStrategy,
    /// District types to resolve; empty means the standard set.
    pub district_types: Vec<DistrictType>,
}

impl DistrictRequest {
    #[must_use]
    pub fn for_address(address: Address) -> Self {
        Self {
            address: Some(address),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn for_point(point: Point) -> Self {
        Self {
            point: Some(point),
            ..Self::default()
        }
    }

    /// The district types to resolve, defaulting to the standard set.
    #[must_use]
    pub fn requested_types(&self) -> Vec<DistrictType> {
        if self.district_types.is_empty() {
            DistrictType::standard_types().to_vec()
        } else {
            self.district_types.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_from_config_names() {
        assert_eq!(
            "neighborMatch".parse::<DistrictStrategy>(),
            Ok(DistrictStrategy::NeighborMatch)
        );
        assert_eq!(
            "streetfallback".parse::<DistrictStrategy>(),
            Ok(DistrictStrategy::StreetFallback)
        );
    }

    #[test]
    fn default_types_are_standard() {
        let request = DistrictRequest::default();
        assert_eq!(request.requested_types(), DistrictType::standard_types());
    }

    #[test]
    fn point_request_is_reverse() {
        let request = GeocodeRequest::for_point(Point::new(42.65, -73.76));
        assert!(request.reverse);
        assert!(request.address.is_none());
    }
}
