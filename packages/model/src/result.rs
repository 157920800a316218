//! Provider result envelopes and the status code taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::{Address, GeocodedAddress};
use crate::district::{DistrictInfo, DistrictMap, DistrictMatchLevel, DistrictType};

/// Outcome classification shared by every service result.
///
/// Grouped by origin: input validation, provider selection, upstream
/// responses, partial success, internal failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    Success,

    ServiceNotSupported,
    ProviderNotSupported,

    ResponseMissingError,
    ResponseParseError,

    MissingInputParams,
    MissingAddress,
    MissingGeocode,
    MissingPoint,
    InsufficientAddress,
    InvalidAddress,
    InvalidGeocode,
    NonNyState,

    NoDistrictResult,
    MultipleDistrictResult,
    NoGeocodeResult,
    NoReverseGeocodeResult,
    NoAddressValidateResult,
    PartialDistrictResult,

    InternalError,
    DatabaseError,
}

impl ResultStatus {
    /// Numeric code used in API responses.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Success => 0,
            Self::ServiceNotSupported => 1,
            Self::ProviderNotSupported => 2,
            Self::ResponseMissingError => 90,
            Self::ResponseParseError => 91,
            Self::MissingInputParams => 100,
            Self::MissingAddress => 110,
            Self::MissingGeocode => 120,
            Self::MissingPoint => 150,
            Self::InvalidAddress => 210,
            Self::InvalidGeocode => 220,
            Self::NonNyState => 250,
            Self::InsufficientAddress => 310,
            Self::NoDistrictResult => 400,
            Self::MultipleDistrictResult => 401,
            Self::NoGeocodeResult => 410,
            Self::NoReverseGeocodeResult => 411,
            Self::NoAddressValidateResult => 420,
            Self::PartialDistrictResult => 430,
            Self::InternalError => 500,
            Self::DatabaseError => 501,
        }
    }

    /// Human-readable description for API error payloads.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Success => "Success.",
            Self::ServiceNotSupported => "The requested service is unsupported.",
            Self::ProviderNotSupported => "The requested provider is unsupported.",
            Self::ResponseMissingError => "No response from service provider.",
            Self::ResponseParseError => "Error parsing response from service provider.",
            Self::MissingInputParams => "One or more parameters are missing.",
            Self::MissingAddress => "An address is required.",
            Self::MissingGeocode => "A valid geocoded coordinate pair is required.",
            Self::MissingPoint => "A coordinate pair is required.",
            Self::InvalidAddress => "The supplied address is invalid.",
            Self::InvalidGeocode => "The supplied geocoded coordinate pair is invalid.",
            Self::NonNyState => "The address does not appear to be in New York State.",
            Self::InsufficientAddress => "The supplied address is missing one or more parameters.",
            Self::NoDistrictResult => "District assignment returned no results.",
            Self::MultipleDistrictResult => "Multiple matches were found for certain districts.",
            Self::NoGeocodeResult => "Geocode service returned no results.",
            Self::NoReverseGeocodeResult => "Reverse geocode service returned no results.",
            Self::NoAddressValidateResult => "The address could not be validated.",
            Self::PartialDistrictResult => "District assignment yielded some districts.",
            Self::InternalError => "Internal server error.",
            Self::DatabaseError => "Database error.",
        }
    }
}

/// Result of an address validation or lookup operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressResult {
    pub address: Option<Address>,
    pub validated: bool,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub messages: Vec<String>,
    /// Provider tag that produced this result.
    pub source: String,
}

impl AddressResult {
    #[must_use]
    pub fn new(source: &str) -> Self {
        Self {
            address: None,
            validated: false,
            status: ResultStatus::NoAddressValidateResult,
            messages: Vec::new(),
            source: source.to_string(),
        }
    }

    #[must_use]
    pub fn validated(source: &str, address: Address) -> Self {
        Self {
            address: Some(address),
            validated: true,
            status: ResultStatus::Success,
            messages: Vec::new(),
            source: source.to_string(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

/// Result of a forward or reverse geocode operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub geocoded_address: Option<GeocodedAddress>,
    pub status: ResultStatus,
    pub source: String,
}

impl GeocodeResult {
    #[must_use]
    pub fn new(source: &str, status: ResultStatus) -> Self {
        Self {
            geocoded_address: None,
            status,
            source: source.to_string(),
        }
    }

    #[must_use]
    pub fn success(source: &str, geocoded_address: GeocodedAddress) -> Self {
        Self {
            geocoded_address: Some(geocoded_address),
            status: ResultStatus::Success,
            source: source.to_string(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    /// True when the result carries nothing useful for fallback
    /// reporting (no address and no geocode).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geocoded_address.is_none()
    }
}

/// Result of district assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictResult {
    pub geocoded_address: Option<GeocodedAddress>,
    pub district_info: Option<DistrictInfo>,
    pub match_level: DistrictMatchLevel,
    pub status: ResultStatus,
    pub source: String,
    pub result_time: DateTime<Utc>,
}

impl DistrictResult {
    #[must_use]
    pub fn new(source: &str) -> Self {
        Self {
            geocoded_address: None,
            district_info: None,
            match_level: DistrictMatchLevel::NoMatch,
            status: ResultStatus::NoDistrictResult,
            source: source.to_string(),
            result_time: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    #[must_use]
    pub fn is_partial_success(&self) -> bool {
        self.status == ResultStatus::PartialDistrictResult
    }

    /// True when the result came from the multi-match overlap path
    /// (a real but sub-house-level match).
    #[must_use]
    pub fn is_multi_match(&self) -> bool {
        self.match_level > DistrictMatchLevel::NoMatch
            && self.match_level < DistrictMatchLevel::House
    }

    #[must_use]
    pub fn address(&self) -> Option<&Address> {
        self.geocoded_address.as_ref().and_then(|ga| ga.address.as_ref())
    }

    #[must_use]
    pub fn assigned_districts(&self) -> std::collections::BTreeSet<DistrictType> {
        self.district_info
            .as_ref()
            .map(DistrictInfo::assigned_districts)
            .unwrap_or_default()
    }
}

/// Result of a district map retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapResult {
    pub maps: Vec<DistrictMap>,
    pub status: ResultStatus,
}

impl MapResult {
    #[must_use]
    pub const fn new(status: ResultStatus) -> Self {
        Self {
            maps: Vec::new(),
            status,
        }
    }

    #[must_use]
    pub fn success(maps: Vec<DistrictMap>) -> Self {
        Self {
            maps,
            status: ResultStatus::Success,
        }
    }
}
