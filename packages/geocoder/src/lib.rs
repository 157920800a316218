#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! OSM/Nominatim geocoder adapter.
//!
//! The reference [`GeocodeService`] implementation: a structured
//! search against a Nominatim endpoint for forward geocoding and the
//! `/reverse` endpoint for point-to-address lookups. The provider is
//! registered as `"osm"`; its base URL comes from configuration so a
//! self-hosted instance can be swapped in without code changes.

pub mod osm;

use async_trait::async_trait;
use thiserror::Error;

use district_map_models::{
    Address, GeocodeQuality, GeocodeResult, GeocodedAddress, Point, ResultStatus,
};
use district_map_provider::GeocodeService;

/// Provider name used in registries and geocode method tags.
pub const PROVIDER_NAME: &str = "osm";

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

impl GeocodeError {
    /// The result status this error maps onto.
    #[must_use]
    pub const fn status(&self) -> ResultStatus {
        match self {
            Self::Http(_) | Self::RateLimited => ResultStatus::ResponseMissingError,
            Self::Parse { .. } => ResultStatus::ResponseParseError,
        }
    }
}

/// The OSM geocode provider.
///
/// Cheap to construct per request; the `reqwest` client handle is a
/// shared connection pool.
pub struct OsmGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl OsmGeocoder {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl GeocodeService for OsmGeocoder {
    async fn geocode(&self, address: &Address) -> GeocodeResult {
        if address.is_empty() {
            return GeocodeResult::new(PROVIDER_NAME, ResultStatus::MissingAddress);
        }

        let street = if address.addr2.trim().is_empty() {
            address.addr1.clone()
        } else {
            format!("{} {}", address.addr1.trim(), address.addr2.trim())
        };

        match osm::geocode_single(
            &self.client,
            &self.base_url,
            street.trim(),
            &address.city,
            &address.state,
            &address.zip5,
        )
        .await
        {
            Ok(Some(hit)) => GeocodeResult::success(
                PROVIDER_NAME,
                GeocodedAddress::new(Some(address.clone()), Some(hit.geocode)),
            ),
            Ok(None) => GeocodeResult::new(PROVIDER_NAME, ResultStatus::NoGeocodeResult),
            Err(e) => {
                log::warn!("OSM geocode failed for {address}: {e}");
                GeocodeResult::new(PROVIDER_NAME, e.status())
            }
        }
    }

    async fn reverse_geocode(&self, point: Point) -> GeocodeResult {
        match osm::reverse_single(&self.client, &self.base_url, point).await {
            Ok(Some((hit, address_details))) => {
                let address = address_from_details(&address_details);
                let mut geocode = hit.geocode;
                // The caller supplied the point; report it back rather
                // than the snapped location.
                geocode.lat = point.lat;
                geocode.lon = point.lon;
                geocode.quality = GeocodeQuality::Point;
                GeocodeResult::success(
                    PROVIDER_NAME,
                    GeocodedAddress::new(Some(address), Some(geocode)),
                )
            }
            Ok(None) => GeocodeResult::new(PROVIDER_NAME, ResultStatus::NoReverseGeocodeResult),
            Err(e) => {
                log::warn!("OSM reverse geocode failed for {point:?}: {e}");
                GeocodeResult::new(PROVIDER_NAME, e.status())
            }
        }
    }
}

/// Builds an [`Address`] from the `addressdetails` object of a
/// reverse-geocode response.
fn address_from_details(details: &serde_json::Value) -> Address {
    let get = |keys: &[&str]| -> String {
        keys.iter()
            .find_map(|key| details[*key].as_str())
            .unwrap_or("")
            .to_string()
    };

    let house = get(&["house_number"]);
    let road = get(&["road"]);
    let addr1 = format!("{house} {road}").trim().to_string();

    Address::new(
        &addr1,
        "",
        &get(&["city", "town", "village", "hamlet"]),
        &normalize_reverse_state(&get(&["state"])),
        &get(&["postcode"]),
        "",
    )
}

fn normalize_reverse_state(state: &str) -> String {
    if state.eq_ignore_ascii_case("new york") {
        "NY".to_string()
    } else {
        state.to_string()
    }
}
