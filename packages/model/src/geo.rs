//! Geographic primitives: points, polygons, and geocodes.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// A WGS84 coordinate pair stored as `(lat, lon)`.
///
/// GeoJSON and most wire formats order coordinates `(lon, lat)`;
/// decoding flips them into this internal order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Point {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A closed ring of points forming one polygon boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self { points }
    }
}

/// Precision of a geocode, ordered from least to most precise.
///
/// All threshold checks use `>=` on this ordering. `Point` marks a
/// caller-supplied coordinate pair (reverse geocode input).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeocodeQuality {
    #[default]
    Unknown,
    State,
    County,
    City,
    Zip,
    Street,
    House,
    Point,
}

/// A latitude/longitude resolved from an address, together with the
/// provider that produced it and the precision achieved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geocode {
    pub lat: f64,
    pub lon: f64,
    /// Provider tag, e.g. `"osm"` or `"cache"`.
    pub method: String,
    pub quality: GeocodeQuality,
    /// True when this geocode was served from the geocode cache.
    #[serde(default)]
    pub cached: bool,
}

impl Geocode {
    #[must_use]
    pub fn new(lat: f64, lon: f64, quality: GeocodeQuality, method: &str) -> Self {
        Self {
            lat,
            lon,
            method: method.to_string(),
            quality,
            cached: false,
        }
    }

    /// The coordinate pair of this geocode.
    #[must_use]
    pub const fn point(&self) -> Point {
        Point::new(self.lat, self.lon)
    }

    /// A geocode is valid when its coordinates are plausible WGS84
    /// values and it is not the origin placeholder.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.abs() <= 90.0
            && self.lon.abs() <= 180.0
            && !(self.lat == 0.0 && self.lon == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_is_totally_ordered() {
        assert!(GeocodeQuality::House >= GeocodeQuality::Zip);
        assert!(GeocodeQuality::Point > GeocodeQuality::House);
        assert!(GeocodeQuality::Unknown < GeocodeQuality::State);
        assert!(GeocodeQuality::City < GeocodeQuality::Zip);
    }

    #[test]
    fn quality_round_trips_as_string() {
        assert_eq!(GeocodeQuality::House.to_string(), "HOUSE");
        assert_eq!("house".parse::<GeocodeQuality>(), Ok(GeocodeQuality::House));
        assert!("bogus".parse::<GeocodeQuality>().is_err());
    }

    #[test]
    fn origin_geocode_is_invalid() {
        let gc = Geocode::new(0.0, 0.0, GeocodeQuality::House, "test");
        assert!(!gc.is_valid());
        let gc = Geocode::new(42.65, -73.76, GeocodeQuality::House, "test");
        assert!(gc.is_valid());
    }
}
