#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Configuration for the district map service.
//!
//! Settings live in a TOML file (`district-map.toml` by default) and
//! are deserialized into an immutable [`Config`]. The process holds a
//! single shared snapshot: readers call [`Config::current`] once per
//! request and keep the returned `Arc` for the request's lifetime;
//! [`Config::reload`] swaps in a fresh snapshot without disturbing
//! in-flight readers.
//!
//! Secrets (the USPS API key) can be supplied via environment variable
//! instead of the file.

use std::path::Path;
use std::sync::{Arc, LazyLock, RwLock};

use serde::Deserialize;
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file could not be parsed.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Geocoder pipeline settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Providers available for registration.
    pub active: Vec<String>,
    /// Fallback order; the first entry is the default provider.
    pub rank: Vec<String>,
    /// Providers whose results are written to the geocode cache.
    pub cacheable: Vec<String>,
    /// Worker count for batch fan-out.
    pub threads: usize,
    /// Base URL of the OSM geocoder endpoint.
    pub osm_url: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            active: vec!["osm".to_string()],
            rank: vec!["osm".to_string()],
            cacheable: vec!["osm".to_string()],
            threads: 3,
            osm_url: "https://nominatim.openstreetmap.org".to_string(),
        }
    }
}

/// Geocode cache settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocacheConfig {
    /// Buffered writes held before a flush is triggered.
    pub buffer_size: usize,
}

impl Default for GeocacheConfig {
    fn default() -> Self {
        Self { buffer_size: 100 }
    }
}

/// District assignment settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DistrictConfig {
    /// Distance to a district boundary (coordinate units) below which
    /// shapefile assignments are treated as uncertain.
    pub proximity_threshold: f64,
    /// Strategy for the standard assign endpoint.
    pub strategy_single: String,
    /// Strategy for the bluebird endpoint.
    pub strategy_bluebird: String,
}

impl Default for DistrictConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: 0.001,
            strategy_single: "neighborMatch".to_string(),
            strategy_bluebird: "streetFallback".to_string(),
        }
    }
}

/// USPS adapter settings. The API key may also be supplied through the
/// `USPS_API_KEY` environment variable, which takes precedence.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UspsConfig {
    pub url: String,
    pub api_key: String,
}

impl Default for UspsConfig {
    fn default() -> Self {
        Self {
            url: "https://production.shippingapis.com/ShippingAPI.dll".to_string(),
            api_key: String::new(),
        }
    }
}

/// GeoServer WFS fallback settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeoserverConfig {
    pub url: String,
    pub workspace: String,
}

impl Default for GeoserverConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            workspace: "nysenate".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// The full configuration snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub geocoder: GeocoderConfig,
    pub geocache: GeocacheConfig,
    pub district: DistrictConfig,
    pub usps: UspsConfig,
    pub geoserver: GeoserverConfig,
    pub server: ServerConfig,
    /// Data directory for the DuckDB stores; empty means the default.
    pub data_dir: String,
}

static CURRENT: LazyLock<RwLock<Arc<Config>>> =
    LazyLock::new(|| RwLock::new(Arc::new(Config::default())));

impl Config {
    /// Parses a config from TOML text and applies env-var overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::de::from_str(text)?;
        if let Ok(key) = std::env::var("USPS_API_KEY") {
            config.usps.api_key = key;
        }
        Ok(config)
    }

    /// Loads a config file and installs it as the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn reload(path: &Path) -> Result<Arc<Self>, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Arc::new(Self::from_toml(&text)?);
        *CURRENT.write().expect("config lock poisoned") = Arc::clone(&config);
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Installs an already-built config as the current snapshot.
    pub fn install(config: Self) -> Arc<Self> {
        let config = Arc::new(config);
        *CURRENT.write().expect("config lock poisoned") = Arc::clone(&config);
        config
    }

    /// Returns the current configuration snapshot.
    ///
    /// The returned `Arc` stays valid across reloads; take it once per
    /// request rather than re-reading mid-request.
    #[must_use]
    pub fn current() -> Arc<Self> {
        Arc::clone(&CURRENT.read().expect("config lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.geocoder.threads, 3);
        assert_eq!(config.geocache.buffer_size, 100);
        assert!((config.district.proximity_threshold - 0.001).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_partial_toml() {
        let config = Config::from_toml(
            r#"
            [geocoder]
            rank = ["osm", "geocache"]
            threads = 5

            [district]
            proximity_threshold = 0.002
            "#,
        )
        .unwrap();
        assert_eq!(config.geocoder.rank, vec!["osm", "geocache"]);
        assert_eq!(config.geocoder.threads, 5);
        assert!((config.district.proximity_threshold - 0.002).abs() < f64::EPSILON);
        // Untouched sections keep their defaults.
        assert_eq!(config.geocache.buffer_size, 100);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(Config::from_toml("geocoder = 5").is_err());
    }

    #[test]
    fn snapshot_swap_is_visible() {
        let mut config = Config::default();
        config.geocoder.threads = 7;
        Config::install(config);
        assert_eq!(Config::current().geocoder.threads, 7);
        Config::install(Config::default());
        assert_eq!(Config::current().geocoder.threads, 3);
    }
}
