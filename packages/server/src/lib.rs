#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the district map service.
//!
//! Bootstraps the stores, registries, and pipelines once and shares
//! them through [`AppState`]. Route surface:
//! - `GET/POST /api/district/{assign|bluebird}` — single via query
//!   params, batch via a JSON array body.
//! - `GET /api/address/{validate|citystate|zipcode}` and
//!   `POST /api/address/validate` for batches.
//! - `GET /api/health`.

pub mod handlers;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use district_map_config::Config;
use district_map_database::{districts_db, geocache_db, paths, shared, streetfile_db};
use district_map_geocache::GeoCache;
use district_map_geocoder::OsmGeocoder;
use district_map_geoserver::GeoserverDistricts;
use district_map_models::DistrictStrategy;
use district_map_pipeline::{DistrictAssigner, DistrictResolver, GeocodeServiceProvider};
use district_map_provider::{
    AddressService, CityZipService, DistrictService, GeocodeService, ProviderRegistry,
    StreetLookupService,
};
use district_map_shapefile::{DistrictShapefile, ShapefileStore};
use district_map_streetfile::StreetFile;
use district_map_usps::Usps;

/// Shared application state.
pub struct AppState {
    pub resolver: Arc<DistrictResolver>,
    pub address_registry: Arc<ProviderRegistry<dyn AddressService>>,
    pub single_strategy: DistrictStrategy,
    pub bluebird_strategy: DistrictStrategy,
}

/// Builds the full service graph from configuration.
///
/// Store connectivity failures here are fatal by design; a server that
/// cannot see its district data has nothing to serve.
///
/// # Errors
///
/// Returns an error if any store cannot be opened or the shape store
/// fails to load.
pub fn build_state(config: &Config) -> Result<AppState, Box<dyn std::error::Error>> {
    let (districts_path, streetfile_path, geocache_path) = if config.data_dir.is_empty() {
        (
            paths::districts_db_path(),
            paths::streetfile_db_path(),
            paths::geocache_db_path(),
        )
    } else {
        let dir = Path::new(&config.data_dir);
        (
            dir.join("districts.duckdb"),
            dir.join("streetfile.duckdb"),
            dir.join("geocache.duckdb"),
        )
    };

    log::info!("Loading district shapes from {}", districts_path.display());
    let districts_conn = districts_db::open(&districts_path)?;
    let store = Arc::new(ShapefileStore::load(&districts_conn)?);
    let members_conn = shared(districts_conn);

    let street_file = Arc::new(StreetFile::new(shared(streetfile_db::open(&streetfile_path)?)));
    let cache = Arc::new(GeoCache::new(
        shared(geocache_db::open(&geocache_path)?),
        config.geocache.buffer_size,
    ));

    let client = reqwest::Client::new();

    // Geocode providers: first entry of the rank is the default, the
    // rest form the fallback chain.
    let mut geocode_registry: ProviderRegistry<dyn GeocodeService> = ProviderRegistry::new();
    for (rank, name) in config.geocoder.rank.iter().enumerate() {
        match name.as_str() {
            "osm" => {
                let client = client.clone();
                let url = config.geocoder.osm_url.clone();
                let factory = move || {
                    Box::new(OsmGeocoder::new(client.clone(), &url)) as Box<dyn GeocodeService>
                };
                if rank == 0 {
                    geocode_registry.register_default(name, factory);
                } else {
                    geocode_registry.register(name, factory);
                }
            }
            other => log::warn!("Unknown geocoder in rank: {other}"),
        }
    }
    if config.geocoder.rank.len() > 1 {
        geocode_registry.set_fallback_chain(&config.geocoder.rank[1..]);
    }
    for name in &config.geocoder.cacheable {
        geocode_registry.mark_cacheable(name);
    }

    let geocoder = Arc::new(GeocodeServiceProvider::new(
        Arc::new(geocode_registry),
        Some(Arc::clone(&cache)),
        config.geocoder.threads,
    ));

    // District providers: shapefile is the default, street file the
    // other half of consolidation, WFS an optional named fallback.
    let mut district_registry: ProviderRegistry<dyn DistrictService> = ProviderRegistry::new();
    {
        let store = Arc::clone(&store);
        district_registry.register_default("shapefile", move || {
            Box::new(DistrictShapefile::new(Arc::clone(&store))) as Box<dyn DistrictService>
        });
    }
    {
        let street_file = Arc::clone(&street_file);
        district_registry.register("streetfile", move || {
            Box::new(StreetFile::clone(&street_file)) as Box<dyn DistrictService>
        });
    }
    if !config.geoserver.url.is_empty() {
        let client = client.clone();
        let url = config.geoserver.url.clone();
        let workspace = config.geoserver.workspace.clone();
        let county_codes: district_map_geoserver::CountyCodes = Arc::new(
            store
                .counties()
                .iter()
                .map(|(fips, county)| (*fips, county.id))
                .collect(),
        );
        district_registry.register("geoserver", move || {
            Box::new(GeoserverDistricts::new(
                client.clone(),
                &url,
                &workspace,
                Arc::clone(&county_codes),
            )) as Box<dyn DistrictService>
        });
    }

    let assigner = Arc::new(DistrictAssigner::new(
        Arc::new(district_registry),
        config.district.proximity_threshold,
    ));

    // Address providers.
    let mut address_registry: ProviderRegistry<dyn AddressService> = ProviderRegistry::new();
    {
        let client = client.clone();
        let url = config.usps.url.clone();
        let api_key = config.usps.api_key.clone();
        address_registry.register_default("usps", move || {
            Box::new(Usps::new(client.clone(), &url, &api_key)) as Box<dyn AddressService>
        });
    }
    let address_registry = Arc::new(address_registry);

    let resolver = Arc::new(DistrictResolver::new(
        Arc::clone(&address_registry),
        geocoder,
        assigner,
        store,
        Arc::clone(&street_file) as Arc<dyn StreetLookupService>,
        street_file as Arc<dyn CityZipService>,
        Some(members_conn),
        config.geocoder.threads,
    ));

    Ok(AppState {
        resolver,
        address_registry,
        single_strategy: parse_strategy(&config.district.strategy_single, DistrictStrategy::NeighborMatch),
        bluebird_strategy: parse_strategy(
            &config.district.strategy_bluebird,
            DistrictStrategy::StreetFallback,
        ),
    })
}

fn parse_strategy(name: &str, fallback: DistrictStrategy) -> DistrictStrategy {
    DistrictStrategy::from_str(name).unwrap_or_else(|_| {
        if !name.is_empty() {
            log::warn!("Unknown district strategy {name:?}, using {fallback}");
        }
        fallback
    })
}
