#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! District map API server binary.

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};

use district_map_config::Config;
use district_map_server::{build_state, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config_path = std::env::var("DISTRICT_MAP_CONFIG")
        .unwrap_or_else(|_| "district-map.toml".to_string());
    let config = match Config::reload(std::path::Path::new(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Could not load {config_path} ({e}); using defaults");
            Config::install(Config::default())
        }
    };

    log::info!("Building service state...");
    let state = web::Data::new(build_state(&config).expect("Failed to build service state"));

    let bind_addr = config.server.bind.clone();
    let port = config.server.port;
    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/district/assign", web::get().to(handlers::district_assign))
                    .route(
                        "/district/assign",
                        web::post().to(handlers::district_assign_batch),
                    )
                    .route(
                        "/district/bluebird",
                        web::get().to(handlers::district_bluebird),
                    )
                    .route(
                        "/district/bluebird",
                        web::post().to(handlers::district_bluebird_batch),
                    )
                    .route(
                        "/address/validate",
                        web::get().to(handlers::address_validate),
                    )
                    .route(
                        "/address/validate",
                        web::post().to(handlers::address_validate_batch),
                    )
                    .route(
                        "/address/citystate",
                        web::get().to(handlers::address_city_state),
                    )
                    .route("/address/zipcode", web::get().to(handlers::address_zipcode)),
            )
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
