#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `DuckDB` stores for the district map service.
//!
//! Three database files, one per concern:
//! - `districts.duckdb` — one polygon table per district type, with
//!   geometry as `GeoJSON` TEXT, plus the county FIPS translation and
//!   member metadata tables.
//! - `streetfile.duckdb` — address-range rows from the election board
//!   street files, plus the city/zip crosswalk.
//! - `geocache.duckdb` — the geocode cache.
//!
//! Schema creation is idempotent and runs on open. Connections are
//! shared behind a mutex; callers scope each statement so the lock is
//! never held across I/O to other systems.

pub mod districts_db;
pub mod geocache_db;
pub mod paths;
pub mod streetfile_db;

use std::sync::{Arc, Mutex};

use duckdb::Connection;

/// A `DuckDB` connection shared across request handlers.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Wraps a connection for shared use.
#[must_use]
pub fn shared(conn: Connection) -> SharedConnection {
    Arc::new(Mutex::new(conn))
}

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    /// Filesystem error while preparing the data directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
