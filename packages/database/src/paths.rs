#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the `DuckDB` data directory.
//!
//! The data directory defaults to `data/` under the workspace root and
//! can be overridden with the `DISTRICT_MAP_DATA_DIR` environment
//! variable.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
///
/// # Panics
///
/// Panics if the project root cannot be resolved.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Returns the data directory, honoring `DISTRICT_MAP_DATA_DIR`.
#[must_use]
pub fn data_dir() -> PathBuf {
    std::env::var("DISTRICT_MAP_DATA_DIR")
        .map_or_else(|_| project_root().join("data"), PathBuf::from)
}

/// Returns the path for the district boundaries `DuckDB` file.
#[must_use]
pub fn districts_db_path() -> PathBuf {
    data_dir().join("districts.duckdb")
}

/// Returns the path for the street file `DuckDB` file.
#[must_use]
pub fn streetfile_db_path() -> PathBuf {
    data_dir().join("streetfile.duckdb")
}

/// Returns the path for the geocode cache `DuckDB` file.
#[must_use]
pub fn geocache_db_path() -> PathBuf {
    data_dir().join("geocache.duckdb")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
