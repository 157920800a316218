//! District boundary storage.
//!
//! One table per district type (name, code, `GeoJSON` boundary), the
//! `county_map` FIPS translation table, and the `members` metadata
//! table. Polygon tables hold one row per source shape; a district
//! code may span several rows (multi-part geometries are unioned by
//! the spatial index at load time).

use std::collections::BTreeMap;
use std::path::Path;

use duckdb::Connection;

use district_map_models::{DistrictMember, DistrictType};

use crate::DbError;

/// A county row from the `county_map` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct County {
    /// Internal district code used in results.
    pub id: i64,
    /// Census FIPS code used in shapefiles.
    pub fips: i64,
    pub name: String,
}

/// Opens (or creates) the districts `DuckDB` and ensures schema exists.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }
    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Opens the districts DB at the default path.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_default() -> Result<Connection, DbError> {
    open(&crate::paths::districts_db_path())
}

/// Opens an in-memory districts DB, used by tests.
///
/// # Errors
///
/// Returns [`DbError`] if schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    for district_type in DistrictType::ALL {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                name TEXT,
                code TEXT NOT NULL,
                boundary_geojson TEXT NOT NULL
            );",
            district_type.table()
        ))?;
    }

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS county_map (
            fips INTEGER PRIMARY KEY,
            county_id INTEGER NOT NULL,
            name TEXT
        );

        CREATE TABLE IF NOT EXISTS members (
            district_type TEXT NOT NULL,
            code TEXT NOT NULL,
            member_name TEXT NOT NULL,
            url TEXT,
            PRIMARY KEY (district_type, code)
        );",
    )?;

    Ok(())
}

/// Inserts one district boundary row.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn insert_district(
    conn: &Connection,
    district_type: DistrictType,
    name: &str,
    code: &str,
    boundary_geojson: &str,
) -> Result<(), DbError> {
    conn.execute(
        &format!(
            "INSERT INTO {} (name, code, boundary_geojson) VALUES (?, ?, ?)",
            district_type.table()
        ),
        duckdb::params![name, code, boundary_geojson],
    )?;
    Ok(())
}

/// Inserts a county FIPS translation row.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn insert_county(conn: &Connection, fips: i64, county_id: i64, name: &str) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR REPLACE INTO county_map (fips, county_id, name) VALUES (?, ?, ?)",
        duckdb::params![fips, county_id, name],
    )?;
    Ok(())
}

/// Inserts a district member metadata row.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn insert_member(
    conn: &Connection,
    district_type: DistrictType,
    code: &str,
    member_name: &str,
    url: &str,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR REPLACE INTO members (district_type, code, member_name, url)
         VALUES (?, ?, ?, ?)",
        duckdb::params![district_type.to_string(), code, member_name, url],
    )?;
    Ok(())
}

/// Loads the FIPS → county translation map.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn fips_county_map(conn: &Connection) -> Result<BTreeMap<i64, County>, DbError> {
    let mut stmt = conn.prepare("SELECT fips, county_id, name FROM county_map")?;
    let mut rows = stmt.query([])?;

    let mut map = BTreeMap::new();
    while let Some(row) = rows.next()? {
        let fips: i64 = row.get(0)?;
        let id: i64 = row.get(1)?;
        let name: Option<String> = row.get(2)?;
        map.insert(
            fips,
            County {
                id,
                fips,
                name: name.unwrap_or_default(),
            },
        );
    }
    Ok(map)
}

/// Loads all boundary rows for one district type as
/// `(name, code, geojson)` tuples.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn district_rows(
    conn: &Connection,
    district_type: DistrictType,
) -> Result<Vec<(String, String, String)>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT name, code, boundary_geojson FROM {} WHERE boundary_geojson IS NOT NULL",
        district_type.table()
    ))?;
    let mut rows = stmt.query([])?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let name: Option<String> = row.get(0)?;
        let code: String = row.get(1)?;
        let geojson: String = row.get(2)?;
        out.push((name.unwrap_or_default(), code, geojson));
    }
    Ok(out)
}

/// Looks up member metadata for a district.
///
/// The code is matched in trimmed form (leading zeros stripped on both
/// sides at insert time).
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn member_for(
    conn: &Connection,
    district_type: DistrictType,
    code: &str,
) -> Result<Option<DistrictMember>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT member_name, url FROM members WHERE district_type = ? AND code = ?",
    )?;
    let mut rows = stmt.query(duckdb::params![district_type.to_string(), code])?;

    if let Some(row) = rows.next()? {
        let name: String = row.get(0)?;
        let url: Option<String> = row.get(1)?;
        return Ok(Some(DistrictMember {
            name,
            url: url.unwrap_or_default(),
        }));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_district_tables() {
        let conn = open_in_memory().unwrap();
        for district_type in DistrictType::ALL {
            let count: i64 = conn
                .prepare(&format!("SELECT COUNT(*) FROM {}", district_type.table()))
                .unwrap()
                .query_row([], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 0);
        }
    }

    #[test]
    fn county_map_round_trip() {
        let conn = open_in_memory().unwrap();
        insert_county(&conn, 36001, 1, "Albany").unwrap();
        insert_county(&conn, 36029, 15, "Erie").unwrap();

        let map = fips_county_map(&conn).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&36001].id, 1);
        assert_eq!(map[&36029].name, "Erie");
    }

    #[test]
    fn member_lookup() {
        let conn = open_in_memory().unwrap();
        insert_member(&conn, DistrictType::Senate, "44", "Jane Roe", "https://example.org/44")
            .unwrap();

        let member = member_for(&conn, DistrictType::Senate, "44").unwrap().unwrap();
        assert_eq!(member.name, "Jane Roe");
        assert!(member_for(&conn, DistrictType::Senate, "45").unwrap().is_none());
    }

    #[test]
    fn district_rows_round_trip() {
        let conn = open_in_memory().unwrap();
        insert_district(
            &conn,
            DistrictType::Senate,
            "Senate District 44",
            "044",
            r#"{"type":"Polygon","coordinates":[]}"#,
        )
        .unwrap();

        let rows = district_rows(&conn, DistrictType::Senate).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, "044");
    }
}
