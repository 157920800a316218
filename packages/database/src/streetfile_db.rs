//! Street file storage.
//!
//! Election boards publish "street files": for each street and house
//! number range, the district codes that apply. Rows are keyed by
//! `(street, zip5, bldg_lo, bldg_hi, parity)` where parity restricts
//! the range to odd or even house numbers. The `cityzip` table maps
//! city names to the zip codes they contain.

use std::path::Path;

use duckdb::Connection;

use district_map_models::{DistrictType, StreetRange};

use crate::DbError;

/// District code columns stored in the street file, in column order.
pub const CODE_COLUMNS: &[(DistrictType, &str)] = &[
    (DistrictType::Senate, "senate_code"),
    (DistrictType::Assembly, "assembly_code"),
    (DistrictType::Congressional, "congressional_code"),
    (DistrictType::County, "county_code"),
    (DistrictType::School, "school_code"),
    (DistrictType::Town, "town_code"),
    (DistrictType::Election, "election_code"),
    (DistrictType::Ward, "ward_code"),
    (DistrictType::Village, "village_code"),
    (DistrictType::Fire, "fire_code"),
    (DistrictType::City, "city_code"),
];

/// Opens (or creates) the street file `DuckDB` and ensures schema
/// exists.
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

/// Opens the street file DB at the default path.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_default() -> Result<Connection, DbError> {
    open(&crate::paths::streetfile_db_path())
}

/// Opens an in-memory street file DB, used by tests.
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
    let code_columns: Vec<String> = CODE_COLUMNS
        .iter()
        .map(|(_, column)| format!("{column} TEXT"))
        .collect();

    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS streetfile (
            street TEXT NOT NULL,
            zip5 TEXT NOT NULL,
            bldg_lo INTEGER NOT NULL,
            bldg_hi INTEGER NOT NULL,
            parity TEXT NOT NULL DEFAULT 'ALL',
            {}
        );

        CREATE TABLE IF NOT EXISTS cityzip (
            city TEXT NOT NULL,
            zip5 TEXT NOT NULL,
            PRIMARY KEY (city, zip5)
        );",
        code_columns.join(",\n            ")
    ))?;

    Ok(())
}

/// Inserts one street file range row.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn insert_range(conn: &Connection, range: &StreetRange) -> Result<(), DbError> {
    let columns: Vec<&str> = CODE_COLUMNS.iter().map(|(_, column)| *column).collect();
    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();

    let sql = format!(
        "INSERT INTO streetfile (street, zip5, bldg_lo, bldg_hi, parity, {})
         VALUES (?, ?, ?, ?, ?, {})",
        columns.join(", "),
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    stmt.raw_bind_parameter(1, &range.street)?;
    stmt.raw_bind_parameter(2, &range.zip5)?;
    stmt.raw_bind_parameter(3, i64::from(range.bldg_lo))?;
    stmt.raw_bind_parameter(4, i64::from(range.bldg_hi))?;
    stmt.raw_bind_parameter(5, &range.parity)?;
    for (i, (district_type, _)) in CODE_COLUMNS.iter().enumerate() {
        let code = range.codes.get(district_type).cloned().unwrap_or_default();
        stmt.raw_bind_parameter(6 + i, code)?;
    }
    stmt.raw_execute()?;
    Ok(())
}

/// Inserts a city → zip crosswalk row.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn insert_cityzip(conn: &Connection, city: &str, zip5: &str) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR REPLACE INTO cityzip (city, zip5) VALUES (?, ?)",
        duckdb::params![city.to_uppercase(), zip5],
    )?;
    Ok(())
}

/// Returns the zip codes recorded for a city (upper-cased match).
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn zips_by_city(conn: &Connection, city: &str) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare("SELECT zip5 FROM cityzip WHERE city = ? ORDER BY zip5")?;
    let mut rows = stmt.query(duckdb::params![city.to_uppercase()])?;

    let mut zips = Vec::new();
    while let Some(row) = rows.next()? {
        zips.push(row.get::<_, String>(0)?);
    }
    Ok(zips)
}

/// Reads one street file row from a result row laid out as
/// `street, zip5, bldg_lo, bldg_hi, parity, <code columns...>`.
///
/// # Errors
///
/// Returns [`DbError`] if a column read fails.
pub fn range_from_row(row: &duckdb::Row<'_>) -> Result<StreetRange, DbError> {
    let mut range = StreetRange {
        street: row.get(0)?,
        zip5: row.get(1)?,
        bldg_lo: u32::try_from(row.get::<_, i64>(2)?).unwrap_or(0),
        bldg_hi: u32::try_from(row.get::<_, i64>(3)?).unwrap_or(0),
        parity: row.get(4)?,
        ..StreetRange::default()
    };
    for (i, (district_type, _)) in CODE_COLUMNS.iter().enumerate() {
        let code: Option<String> = row.get(5 + i)?;
        if let Some(code) = code {
            if !code.is_empty() {
                range.codes.insert(*district_type, code);
            }
        }
    }
    Ok(range)
}

/// The `SELECT` column list matching [`range_from_row`].
#[must_use]
pub fn range_select_columns() -> String {
    let codes: Vec<&str> = CODE_COLUMNS.iter().map(|(_, column)| *column).collect();
    format!("street, zip5, bldg_lo, bldg_hi, parity, {}", codes.join(", "))
}
