//! Geocode cache storage.
//!
//! One row per parsed street address key. The primary key enforces
//! uniqueness; writers use `ON CONFLICT DO NOTHING` so duplicate
//! inserts from concurrent flushes are silently absorbed.

use std::path::Path;

use duckdb::Connection;

use crate::DbError;

/// Opens (or creates) the geocode cache `DuckDB` and ensures schema
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

/// Opens the geocode cache at the default path.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_default() -> Result<Connection, DbError> {
    open(&crate::paths::geocache_db_path())
}

/// Opens an in-memory geocode cache, used by tests.
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
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS geocache (
            bldgnum INTEGER NOT NULL DEFAULT 0,
            predir TEXT NOT NULL DEFAULT '',
            street TEXT NOT NULL DEFAULT '',
            streettype TEXT NOT NULL DEFAULT '',
            postdir TEXT NOT NULL DEFAULT '',
            location TEXT NOT NULL DEFAULT '',
            state TEXT NOT NULL DEFAULT '',
            zip5 TEXT NOT NULL DEFAULT '',
            zip4 TEXT NOT NULL DEFAULT '',
            lat DOUBLE NOT NULL,
            lon DOUBLE NOT NULL,
            method TEXT,
            quality TEXT,
            created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (bldgnum, predir, street, streettype, postdir, location, state, zip5)
        );",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_insert_is_absorbed() {
        let conn = open_in_memory().unwrap();
        let sql = "INSERT INTO geocache
                   (bldgnum, predir, street, streettype, postdir, location, state, zip5, zip4,
                    lat, lon, method, quality)
                   VALUES (200, '', 'STATE', 'ST', '', 'ALBANY', 'NY', '12210', '',
                           42.65, -73.76, 'osm', 'HOUSE')
                   ON CONFLICT DO NOTHING";
        conn.execute_batch(sql).unwrap();
        conn.execute_batch(sql).unwrap();

        let count: i64 = conn
            .prepare("SELECT COUNT(*) FROM geocache")
            .unwrap()
            .query_row([], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
