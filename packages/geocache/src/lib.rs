#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Write-through geocode cache.
//!
//! Lookups are keyed on the parsed street address so that variations
//! of the same address ("200 State Street" / "200 STATE ST") hit the
//! same row. Writes are buffered: [`GeoCache::put`] appends to an
//! in-memory queue, and once the queue exceeds the configured size a
//! flush drains it into `DuckDB` in one pass. Duplicate rows are
//! absorbed by the primary key; other insert failures are logged and
//! skipped, never propagated.

use std::str::FromStr;
use std::sync::Mutex;

use district_map_address as address_parser;
use district_map_database::{DbError, SharedConnection};
use district_map_models::{
    Geocode, GeocodeQuality, GeocodedAddress, GeocodedStreetAddress, StreetAddress,
};

/// Default number of buffered writes held before a flush is triggered.
pub const DEFAULT_BUFFER_SIZE: usize = 100;

const SELECT_COLUMNS: &str =
    "bldgnum, predir, street, streettype, postdir, location, state, zip5, zip4, \
     lat, lon, method, quality";

/// The geocode cache.
///
/// `put` is safe to call from concurrent request handlers; flushes are
/// serialized so at most one drain runs at a time.
pub struct GeoCache {
    conn: SharedConnection,
    buffer: Mutex<Vec<GeocodedAddress>>,
    flush_lock: Mutex<()>,
    buffer_size: usize,
}

impl GeoCache {
    #[must_use]
    pub const fn new(conn: SharedConnection, buffer_size: usize) -> Self {
        Self {
            conn,
            buffer: Mutex::new(Vec::new()),
            flush_lock: Mutex::new(()),
            buffer_size,
        }
    }

    /// Looks up a parsed street address in the cache.
    ///
    /// Building-level matches must carry HOUSE quality or better;
    /// anything weaker is treated as a miss. PO box and street-less
    /// addresses match on city/zip/state alone with no quality gate.
    /// On a hit the street and city come back title-cased and the
    /// geocode is flagged `cached`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn lookup(&self, sa: &StreetAddress) -> Result<Option<GeocodedStreetAddress>, DbError> {
        if !Self::is_retrievable(sa) {
            return Ok(None);
        }

        if !sa.is_po_box() && !sa.is_street_empty() {
            let hit = self.building_hit(sa)?;
            // A building match below HOUSE quality is useless for
            // house-level assignment.
            Ok(hit.filter(|h| h.geocode.quality >= GeocodeQuality::House))
        } else {
            self.city_zip_hit(sa)
        }
    }

    fn building_hit(&self, sa: &StreetAddress) -> Result<Option<GeocodedStreetAddress>, DbError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM geocache
             WHERE bldgnum = ? AND predir = ? AND street = ? AND postdir = ? AND streettype = ?
               AND ((zip5 = ? AND zip5 != '')
                 OR (? = '' AND location = ? AND location != '' AND state = ?))"
        );
        let conn = self.conn.lock().expect("geocache connection poisoned");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(duckdb::params![
            i64::from(sa.bldg_num),
            sa.pre_dir,
            sa.street_name,
            sa.post_dir,
            sa.street_type,
            sa.zip5,
            sa.zip5,
            sa.location,
            sa.state,
        ])?;

        match rows.next()? {
            Some(row) => Ok(Some(hit_from_row(row)?)),
            None => Ok(None),
        }
    }

    fn city_zip_hit(&self, sa: &StreetAddress) -> Result<Option<GeocodedStreetAddress>, DbError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM geocache
             WHERE street = ''
               AND ((zip5 = ? AND zip5 != '')
                 OR (? = '' AND zip5 = '' AND location = ? AND location != '' AND state = ?))"
        );
        let conn = self.conn.lock().expect("geocache connection poisoned");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(duckdb::params![sa.zip5, sa.zip5, sa.location, sa.state])?;

        match rows.next()? {
            Some(row) => Ok(Some(hit_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Queues a geocoded address for caching.
    ///
    /// Entries that are invalid or already came from the cache are
    /// dropped. When the buffer exceeds its configured size the queue
    /// is flushed inline.
    pub fn put(&self, geocoded_address: &GeocodedAddress) {
        if !geocoded_address.is_valid_address() || !geocoded_address.is_valid_geocode() {
            return;
        }
        if geocoded_address.geocode.as_ref().is_some_and(|gc| gc.cached) {
            return;
        }

        let should_flush = {
            let mut buffer = self.buffer.lock().expect("geocache buffer poisoned");
            buffer.push(geocoded_address.clone());
            buffer.len() > self.buffer_size
        };
        if should_flush {
            self.flush();
        }
    }

    /// Queues a batch of geocoded addresses for caching.
    pub fn put_all(&self, geocoded_addresses: &[GeocodedAddress]) {
        for geocoded_address in geocoded_addresses {
            self.put(geocoded_address);
        }
    }

    /// Drains the buffer into the cache table.
    ///
    /// Each entry is re-parsed into a street address so lookups are
    /// stable across formatting variations. Returns the number of rows
    /// handed to the insert statement. Flushes are mutually exclusive;
    /// concurrent `put` calls keep working against the fresh buffer.
    pub fn flush(&self) -> usize {
        let _guard = self.flush_lock.lock().expect("geocache flush lock poisoned");

        let drained = {
            let mut buffer = self.buffer.lock().expect("geocache buffer poisoned");
            std::mem::take(&mut *buffer)
        };
        if drained.is_empty() {
            return 0;
        }

        let mut inserted = 0;
        for geocoded_address in &drained {
            let (Some(address), Some(geocode)) =
                (&geocoded_address.address, &geocoded_address.geocode)
            else {
                continue;
            };
            let sa = address_parser::parse(address);
            if !Self::is_cacheable(&sa) {
                continue;
            }
            if let Err(e) = self.insert(&sa, geocode) {
                log::warn!("Failed to cache geocode for {address}: {e}");
            } else {
                inserted += 1;
            }
        }
        if inserted > 1 {
            log::info!("Cached {inserted} geocodes.");
        }
        inserted
    }

    fn insert(&self, sa: &StreetAddress, geocode: &Geocode) -> Result<(), DbError> {
        let conn = self.conn.lock().expect("geocache connection poisoned");
        conn.execute(
            "INSERT INTO geocache
             (bldgnum, predir, street, streettype, postdir, location, state, zip5, zip4,
              lat, lon, method, quality)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT DO NOTHING",
            duckdb::params![
                i64::from(sa.bldg_num),
                sa.pre_dir,
                sa.street_name,
                sa.street_type,
                sa.post_dir,
                sa.location,
                sa.state,
                sa.zip5,
                sa.zip4,
                geocode.lat,
                geocode.lon,
                geocode.method,
                geocode.quality.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Whether an address has enough structure to be stored: a street
    /// with a building number, or a street-less (PO box style) address
    /// locatable by city/state or zip.
    #[must_use]
    pub fn is_cacheable(sa: &StreetAddress) -> bool {
        (!sa.is_street_empty() && sa.bldg_num > 0)
            || (sa.is_street_empty()
                && sa.bldg_num == 0
                && ((!sa.location.is_empty() && !sa.state.is_empty()) || !sa.zip5.is_empty()))
    }

    /// Whether an address has enough structure to be looked up. The
    /// criteria mirror [`Self::is_cacheable`].
    #[must_use]
    pub fn is_retrievable(sa: &StreetAddress) -> bool {
        Self::is_cacheable(sa)
    }
}

fn hit_from_row(row: &duckdb::Row<'_>) -> Result<GeocodedStreetAddress, DbError> {
    let street_address = StreetAddress {
        bldg_num: u32::try_from(row.get::<_, i64>(0)?).unwrap_or(0),
        pre_dir: row.get(1)?,
        street_name: address_parser::title_case(&row.get::<_, String>(2)?),
        street_type: address_parser::title_case(&row.get::<_, String>(3)?),
        post_dir: row.get(4)?,
        location: address_parser::title_case(&row.get::<_, String>(5)?),
        state: row.get(6)?,
        zip5: row.get(7)?,
        zip4: row.get(8)?,
        ..StreetAddress::default()
    };

    let quality: Option<String> = row.get(12)?;
    let mut geocode = Geocode::new(
        row.get(9)?,
        row.get(10)?,
        quality
            .and_then(|q| GeocodeQuality::from_str(&q).ok())
            .unwrap_or(GeocodeQuality::Unknown),
        &row.get::<_, Option<String>>(11)?.unwrap_or_default(),
    );
    geocode.cached = true;

    Ok(GeocodedStreetAddress {
        street_address,
        geocode,
    })
}
