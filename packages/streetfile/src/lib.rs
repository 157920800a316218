#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Street-file district lookup.
//!
//! Street files are the election boards' authoritative mapping from
//! house-number ranges to district codes. They carry no geometry, so
//! this provider resolves from the *address* rather than the geocode:
//! a house number that falls inside a range row (with matching odd /
//! even parity) yields that row's district codes at HOUSE level.
//!
//! Street files are precise where they exist but incomplete in rural
//! areas and for some district kinds; the district assigner pairs them
//! with the shapefile lookup and reconciles the two.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use district_map_address as address_parser;
use district_map_database::{streetfile_db, DbError, SharedConnection};
use district_map_models::{
    trim_leading_zeros, DistrictInfo, DistrictMap, DistrictMatchLevel, DistrictResult,
    DistrictType, GeocodedAddress, StreetRange,
};
use district_map_provider::{
    validate_district_info, validate_district_input, CityZipService, DistrictService,
    StreetLookupService,
};

/// Provider name used in registries and result sources.
pub const PROVIDER_NAME: &str = "streetfile";

/// Street-file backed district lookup.
#[derive(Clone)]
pub struct StreetFile {
    conn: SharedConnection,
}

impl StreetFile {
    #[must_use]
    pub const fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Finds the range row covering a specific house number.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn house_match(
        &self,
        street: &str,
        bldg_num: u32,
        zip5: &str,
    ) -> Result<Option<StreetRange>, DbError> {
        let sql = format!(
            "SELECT {} FROM streetfile
             WHERE street = ? AND zip5 = ? AND bldg_lo <= ? AND bldg_hi >= ?
             ORDER BY bldg_lo",
            streetfile_db::range_select_columns()
        );
        let conn = self.conn.lock().expect("streetfile connection poisoned");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(duckdb::params![
            street,
            zip5,
            i64::from(bldg_num),
            i64::from(bldg_num)
        ])?;

        while let Some(row) = rows.next()? {
            let range = streetfile_db::range_from_row(row)?;
            if parity_matches(&range.parity, bldg_num) {
                return Ok(Some(range));
            }
        }
        Ok(None)
    }

    fn matching_rows(
        &self,
        streets: &[String],
        zip5s: &[String],
    ) -> Result<Vec<StreetRange>, DbError> {
        if zip5s.is_empty() {
            return Ok(Vec::new());
        }

        let zip_placeholders: Vec<&str> = zip5s.iter().map(|_| "?").collect();
        let mut sql = format!(
            "SELECT {} FROM streetfile WHERE zip5 IN ({})",
            streetfile_db::range_select_columns(),
            zip_placeholders.join(", ")
        );
        if !streets.is_empty() {
            let street_placeholders: Vec<&str> = streets.iter().map(|_| "?").collect();
            sql.push_str(&format!(" AND street IN ({})", street_placeholders.join(", ")));
        }
        sql.push_str(" ORDER BY street, bldg_lo");

        let conn = self.conn.lock().expect("streetfile connection poisoned");
        let mut stmt = conn.prepare(&sql)?;
        let mut index = 1;
        for zip in zip5s {
            stmt.raw_bind_parameter(index, zip)?;
            index += 1;
        }
        for street in streets {
            stmt.raw_bind_parameter(index, street)?;
            index += 1;
        }
        stmt.raw_execute()?;

        let mut rows = stmt.raw_query();
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(streetfile_db::range_from_row(row)?);
        }
        Ok(out)
    }
}

/// Whether a house number satisfies a range row's parity constraint.
fn parity_matches(parity: &str, bldg_num: u32) -> bool {
    match parity {
        "ODDS" => bldg_num % 2 == 1,
        "EVENS" => bldg_num % 2 == 0,
        _ => true,
    }
}

#[async_trait]
impl DistrictService for StreetFile {
    fn requires_geocode(&self) -> bool {
        false
    }

    fn fetch_maps(&mut self, _fetch: bool) {
        // Street files carry no geometry.
    }

    async fn assign_districts(
        &self,
        geocoded_address: &GeocodedAddress,
        district_types: &[DistrictType],
    ) -> DistrictResult {
        let mut result = DistrictResult::new(PROVIDER_NAME);
        if !validate_district_input(geocoded_address, &mut result, false) {
            return result;
        }

        let Some(address) = &geocoded_address.address else {
            result.status = district_map_models::ResultStatus::MissingAddress;
            return result;
        };
        let sa = address_parser::parse(address);
        let street = address_parser::lookup_street(&sa);
        if street.is_empty() || sa.bldg_num == 0 || sa.zip5.is_empty() {
            result.status = district_map_models::ResultStatus::InsufficientAddress;
            return result;
        }

        match self.house_match(&street, sa.bldg_num, &sa.zip5) {
            Ok(Some(range)) => {
                let mut info = DistrictInfo::default();
                for (district_type, code) in &range.codes {
                    info.codes.insert(*district_type, trim_leading_zeros(code));
                }
                if validate_district_info(&info, district_types, &mut result) {
                    result.match_level = DistrictMatchLevel::House;
                    result.district_info = Some(info);
                    result.geocoded_address = Some(geocoded_address.clone());
                }
            }
            Ok(None) => {
                result.status = district_map_models::ResultStatus::NoDistrictResult;
            }
            Err(e) => {
                log::error!("Street file lookup failed for {address}: {e}");
                result.status = district_map_models::ResultStatus::DatabaseError;
            }
        }
        result
    }

    async fn nearby_districts(
        &self,
        _geocoded_address: &GeocodedAddress,
        _district_type: DistrictType,
        _count: usize,
    ) -> BTreeMap<String, DistrictMap> {
        // No geometry, no neighbors.
        BTreeMap::new()
    }
}

impl StreetLookupService for StreetFile {
    fn all_district_matches(
        &self,
        streets: &[String],
        zip5s: &[String],
    ) -> BTreeMap<DistrictType, BTreeSet<String>> {
        let rows = match self.matching_rows(streets, zip5s) {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("Street file match query failed: {e}");
                return BTreeMap::new();
            }
        };

        let mut matches: BTreeMap<DistrictType, BTreeSet<String>> = BTreeMap::new();
        for range in &rows {
            for (district_type, code) in &range.codes {
                let code = trim_leading_zeros(code);
                if !code.is_empty() {
                    matches.entry(*district_type).or_default().insert(code);
                }
            }
            matches
                .entry(DistrictType::Zip)
                .or_default()
                .insert(range.zip5.clone());
        }
        matches
    }

    fn street_ranges(&self, street: &str, zip5s: &[String]) -> Vec<StreetRange> {
        let streets = vec![street.to_string()];
        match self.matching_rows(&streets, zip5s) {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("Street range query failed for {street}: {e}");
                Vec::new()
            }
        }
    }
}

impl CityZipService for StreetFile {
    fn zips_by_city(&self, city: &str) -> Vec<String> {
        let conn = self.conn.lock().expect("streetfile connection poisoned");
        match streetfile_db::zips_by_city(&conn, city) {
            Ok(zips) => zips,
            Err(e) => {
                log::error!("City/zip lookup failed for {city}: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use district_map_database::shared;
    use district_map_models::{Address, ResultStatus};

    fn street_file() -> StreetFile {
        let conn = streetfile_db::open_in_memory().unwrap();

        let rows = [
            ("STATE ST", "12210", 100, 298, "EVENS", "44", "109"),
            ("STATE ST", "12210", 101, 299, "ODDS", "44", "109"),
            ("STATE ST", "12210", 300, 498, "ALL", "46", "108"),
            ("DELAWARE AVE", "12209", 1, 999, "ALL", "46", "109"),
        ];
        for (street, zip, lo, hi, parity, senate, assembly) in rows {
            let range = StreetRange {
                street: street.to_string(),
                zip5: zip.to_string(),
                bldg_lo: lo,
                bldg_hi: hi,
                parity: parity.to_string(),
                codes: BTreeMap::from([
                    (DistrictType::Senate, senate.to_string()),
                    (DistrictType::Assembly, assembly.to_string()),
                    (DistrictType::County, "1".to_string()),
                ]),
            };
            streetfile_db::insert_range(&conn, &range).unwrap();
        }
        streetfile_db::insert_cityzip(&conn, "Albany", "12209").unwrap();
        streetfile_db::insert_cityzip(&conn, "Albany", "12210").unwrap();

        StreetFile::new(shared(conn))
    }

    fn albany(addr1: &str) -> GeocodedAddress {
        GeocodedAddress::from_address(Address::new(addr1, "", "Albany", "NY", "12210", ""))
    }

    #[tokio::test]
    async fn house_number_resolves_to_one_range() {
        let provider = street_file();
        let result = provider
            .assign_districts(&albany("200 State St"), DistrictType::standard_types())
            .await;

        assert_eq!(result.status, ResultStatus::PartialDistrictResult);
        assert_eq!(result.match_level, DistrictMatchLevel::House);
        let info = result.district_info.unwrap();
        assert_eq!(info.code(DistrictType::Senate), Some("44"));
        assert_eq!(info.code(DistrictType::Assembly), Some("109"));
    }

    #[tokio::test]
    async fn parity_disambiguates_overlapping_ranges() {
        let provider = street_file();
        let odd = provider
            .assign_districts(&albany("201 State St"), &[DistrictType::Senate])
            .await;
        assert_eq!(
            odd.district_info.unwrap().code(DistrictType::Senate),
            Some("44")
        );

        let high = provider
            .assign_districts(&albany("302 State St"), &[DistrictType::Senate])
            .await;
        assert_eq!(
            high.district_info.unwrap().code(DistrictType::Senate),
            Some("46")
        );
    }

    #[tokio::test]
    async fn out_of_range_house_is_no_match() {
        let provider = street_file();
        let result = provider
            .assign_districts(&albany("999 State St"), &[DistrictType::Senate])
            .await;
        assert_eq!(result.status, ResultStatus::NoDistrictResult);
        assert_eq!(result.match_level, DistrictMatchLevel::NoMatch);
    }

    #[tokio::test]
    async fn missing_house_number_is_insufficient() {
        let provider = street_file();
        let result = provider
            .assign_districts(&albany("State St"), &[DistrictType::Senate])
            .await;
        assert_eq!(result.status, ResultStatus::InsufficientAddress);
    }

    #[test]
    fn all_matches_collects_distinct_codes() {
        let provider = street_file();
        let matches =
            provider.all_district_matches(&[], &["12210".to_string(), "12209".to_string()]);

        assert_eq!(
            matches[&DistrictType::Senate],
            BTreeSet::from(["44".to_string(), "46".to_string()])
        );
        assert_eq!(
            matches[&DistrictType::Assembly],
            BTreeSet::from(["108".to_string(), "109".to_string()])
        );
        assert_eq!(
            matches[&DistrictType::Zip],
            BTreeSet::from(["12209".to_string(), "12210".to_string()])
        );
    }

    #[test]
    fn street_filter_restricts_matches() {
        let provider = street_file();
        let matches = provider.all_district_matches(
            &["DELAWARE AVE".to_string()],
            &["12209".to_string(), "12210".to_string()],
        );
        assert_eq!(
            matches[&DistrictType::Senate],
            BTreeSet::from(["46".to_string()])
        );
    }

    #[test]
    fn street_ranges_returns_raw_rows() {
        let provider = street_file();
        let ranges = provider.street_ranges("STATE ST", &["12210".to_string()]);
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0].bldg_lo, 100);
    }

    #[test]
    fn city_zip_lookup() {
        let provider = street_file();
        assert_eq!(provider.zips_by_city("albany"), vec!["12209", "12210"]);
        assert!(provider.zips_by_city("utica").is_empty());
    }
}
