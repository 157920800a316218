//! Multi-match overlap resolution.
//!
//! When a geocode is too coarse for house-level assignment (below
//! HOUSE quality and not a PO box), districts are resolved from the
//! area the address plausibly covers: its street, its zip, or every
//! zip of its city. The street file supplies the candidate code sets;
//! the shape store supplies the reference boundary and the overlap
//! areas that rank the candidates.

use std::collections::BTreeSet;

use district_map_address as address_parser;
use district_map_models::{
    DistrictInfo, DistrictMatchLevel, DistrictResult, DistrictType, GeocodeQuality,
    GeocodedAddress, ResultStatus,
};
use district_map_provider::{validate_district_input, CityZipService, StreetLookupService};

use crate::store::ShapefileStore;
use crate::PROVIDER_NAME;

/// Resolves districts for a sub-house-level geocode.
///
/// `zip_provided` reflects whether the *caller* supplied a 5-digit
/// zip; when they did, street-level matching trusts it instead of
/// expanding the city into all of its zips.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn multi_match(
    store: &ShapefileStore,
    street_lookup: &dyn StreetLookupService,
    city_zip: &dyn CityZipService,
    geocoded_address: &GeocodedAddress,
    zip_provided: bool,
) -> DistrictResult {
    let mut result = DistrictResult::new(PROVIDER_NAME);
    if !validate_district_input(geocoded_address, &mut result, true) {
        return result;
    }

    result.status = ResultStatus::InsufficientAddress;
    result.geocoded_address = Some(geocoded_address.clone());

    let Some(address) = &geocoded_address.address else {
        return result;
    };
    let quality = geocoded_address
        .geocode
        .as_ref()
        .map_or(GeocodeQuality::Unknown, |gc| gc.quality);
    if quality < GeocodeQuality::City {
        return result;
    }

    let sa = address_parser::parse(address);
    let mut match_level = DistrictMatchLevel::NoMatch;
    let mut streets: Vec<String> = Vec::new();
    let mut zips: Vec<String> = Vec::new();
    let mut info = DistrictInfo::default();

    if quality >= GeocodeQuality::Zip && !sa.zip5.is_empty() {
        if quality >= GeocodeQuality::Street && !sa.is_street_empty() {
            log::debug!("Determining street level district overlap for {address}");
            match_level = DistrictMatchLevel::Street;
            let street = address_parser::lookup_street(&sa);
            zips = if zip_provided {
                vec![sa.zip5.clone()]
            } else {
                city_zip.zips_by_city(&sa.location)
            };
            info.street_ranges = street_lookup.street_ranges(&street, &zips);
            streets.push(street);
        } else {
            log::debug!("Determining zip level district overlap for {address}");
            match_level = DistrictMatchLevel::Zip5;
            zips = vec![sa.zip5.clone()];
        }
    } else if !sa.location.is_empty() {
        log::debug!("Determining city level district overlap for {address}");
        match_level = DistrictMatchLevel::City;
        zips = city_zip.zips_by_city(&sa.location);
    }

    if zips.is_empty() {
        return result;
    }

    let matches = street_lookup.all_district_matches(&streets, &zips);
    if matches.is_empty() {
        return result;
    }

    let zip_set: BTreeSet<String> = zips.iter().cloned().collect();

    // City and zip level matches get the unioned zip boundary as the
    // reference region for display.
    if match_level < DistrictMatchLevel::Street {
        info.reference_map = store.overlap_reference_boundary(DistrictType::Zip, &zip_set);
    }

    for (district_type, codes) in &matches {
        if *district_type == DistrictType::Zip || codes.is_empty() {
            continue;
        }
        log::trace!("Matches for {district_type}: {codes:?}");

        // Senate districts always get overlap assigned; other types
        // only when the candidate set is ambiguous.
        let overlap = if *district_type == DistrictType::Senate || codes.len() > 1 {
            let overlap =
                store.district_overlap(*district_type, Some(codes), DistrictType::Zip, &zip_set);
            if let Some(overlap) = &overlap {
                info.overlaps.insert(*district_type, overlap.clone());
            }
            overlap
        } else {
            None
        };

        if codes.len() == 1 {
            let code = codes.iter().next().expect("non-empty set");
            info.codes.insert(*district_type, code.clone());
        } else if *district_type == DistrictType::Senate {
            if let Some(overlap) = overlap {
                if overlap.target_overlap.len() == 1 {
                    let code = overlap.overlap_district_codes().remove(0);
                    info.codes.insert(*district_type, code);
                }
            }
        }
    }

    result.status = ResultStatus::Success;
    result.match_level = match_level;
    result.district_info = Some(info);
    log::debug!("Resulting match level: {match_level}");
    result
}
