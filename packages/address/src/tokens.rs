//! Token tables for directional and street-type normalization.

/// Canonicalizes a directional token to its abbreviation.
///
/// Returns `None` when the token is not a directional.
#[must_use]
pub fn directional(token: &str) -> Option<&'static str> {
    Some(match token {
        "N" | "NORTH" => "N",
        "S" | "SOUTH" => "S",
        "E" | "EAST" => "E",
        "W" | "WEST" => "W",
        "NE" | "NORTHEAST" => "NE",
        "NW" | "NORTHWEST" => "NW",
        "SE" | "SOUTHEAST" => "SE",
        "SW" | "SOUTHWEST" => "SW",
        _ => return None,
    })
}

/// Canonicalizes a street-type token to its USPS-style abbreviation.
///
/// Returns `None` when the token is not a recognized street type.
#[must_use]
pub fn street_type(token: &str) -> Option<&'static str> {
    Some(match token {
        "ST" | "STREET" => "ST",
        "AVE" | "AV" | "AVENUE" => "AVE",
        "BLVD" | "BOULEVARD" => "BLVD",
        "RD" | "ROAD" => "RD",
        "DR" | "DRIVE" => "DR",
        "LN" | "LANE" => "LN",
        "PL" | "PLACE" => "PL",
        "CT" | "COURT" => "CT",
        "CIR" | "CIRCLE" => "CIR",
        "TER" | "TERR" | "TERRACE" => "TER",
        "PKWY" | "PARKWAY" => "PKWY",
        "HWY" | "HIGHWAY" => "HWY",
        "TPKE" | "TURNPIKE" => "TPKE",
        "EXPY" | "EXPRESSWAY" => "EXPY",
        "EXT" | "EXTENSION" => "EXT",
        "PLZ" | "PLAZA" => "PLZ",
        "SQ" | "SQUARE" => "SQ",
        "TRL" | "TRAIL" => "TRL",
        "ALY" | "ALLEY" => "ALY",
        "CRES" | "CRESCENT" => "CRES",
        "HTS" | "HEIGHTS" => "HTS",
        "LOOP" => "LOOP",
        "WAY" => "WAY",
        _ => return None,
    })
}

/// Canonicalizes a unit designator (`APT`, `STE`, ...).
#[must_use]
pub fn unit_type(token: &str) -> Option<&'static str> {
    Some(match token {
        "APT" | "APARTMENT" => "APT",
        "STE" | "SUITE" => "STE",
        "UNIT" => "UNIT",
        "RM" | "ROOM" => "RM",
        "FL" | "FLOOR" => "FL",
        "BSMT" | "BASEMENT" => "BSMT",
        "BLDG" | "BUILDING" => "BLDG",
        "#" => "#",
        _ => return None,
    })
}
