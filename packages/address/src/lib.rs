#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Street address parsing and normalization.
//!
//! Callers supply addresses in many shapes:
//! - Fully structured: `"200 State St" / "Albany" / "NY" / "12210"`
//! - With units: `"200 State St Apt 4B"`
//! - PO boxes: `"PO Box 7016"`, `"P.O. BOX 7016"`
//! - Directionals, written out or abbreviated: `"100 North Main Street"`
//!
//! [`parse`] decomposes a raw [`Address`] into a [`StreetAddress`]
//! with upper-case canonical components. Parsing never fails;
//! unrecognized text lands in the street name.

pub mod tokens;

use std::sync::LazyLock;

use regex::Regex;

use district_map_models::{Address, StreetAddress};

/// Regex for a PO box line (periods already stripped).
static PO_BOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^P\s*O\s+BOX\s+#?\s*(\w+)").expect("valid regex"));

/// Regex for a trailing unit designator with its number.
static UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(APT|APARTMENT|STE|SUITE|UNIT|RM|ROOM|FL|FLOOR|BSMT|BLDG)\.?\s*#?\s*([\w-]+)$")
        .expect("valid regex")
});

/// Regex for a bare `#4B` style unit at the end of the line.
static HASH_UNIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*([\w-]+)$").expect("valid regex"));

/// Regex for punctuation that carries no structure.
static PUNCTUATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.,']+").expect("valid regex"));

/// Regex for a 5-digit zip with optional plus-four.
static ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{5})(?:-(\d{4}))?").expect("valid regex"));

/// Parses a raw address into its structural components.
///
/// The city, state, and zip fields are normalized from the structured
/// input; the street line is decomposed into building number,
/// directionals, name, type, and unit.
#[must_use]
pub fn parse(address: &Address) -> StreetAddress {
    let mut sa = StreetAddress {
        location: address.city.trim().to_uppercase(),
        state: normalize_state(&address.state),
        ..StreetAddress::default()
    };

    let (zip5, zip4) = normalize_zip(&address.zip5, &address.zip4);
    sa.zip5 = zip5;
    sa.zip4 = zip4;

    let mut line = PUNCTUATION_RE
        .replace_all(&address.addr1.trim().to_uppercase(), " ")
        .to_string();

    if let Some(caps) = PO_BOX_RE.captures(line.trim()) {
        sa.po_box = caps[1].to_string();
        return sa;
    }

    // Units can arrive on the street line or in addr2.
    if let Some(caps) = UNIT_RE.captures(&line.clone()) {
        sa.unit_type = tokens::unit_type(&caps[1].to_uppercase()).unwrap_or("UNIT").to_string();
        sa.unit_num = caps[2].to_uppercase();
        line = UNIT_RE.replace(&line, "").to_string();
    } else if let Some(caps) = HASH_UNIT_RE.captures(&line.clone()) {
        sa.unit_type = "#".to_string();
        sa.unit_num = caps[1].to_uppercase();
        line = HASH_UNIT_RE.replace(&line, "").to_string();
    } else if !address.addr2.trim().is_empty() {
        let addr2 = address.addr2.trim().to_uppercase();
        if let Some(caps) = UNIT_RE.captures(&addr2) {
            sa.unit_type = tokens::unit_type(&caps[1].to_uppercase()).unwrap_or("UNIT").to_string();
            sa.unit_num = caps[2].to_uppercase();
        }
    }

    let mut parts: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    if parts.is_empty() {
        return sa;
    }

    // Leading building number, possibly with a letter suffix (200A).
    let leading: String = parts[0].chars().take_while(char::is_ascii_digit).collect();
    if !leading.is_empty() {
        if let Ok(num) = leading.parse::<u32>() {
            sa.bldg_num = num;
            parts.remove(0);
        }
    }

    // Pre-directional only counts when a street name and type can
    // still follow ("100 NORTH ST" is North Street, not N + ST).
    if parts.len() >= 3 {
        if let Some(dir) = tokens::directional(&parts[0]) {
            sa.pre_dir = dir.to_string();
            parts.remove(0);
        }
    }

    // Post-directional, then street type, working from the tail.
    if parts.len() >= 2 {
        if let Some(dir) = tokens::directional(parts.last().map_or("", String::as_str)) {
            sa.post_dir = dir.to_string();
            parts.pop();
        }
    }
    if parts.len() >= 2 {
        if let Some(street_type) = tokens::street_type(parts.last().map_or("", String::as_str)) {
            sa.street_type = street_type.to_string();
            parts.pop();
        }
    }

    sa.street_name = parts.join(" ");
    sa
}

/// The street line used for street-file lookups: name plus type,
/// without building number or directionals.
#[must_use]
pub fn lookup_street(sa: &StreetAddress) -> String {
    let mut street = sa.street_name.clone();
    if !sa.street_type.is_empty() {
        street.push(' ');
        street.push_str(&sa.street_type);
    }
    street.trim().to_string()
}

/// Normalizes a state value to a two-letter code where possible.
#[must_use]
pub fn normalize_state(state: &str) -> String {
    let trimmed = state.trim().to_uppercase();
    if trimmed == "NEW YORK" {
        return "NY".to_string();
    }
    trimmed
}

/// Splits a zip value into `(zip5, zip4)`, preferring an explicit
/// plus-four field over one embedded in the zip5 field.
#[must_use]
pub fn normalize_zip(zip5: &str, zip4: &str) -> (String, String) {
    let Some(caps) = ZIP_RE.captures(zip5.trim()) else {
        return (String::new(), String::new());
    };
    let five = caps[1].to_string();
    let four = if zip4.trim().len() == 4 {
        zip4.trim().to_string()
    } else {
        caps.get(2).map_or_else(String::new, |m| m.as_str().to_string())
    };
    (five, four)
}

/// Title-cases each word of an upper-case component for presentation
/// (`"STATE ST"` → `"State St"`).
#[must_use]
pub fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
