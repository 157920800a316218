//! District types, boundary maps, overlaps, and assignment results.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::geo::Polygon;

/// A kind of political or administrative district.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum DistrictType {
    Senate,
    Assembly,
    Congressional,
    County,
    School,
    Town,
    Election,
    Ward,
    Village,
    Fire,
    City,
    Zip,
}

impl DistrictType {
    /// Every district type, in canonical order.
    pub const ALL: &'static [Self] = &[
        Self::Senate,
        Self::Assembly,
        Self::Congressional,
        Self::County,
        Self::School,
        Self::Town,
        Self::Election,
        Self::Ward,
        Self::Village,
        Self::Fire,
        Self::City,
        Self::Zip,
    ];

    /// The standard set resolved by default district assignment.
    #[must_use]
    pub const fn standard_types() -> &'static [Self] {
        &[
            Self::Senate,
            Self::Assembly,
            Self::Congressional,
            Self::County,
            Self::School,
            Self::Town,
        ]
    }

    #[must_use]
    pub fn is_standard(self) -> bool {
        Self::standard_types().contains(&self)
    }

    /// The table holding this type's polygons in the district store.
    #[must_use]
    pub fn table(self) -> String {
        self.to_string()
    }
}

/// The boundary geometry of one district (or of a derived region such
/// as a zip union or an intersection).
///
/// The metadata fields are copies describing where the geometry came
/// from; they carry no ownership semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistrictMap {
    /// `"Polygon"` or `"MultiPolygon"`, following the GeoJSON tag.
    pub geometry_type: String,
    pub polygons: Vec<Polygon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district_type: Option<DistrictType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district_code: Option<String>,
}

impl DistrictMap {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

/// Area intersection between a set of target districts and a reference
/// region (typically a union of zip codes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictOverlap {
    pub ref_type: DistrictType,
    pub target_type: DistrictType,
    pub ref_codes: BTreeSet<String>,
    /// Area of the reference region in square meters.
    pub total_area: f64,
    /// Intersected area in square meters, per target district code.
    /// Codes with zero intersection never appear here.
    pub target_overlap: BTreeMap<String, f64>,
    /// Intersection geometry per target code (senate targets only).
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub intersection_maps: BTreeMap<String, DistrictMap>,
}

impl DistrictOverlap {
    #[must_use]
    pub fn new(ref_type: DistrictType, target_type: DistrictType, ref_codes: BTreeSet<String>) -> Self {
        Self {
            ref_type,
            target_type,
            ref_codes,
            total_area: 0.0,
            target_overlap: BTreeMap::new(),
            intersection_maps: BTreeMap::new(),
        }
    }

    /// Target codes with a non-zero intersection, largest area first.
    #[must_use]
    pub fn overlap_district_codes(&self) -> Vec<String> {
        let mut codes: Vec<(&String, &f64)> = self.target_overlap.iter().collect();
        codes.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
        codes.into_iter().map(|(code, _)| code.clone()).collect()
    }
}

/// Member metadata (senator, assembly member, ...) for a district.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictMember {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub url: String,
}

/// One street-file range row, used for diagnostics and street-level
/// multi-match display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreetRange {
    pub street: String,
    pub zip5: String,
    pub bldg_lo: u32,
    pub bldg_hi: u32,
    /// `ODDS`, `EVENS`, or `ALL`.
    pub parity: String,
    pub codes: BTreeMap<DistrictType, String>,
}

/// The set of districts assigned to a location.
///
/// One slot per district type: name, code, optional boundary map,
/// proximity to the district boundary, and optional overlap record.
/// `uncertain` lists types whose geocode fell within the proximity
/// threshold of the boundary and could not be corroborated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistrictInfo {
    pub names: BTreeMap<DistrictType, String>,
    pub codes: BTreeMap<DistrictType, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub maps: BTreeMap<DistrictType, DistrictMap>,
    /// Distance from the geocode to the district boundary, in
    /// coordinate (degree) units.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub proximities: BTreeMap<DistrictType, f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub overlaps: BTreeMap<DistrictType, DistrictOverlap>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub uncertain: BTreeSet<DistrictType>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub members: BTreeMap<DistrictType, DistrictMember>,
    /// Boundary of the reference region used for multi-match (union of
    /// the candidate zips).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_map: Option<DistrictMap>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub street_ranges: Vec<StreetRange>,
}

impl DistrictInfo {
    /// District types that have a non-empty code assigned.
    #[must_use]
    pub fn assigned_districts(&self) -> BTreeSet<DistrictType> {
        self.codes
            .iter()
            .filter(|(_, code)| !code.is_empty())
            .map(|(district_type, _)| *district_type)
            .collect()
    }

    #[must_use]
    pub fn code(&self, district_type: DistrictType) -> Option<&str> {
        self.codes.get(&district_type).map(String::as_str)
    }

    #[must_use]
    pub fn proximity(&self, district_type: DistrictType) -> Option<f64> {
        self.proximities.get(&district_type).copied()
    }

    pub fn set_district(&mut self, district_type: DistrictType, name: &str, code: &str) {
        if !name.is_empty() {
            self.names.insert(district_type, name.to_string());
        }
        self.codes.insert(district_type, code.to_string());
    }
}

/// Precision achieved by district assignment.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum DistrictMatchLevel {
    #[default]
    #[strum(serialize = "NOMATCH")]
    #[serde(rename = "NOMATCH")]
    NoMatch,
    City,
    Zip5,
    Street,
    House,
}
