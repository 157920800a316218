#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! JSON envelope types for the district map API.
//!
//! Wire field names are camelCase. Every error takes the uniform
//! `{statusCode, message}` shape; success envelopes echo the
//! normalized address, the geocode, and the per-type district info.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use district_map_models::{
    Address, AddressResult, DistrictInfo, DistrictMap, DistrictMatchLevel, DistrictMember,
    DistrictOverlap, DistrictResult, DistrictType, Geocode, ResultStatus,
};

/// `GET /api/health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    pub healthy: bool,
    pub version: String,
}

/// Uniform error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub status_code: u16,
    pub message: String,
}

impl From<ResultStatus> for ApiError {
    fn from(status: ResultStatus) -> Self {
        Self {
            status_code: status.code(),
            message: status.message().to_string(),
        }
    }
}

/// One district slot in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDistrict {
    pub district_type: DistrictType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proximity: Option<f64>,
    pub uncertain: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<DistrictMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlap: Option<DistrictOverlap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<DistrictMember>,
}

/// District assignment response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDistrictResponse {
    pub status_code: u16,
    pub status: ResultStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geocode: Option<Geocode>,
    pub match_level: DistrictMatchLevel,
    pub districts: Vec<ApiDistrict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_map: Option<DistrictMap>,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl From<DistrictResult> for ApiDistrictResponse {
    fn from(result: DistrictResult) -> Self {
        let (address, geocode) = result
            .geocoded_address
            .map_or((None, None), |ga| (ga.address, ga.geocode));

        let (districts, reference_map) = result
            .district_info
            .map_or_else(|| (Vec::new(), None), district_slots);

        Self {
            status_code: result.status.code(),
            status: result.status,
            message: result.status.message().to_string(),
            address,
            geocode,
            match_level: result.match_level,
            districts,
            reference_map,
            source: result.source,
            timestamp: result.result_time,
        }
    }
}

fn district_slots(mut info: DistrictInfo) -> (Vec<ApiDistrict>, Option<DistrictMap>) {
    let mut slots = Vec::new();
    let mut types: Vec<DistrictType> = info.codes.keys().copied().collect();
    for district_type in info.overlaps.keys() {
        if !types.contains(district_type) {
            types.push(*district_type);
        }
    }
    types.sort();

    for district_type in types {
        slots.push(ApiDistrict {
            district_type,
            name: info.names.remove(&district_type),
            code: info.codes.remove(&district_type).filter(|code| !code.is_empty()),
            proximity: info.proximities.remove(&district_type),
            uncertain: info.uncertain.contains(&district_type),
            map: info.maps.remove(&district_type),
            overlap: info.overlaps.remove(&district_type),
            member: info.members.remove(&district_type),
        });
    }
    (slots, info.reference_map.take())
}

/// Address service response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAddressResponse {
    pub status_code: u16,
    pub status: ResultStatus,
    pub message: String,
    pub validated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub messages: Vec<String>,
    pub source: String,
}

impl From<AddressResult> for ApiAddressResponse {
    fn from(result: AddressResult) -> Self {
        Self {
            status_code: result.status.code(),
            status: result.status,
            message: result.status.message().to_string(),
            validated: result.validated,
            address: result.address,
            messages: result.messages,
            source: result.source,
        }
    }
}
