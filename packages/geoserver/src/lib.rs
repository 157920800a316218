#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! GeoServer WFS district lookup.
//!
//! The external fallback district source: a `GetFeature` request with
//! a CQL `INTERSECTS` point filter against one layer per district
//! type, JSON output. Feature ids arrive as `workspace:layer.fid`;
//! the layer name selects the district type. Feature properties are
//! expected to expose `name` and `code` attributes (the workspace is
//! published with those aliases).
//!
//! WFS supplies codes only — no proximity, no boundary maps — so
//! results from this provider never participate in neighbor
//! consolidation.
//!
//! See <https://docs.geoserver.org/stable/en/user/services/wfs/reference.html>

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use district_map_models::{
    trim_leading_zeros, DistrictInfo, DistrictMap, DistrictMatchLevel, DistrictResult,
    DistrictType, GeocodedAddress, Point, ResultStatus,
};
use district_map_provider::{
    validate_district_info, validate_district_input, DistrictService,
};

/// Provider name used in registries and result sources.
pub const PROVIDER_NAME: &str = "geoserver";

/// Errors from the WFS exchange.
#[derive(Debug, Error)]
pub enum WfsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// FIPS → internal county code translation, shared with the shape
/// store at bootstrap.
pub type CountyCodes = Arc<BTreeMap<i64, i64>>;

/// WFS-backed district provider.
pub struct GeoserverDistricts {
    client: reqwest::Client,
    base_url: String,
    workspace: String,
    county_codes: CountyCodes,
}

impl GeoserverDistricts {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        workspace: &str,
        county_codes: CountyCodes,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            workspace: workspace.to_string(),
            county_codes,
        }
    }

    async fn get_features(
        &self,
        point: Point,
        district_types: &[DistrictType],
    ) -> Result<serde_json::Value, WfsError> {
        let type_names: Vec<String> = district_types
            .iter()
            .map(|t| format!("{}:{}", self.workspace, t.table()))
            .collect();
        let filter = format!("INTERSECTS(the_geom, POINT ({} {}))", point.lat, point.lon);

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("service", "WFS"),
                ("version", "1.1.0"),
                ("request", "GetFeature"),
                ("typename", &type_names.join(",")),
                ("CQL_FILTER", &filter),
                ("outputformat", "JSON"),
            ])
            .send()
            .await?;
        Ok(resp.json().await?)
    }

    fn district_info_from_response(&self, response: &serde_json::Value) -> Result<DistrictInfo, WfsError> {
        let features = response["features"]
            .as_array()
            .ok_or_else(|| WfsError::Parse {
                message: "WFS response missing 'features' array".to_string(),
            })?;

        let mut info = DistrictInfo::default();
        for feature in features {
            let id = feature["id"].as_str().unwrap_or("");
            let layer = id
                .rsplit_once('.')
                .map_or(id, |(prefix, _)| prefix)
                .rsplit_once(':')
                .map_or(id, |(_, layer)| layer);

            let Ok(district_type) = DistrictType::from_str(layer) else {
                log::warn!("Unidentified feature id {id} in WFS response");
                continue;
            };

            let properties = &feature["properties"];
            let name = properties["name"].as_str().unwrap_or("");
            let raw_code = match &properties["code"] {
                serde_json::Value::String(code) => code.clone(),
                serde_json::Value::Number(code) => code.to_string(),
                _ => String::new(),
            };
            let code = self.resolve_code(district_type, &raw_code);
            info.set_district(district_type, name, &code);
        }
        Ok(info)
    }

    /// County features carry FIPS codes; everything else just loses
    /// its leading zeros.
    fn resolve_code(&self, district_type: DistrictType, raw_code: &str) -> String {
        if district_type == DistrictType::County {
            if let Ok(fips) = raw_code.trim().parse::<i64>() {
                if let Some(id) = self.county_codes.get(&fips) {
                    return id.to_string();
                }
            }
            log::warn!("No county mapping for FIPS {raw_code}");
        }
        trim_leading_zeros(raw_code)
    }
}

#[async_trait]
impl DistrictService for GeoserverDistricts {
    fn requires_geocode(&self) -> bool {
        true
    }

    fn fetch_maps(&mut self, _fetch: bool) {
        // WFS results are codes only.
    }

    async fn assign_districts(
        &self,
        geocoded_address: &GeocodedAddress,
        district_types: &[DistrictType],
    ) -> DistrictResult {
        let mut result = DistrictResult::new(PROVIDER_NAME);
        if !validate_district_input(geocoded_address, &mut result, true) {
            return result;
        }
        let point = geocoded_address
            .geocode
            .as_ref()
            .expect("validated geocode")
            .point();

        match self.get_features(point, district_types).await {
            Ok(response) => match self.district_info_from_response(&response) {
                Ok(info) => {
                    if validate_district_info(&info, district_types, &mut result) {
                        result.match_level = DistrictMatchLevel::House;
                        result.district_info = Some(info);
                        result.geocoded_address = Some(geocoded_address.clone());
                    }
                }
                Err(e) => {
                    log::error!("WFS response parse failed: {e}");
                    result.status = ResultStatus::ResponseParseError;
                }
            },
            Err(e) => {
                log::error!("WFS request failed (is the server reachable?): {e}");
                result.status = ResultStatus::ResponseMissingError;
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
        BTreeMap::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GeoserverDistricts {
        let counties = Arc::new(BTreeMap::from([(36001_i64, 1_i64)]));
        GeoserverDistricts::new(
            reqwest::Client::new(),
            "http://localhost:8080/wfs",
            "nysenate",
            counties,
        )
    }

    #[test]
    fn parses_feature_collection() {
        let response = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "id": "nysenate:senate.1042",
                    "properties": { "name": "Senate District 44", "code": "044" }
                },
                {
                    "id": "nysenate:county.12",
                    "properties": { "name": "Albany", "code": 36001 }
                },
                {
                    "id": "nysenate:lighthouse.9",
                    "properties": { "name": "ignored", "code": "1" }
                }
            ]
        });

        let info = provider().district_info_from_response(&response).unwrap();
        assert_eq!(info.code(DistrictType::Senate), Some("44"));
        assert_eq!(info.code(DistrictType::County), Some("1"));
        assert_eq!(info.assigned_districts().len(), 2);
    }

    #[test]
    fn missing_features_is_a_parse_error() {
        let response = serde_json::json!({"type": "FeatureCollection"});
        assert!(provider().district_info_from_response(&response).is_err());
    }
}
