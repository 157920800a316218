//! Raw Nominatim HTTP client functions.
//!
//! Structured forward search (`/search`) and reverse lookup
//! (`/reverse`), both with `format=jsonv2`. The public instance rate
//! limits to one request per second; operators pointing at it should
//! keep batch fan-out at its default width.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use district_map_models::{Geocode, GeocodeQuality, Point};

use crate::{GeocodeError, PROVIDER_NAME};

/// A parsed Nominatim hit: the geocode plus the display address.
#[derive(Debug, Clone)]
pub struct OsmHit {
    pub geocode: Geocode,
    pub display_name: Option<String>,
}

/// Geocodes a structured address query.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request or response parsing
/// fails.
pub async fn geocode_single(
    client: &reqwest::Client,
    base_url: &str,
    street: &str,
    city: &str,
    state: &str,
    zip5: &str,
) -> Result<Option<OsmHit>, GeocodeError> {
    let url = format!("{base_url}/search");
    let mut query: Vec<(&str, &str)> = vec![
        ("street", street),
        ("city", city),
        ("state", state),
        ("countrycodes", "us"),
        ("format", "jsonv2"),
        ("addressdetails", "1"),
        ("limit", "1"),
    ];
    if !zip5.is_empty() {
        query.push(("postalcode", zip5));
    }

    let resp = client.get(&url).query(&query).send().await?;
    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    let body: serde_json::Value = resp.json().await?;
    parse_search_response(&body)
}

/// Reverse-geocodes a point to the nearest address.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request or response parsing
/// fails.
pub async fn reverse_single(
    client: &reqwest::Client,
    base_url: &str,
    point: Point,
) -> Result<Option<(OsmHit, serde_json::Value)>, GeocodeError> {
    let url = format!("{base_url}/reverse");
    let lat = point.lat.to_string();
    let lon = point.lon.to_string();

    let resp = client
        .get(&url)
        .query(&[
            ("lat", lat.as_str()),
            ("lon", lon.as_str()),
            ("format", "jsonv2"),
            ("addressdetails", "1"),
        ])
        .send()
        .await?;
    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    let body: serde_json::Value = resp.json().await?;
    if body.get("error").is_some() {
        return Ok(None);
    }
    let hit = parse_result_object(&body)?;
    let address = body.get("address").cloned().unwrap_or(serde_json::Value::Null);
    Ok(hit.map(|hit| (hit, address)))
}

/// Parses the search response (a JSON array of results).
fn parse_search_response(body: &serde_json::Value) -> Result<Option<OsmHit>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };
    parse_result_object(first)
}

/// Parses one result object into a geocode.
fn parse_result_object(result: &serde_json::Value) -> Result<Option<OsmHit>, GeocodeError> {
    let lat = result["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| result["lat"].as_f64())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;
    let lon = result["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| result["lon"].as_f64())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    let addresstype = result["addresstype"]
        .as_str()
        .or_else(|| result["type"].as_str())
        .unwrap_or("");

    let geocode = Geocode::new(lat, lon, quality_for(addresstype), PROVIDER_NAME);

    Ok(Some(OsmHit {
        geocode,
        display_name: result["display_name"].as_str().map(String::from),
    }))
}

/// Maps a Nominatim address type onto the geocode quality ladder.
fn quality_for(addresstype: &str) -> GeocodeQuality {
    match addresstype {
        "house" | "building" | "residential" | "address" => GeocodeQuality::House,
        "road" | "street" => GeocodeQuality::Street,
        "postcode" => GeocodeQuality::Zip,
        "city" | "town" | "village" | "hamlet" | "suburb" | "municipality" => GeocodeQuality::City,
        "county" => GeocodeQuality::County,
        "state" => GeocodeQuality::State,
        _ => GeocodeQuality::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_house_result() {
        let body = serde_json::json!([{
            "lat": "42.6525793",
            "lon": "-73.7562317",
            "addresstype": "building",
            "display_name": "200, State Street, Albany, NY, USA"
        }]);
        let hit = parse_search_response(&body).unwrap().unwrap();
        assert!((hit.geocode.lat - 42.652_579_3).abs() < 1e-6);
        assert_eq!(hit.geocode.quality, GeocodeQuality::House);
        assert_eq!(hit.geocode.method, "osm");
    }

    #[test]
    fn parses_city_result() {
        let body = serde_json::json!([{
            "lat": "42.8867",
            "lon": "-78.8784",
            "addresstype": "city",
            "display_name": "Buffalo, Erie County, NY, USA"
        }]);
        let hit = parse_search_response(&body).unwrap().unwrap();
        assert_eq!(hit.geocode.quality, GeocodeQuality::City);
    }

    #[test]
    fn empty_result_set_is_none() {
        assert!(parse_search_response(&serde_json::json!([])).unwrap().is_none());
    }

    #[test]
    fn malformed_response_is_an_error() {
        assert!(parse_search_response(&serde_json::json!({"bogus": true})).is_err());
    }

    #[test]
    fn unknown_type_maps_to_unknown_quality() {
        assert_eq!(quality_for("waterway"), GeocodeQuality::Unknown);
        assert_eq!(quality_for("road"), GeocodeQuality::Street);
    }
}
