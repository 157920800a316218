//! HTTP handler functions for the district map API.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use district_map_models::{
    Address, DistrictRequest, DistrictStrategy, Point, ResultStatus,
};
use district_map_server_models::{ApiAddressResponse, ApiDistrictResponse, ApiError, ApiHealth};

use crate::AppState;

/// Query parameters shared by the district and address endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DistrictQueryParams {
    pub addr1: String,
    pub addr2: String,
    pub city: String,
    pub state: String,
    pub zip5: String,
    pub zip4: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub provider: Option<String>,
    pub geo_provider: Option<String>,
    pub usps_validate: bool,
    pub skip_geocode: bool,
    pub show_members: bool,
    pub show_maps: bool,
    pub show_multi_match: bool,
    pub district_strategy: Option<String>,
}

impl DistrictQueryParams {
    fn address(&self) -> Option<Address> {
        let address = Address::new(
            &self.addr1,
            &self.addr2,
            &self.city,
            &self.state,
            &self.zip5,
            &self.zip4,
        );
        (!address.is_empty()).then_some(address)
    }

    fn point(&self) -> Option<Point> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Point::new(lat, lon)),
            _ => None,
        }
    }

    fn to_district_request(&self, default_strategy: DistrictStrategy) -> DistrictRequest {
        let strategy = self
            .district_strategy
            .as_deref()
            .and_then(|name| name.parse().ok())
            .unwrap_or(default_strategy);

        DistrictRequest {
            address: self.address(),
            point: self.point(),
            provider: self.provider.clone(),
            geo_provider: self.geo_provider.clone(),
            usps_validate: self.usps_validate,
            skip_geocode: self.skip_geocode,
            show_maps: self.show_maps,
            show_members: self.show_members,
            show_multi_match: self.show_multi_match,
            strategy,
            district_types: Vec::new(),
        }
    }
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/district/assign`
pub async fn district_assign(
    state: web::Data<AppState>,
    params: web::Query<DistrictQueryParams>,
) -> HttpResponse {
    let request = params.to_district_request(state.single_strategy);
    let result = state.resolver.resolve(&request).await;
    HttpResponse::Ok().json(ApiDistrictResponse::from(result))
}

/// `POST /api/district/assign` with a JSON array of addresses.
pub async fn district_assign_batch(
    state: web::Data<AppState>,
    params: web::Query<DistrictQueryParams>,
    addresses: web::Json<Vec<Address>>,
) -> HttpResponse {
    batch_response(&state, &params, addresses.into_inner(), state.single_strategy).await
}

/// `GET /api/district/bluebird`
pub async fn district_bluebird(
    state: web::Data<AppState>,
    params: web::Query<DistrictQueryParams>,
) -> HttpResponse {
    let mut request = params.to_district_request(state.bluebird_strategy);
    if request.address.is_none() && request.point.is_none() {
        return HttpResponse::BadRequest().json(ApiError::from(ResultStatus::MissingAddress));
    }
    request.strategy = state.bluebird_strategy;
    let result = state.resolver.resolve(&request).await;
    HttpResponse::Ok().json(ApiDistrictResponse::from(result))
}

/// `POST /api/district/bluebird` with a JSON array of addresses.
pub async fn district_bluebird_batch(
    state: web::Data<AppState>,
    params: web::Query<DistrictQueryParams>,
    addresses: web::Json<Vec<Address>>,
) -> HttpResponse {
    batch_response(&state, &params, addresses.into_inner(), state.bluebird_strategy).await
}

async fn batch_response(
    state: &AppState,
    params: &DistrictQueryParams,
    addresses: Vec<Address>,
    strategy: DistrictStrategy,
) -> HttpResponse {
    if addresses.is_empty() {
        return HttpResponse::BadRequest().json(ApiError::from(ResultStatus::MissingAddress));
    }
    let mut request = params.to_district_request(strategy);
    request.address = None;
    request.point = None;

    let results = state.resolver.resolve_batch(&addresses, &request).await;
    let responses: Vec<ApiDistrictResponse> =
        results.into_iter().map(ApiDistrictResponse::from).collect();
    HttpResponse::Ok().json(responses)
}

/// `GET /api/address/validate`
pub async fn address_validate(
    state: web::Data<AppState>,
    params: web::Query<DistrictQueryParams>,
) -> HttpResponse {
    address_call(&state, &params, AddressOp::Validate).await
}

/// `POST /api/address/validate` with a JSON array of addresses.
pub async fn address_validate_batch(
    state: web::Data<AppState>,
    params: web::Query<DistrictQueryParams>,
    addresses: web::Json<Vec<Address>>,
) -> HttpResponse {
    let Some(provider) = state
        .address_registry
        .new_instance(params.provider.as_deref())
    else {
        return HttpResponse::BadRequest().json(ApiError::from(ResultStatus::ProviderNotSupported));
    };
    let results = provider.validate_batch(&addresses).await;
    let responses: Vec<ApiAddressResponse> =
        results.into_iter().map(ApiAddressResponse::from).collect();
    HttpResponse::Ok().json(responses)
}

/// `GET /api/address/citystate`
pub async fn address_city_state(
    state: web::Data<AppState>,
    params: web::Query<DistrictQueryParams>,
) -> HttpResponse {
    address_call(&state, &params, AddressOp::CityState).await
}

/// `GET /api/address/zipcode`
pub async fn address_zipcode(
    state: web::Data<AppState>,
    params: web::Query<DistrictQueryParams>,
) -> HttpResponse {
    address_call(&state, &params, AddressOp::Zipcode).await
}

enum AddressOp {
    Validate,
    CityState,
    Zipcode,
}

async fn address_call(
    state: &AppState,
    params: &DistrictQueryParams,
    op: AddressOp,
) -> HttpResponse {
    let Some(address) = params.address() else {
        return HttpResponse::BadRequest().json(ApiError::from(ResultStatus::MissingAddress));
    };
    let Some(provider) = state
        .address_registry
        .new_instance(params.provider.as_deref())
    else {
        return HttpResponse::BadRequest().json(ApiError::from(ResultStatus::ProviderNotSupported));
    };

    let result = match op {
        AddressOp::Validate => provider.validate(&address).await,
        AddressOp::CityState => provider.lookup_city_state(&address).await,
        AddressOp::Zipcode => provider.lookup_zipcode(&address).await,
    };
    HttpResponse::Ok().json(ApiAddressResponse::from(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_build_an_address_request() {
        let params = DistrictQueryParams {
            addr1: "200 State St".to_string(),
            city: "Albany".to_string(),
            state: "NY".to_string(),
            zip5: "12210".to_string(),
            usps_validate: true,
            ..DistrictQueryParams::default()
        };
        let request = params.to_district_request(DistrictStrategy::NeighborMatch);
        assert!(request.address.is_some());
        assert!(request.point.is_none());
        assert!(request.usps_validate);
        assert_eq!(request.strategy, DistrictStrategy::NeighborMatch);
    }

    #[test]
    fn params_build_a_point_request() {
        let params = DistrictQueryParams {
            lat: Some(42.65),
            lon: Some(-73.76),
            ..DistrictQueryParams::default()
        };
        let request = params.to_district_request(DistrictStrategy::NeighborMatch);
        assert!(request.address.is_none());
        assert!(request.point.is_some());
    }

    #[test]
    fn explicit_strategy_overrides_the_default() {
        let params = DistrictQueryParams {
            addr1: "200 State St".to_string(),
            district_strategy: Some("streetOnly".to_string()),
            ..DistrictQueryParams::default()
        };
        let request = params.to_district_request(DistrictStrategy::NeighborMatch);
        assert_eq!(request.strategy, DistrictStrategy::StreetOnly);
    }
}
