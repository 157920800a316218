#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! USPS ShippingAPI address validation adapter.
//!
//! The ShippingAPI v3 speaks XML over HTTP GET:
//!
//! ```text
//! <AddressValidateRequest USERID="xxxx">
//!     <Address ID="0">
//!        <Address1></Address1>
//!        <Address2>200 State St</Address2>
//!        <City>Albany</City>
//!        <State>NY</State>
//!        <Zip5>12210</Zip5>
//!        <Zip4></Zip4>
//!     </Address>
//! </AddressValidateRequest>
//! ```
//!
//! The API's convention is inverted from ours: `Address1` is the unit
//! line and `Address2` the street line. This adapter keeps that quirk
//! at the wire and returns the validated street line in `addr1`.
//!
//! Requests batch up to [`BATCH_SIZE`] addresses. A top-level `Error`
//! fails every address in the batch; a per-address `Error` fails only
//! that slot, with the description carried in the result messages.

pub mod xml;

use async_trait::async_trait;
use thiserror::Error;

use district_map_address as address_parser;
use district_map_models::{Address, AddressResult, ResultStatus};
use district_map_provider::AddressService;

/// Provider name used in registries and result sources.
pub const PROVIDER_NAME: &str = "usps";

/// Maximum addresses per ShippingAPI request.
pub const BATCH_SIZE: usize = 5;

/// Errors from the USPS HTTP exchange.
#[derive(Debug, Error)]
pub enum UspsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// The USPS address validation provider.
pub struct Usps {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Usps {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn request(&self, api: &str, request_xml: String) -> Result<String, UspsError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("API", api), ("XML", request_xml.as_str())])
            .send()
            .await?;
        Ok(resp.text().await?)
    }

    fn address_to_xml(id: usize, address: &Address) -> String {
        // Street goes in Address2; addr2 (unit) is folded onto it.
        let street = if address.addr2.trim().is_empty() {
            address.addr1.trim().to_string()
        } else {
            format!("{} {}", address.addr1.trim(), address.addr2.trim())
        };
        format!(
            "<Address ID=\"{id}\"><Address1></Address1><Address2>{}</Address2>\
             <City>{}</City><State>{}</State><Zip5>{}</Zip5><Zip4>{}</Zip4></Address>",
            xml::escape(&street),
            xml::escape(address.city.trim()),
            xml::escape(address.state.trim()),
            xml::escape(address.zip5.trim()),
            xml::escape(address.zip4.trim()),
        )
    }

    fn parse_validate_response(body: &str, batch: &[Address]) -> Vec<AddressResult> {
        let mut results: Vec<AddressResult> =
            batch.iter().map(|_| AddressResult::new(PROVIDER_NAME)).collect();

        // An error before any Address block poisons the whole batch.
        let first_block = body.find("<Address ");
        let header = first_block.map_or(body, |at| &body[..at]);
        if xml::has_error(header) {
            let message = xml::error_description(header);
            for result in &mut results {
                result.messages.push(message.clone());
            }
            return results;
        }

        for (id, block) in xml::address_blocks(body) {
            let Some(slot) = results.get_mut(id % BATCH_SIZE) else {
                continue;
            };
            if xml::has_error(&block) {
                slot.messages.push(xml::error_description(&block));
                continue;
            }

            let street = address_parser::title_case(&xml::extract_tag(&block, "Address2"));
            let city = address_parser::title_case(&xml::extract_tag(&block, "City"));
            let mut address = Address::new(
                &street,
                "",
                &city,
                &xml::extract_tag(&block, "State"),
                &xml::extract_tag(&block, "Zip5"),
                &xml::extract_tag(&block, "Zip4"),
            );
            address.parsed = true;
            *slot = AddressResult::validated(PROVIDER_NAME, address);
        }
        results
    }
}

#[async_trait]
impl AddressService for Usps {
    async fn validate(&self, address: &Address) -> AddressResult {
        self.validate_batch(std::slice::from_ref(address))
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| AddressResult::new(PROVIDER_NAME))
    }

    async fn validate_batch(&self, addresses: &[Address]) -> Vec<AddressResult> {
        let mut results = Vec::with_capacity(addresses.len());

        for batch in addresses.chunks(BATCH_SIZE) {
            let mut request_xml =
                format!("<AddressValidateRequest USERID=\"{}\">", xml::escape(&self.api_key));
            for (id, address) in batch.iter().enumerate() {
                request_xml.push_str(&Self::address_to_xml(id, address));
            }
            request_xml.push_str("</AddressValidateRequest>");

            match self.request("Verify", request_xml).await {
                Ok(body) => results.extend(Self::parse_validate_response(&body, batch)),
                Err(e) => {
                    log::warn!("USPS validate request failed: {e}");
                    results.extend(batch.iter().map(|_| AddressResult::new(PROVIDER_NAME)));
                }
            }
        }
        results
    }

    async fn lookup_city_state(&self, address: &Address) -> AddressResult {
        let mut result = AddressResult::new(PROVIDER_NAME);
        if address.zip5.trim().is_empty() {
            result.status = ResultStatus::MissingInputParams;
            return result;
        }

        let request_xml = format!(
            "<CityStateLookupRequest USERID=\"{}\"><ZipCode ID=\"0\"><Zip5>{}</Zip5></ZipCode></CityStateLookupRequest>",
            xml::escape(&self.api_key),
            xml::escape(address.zip5.trim()),
        );

        match self.request("CityStateLookup", request_xml).await {
            Ok(body) => {
                if let Some((_, block)) = xml::zipcode_blocks(&body).into_iter().next() {
                    if xml::has_error(&block) {
                        result.messages.push(xml::error_description(&block));
                        return result;
                    }
                    let mut corrected = address.clone();
                    corrected.city = address_parser::title_case(&xml::extract_tag(&block, "City"));
                    corrected.state = xml::extract_tag(&block, "State");
                    return AddressResult::validated(PROVIDER_NAME, corrected);
                }
                if xml::has_error(&body) {
                    result.messages.push(xml::error_description(&body));
                }
                result
            }
            Err(e) => {
                log::warn!("USPS city/state lookup failed: {e}");
                result
            }
        }
    }

    async fn lookup_zipcode(&self, address: &Address) -> AddressResult {
        let mut result = AddressResult::new(PROVIDER_NAME);
        if address.addr1.trim().is_empty() || address.city.trim().is_empty() {
            result.status = ResultStatus::MissingInputParams;
            return result;
        }

        let request_xml = format!(
            "<ZipCodeLookupRequest USERID=\"{}\">{}</ZipCodeLookupRequest>",
            xml::escape(&self.api_key),
            Self::address_to_xml(0, address),
        );

        match self.request("ZipCodeLookup", request_xml).await {
            Ok(body) => {
                if let Some((_, block)) = xml::address_blocks(&body).into_iter().next() {
                    if xml::has_error(&block) {
                        result.messages.push(xml::error_description(&block));
                        return result;
                    }
                    let mut corrected = address.clone();
                    corrected.zip5 = xml::extract_tag(&block, "Zip5");
                    corrected.zip4 = xml::extract_tag(&block, "Zip4");
                    return AddressResult::validated(PROVIDER_NAME, corrected);
                }
                if xml::has_error(&body) {
                    result.messages.push(xml::error_description(&body));
                }
                result
            }
            Err(e) => {
                log::warn!("USPS zip lookup failed: {e}");
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn albany() -> Address {
        Address::new("200 state street", "", "albany", "NY", "", "")
    }

    #[test]
    fn request_xml_escapes_values() {
        let address = Address::new("1 A&B Plaza", "", "Troy", "NY", "12180", "");
        let fragment = Usps::address_to_xml(0, &address);
        assert!(fragment.contains("<Address2>1 A&amp;B Plaza</Address2>"));
        assert!(fragment.contains("<Zip5>12180</Zip5>"));
    }

    #[test]
    fn unit_folds_onto_street_line() {
        let address = Address::new("200 State St", "Apt 4B", "Albany", "NY", "12210", "");
        let fragment = Usps::address_to_xml(2, &address);
        assert!(fragment.contains("<Address2>200 State St Apt 4B</Address2>"));
        assert!(fragment.contains("ID=\"2\""));
    }

    #[test]
    fn parses_validated_batch() {
        let body = r#"<AddressValidateResponse>
            <Address ID="0">
                <Address2>200 STATE ST</Address2>
                <City>ALBANY</City><State>NY</State>
                <Zip5>12210</Zip5><Zip4>2050</Zip4>
            </Address>
            <Address ID="1">
                <Error><Description>Address Not Found.</Description></Error>
            </Address>
        </AddressValidateResponse>"#;

        let batch = vec![albany(), Address::new("1 Nowhere", "", "X", "NY", "", "")];
        let results = Usps::parse_validate_response(body, &batch);

        assert!(results[0].validated);
        let corrected = results[0].address.as_ref().unwrap();
        assert_eq!(corrected.addr1, "200 State St");
        assert_eq!(corrected.city, "Albany");
        assert_eq!(corrected.zip4, "2050");

        assert!(!results[1].validated);
        assert_eq!(results[1].messages, vec!["Address Not Found."]);
        assert_eq!(results[1].status, ResultStatus::NoAddressValidateResult);
    }

    #[test]
    fn top_level_error_fails_the_batch() {
        let body = "<Error><Number>80040B1A</Number>\
                    <Description>Authorization failure.</Description></Error>";
        let batch = vec![albany(), albany()];
        let results = Usps::parse_validate_response(body, &batch);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.validated));
        assert!(results.iter().all(|r| r.messages == vec!["Authorization failure."]));
    }

    #[test]
    fn batch_preserves_positions() {
        let body = r#"<AddressValidateResponse>
            <Address ID="1"><Address2>1 SECOND ST</Address2><City>TROY</City>
                <State>NY</State><Zip5>12180</Zip5><Zip4></Zip4></Address>
            <Address ID="0"><Address2>200 STATE ST</Address2><City>ALBANY</City>
                <State>NY</State><Zip5>12210</Zip5><Zip4></Zip4></Address>
        </AddressValidateResponse>"#;

        let batch = vec![albany(), albany()];
        let results = Usps::parse_validate_response(body, &batch);
        assert_eq!(results[0].address.as_ref().unwrap().zip5, "12210");
        assert_eq!(results[1].address.as_ref().unwrap().zip5, "12180");
    }
}
