//! Raw and parsed postal address models.

use serde::{Deserialize, Serialize};

use crate::geo::Geocode;

/// A raw postal address as supplied by a caller.
///
/// Fields may be empty; `is_empty` distinguishes "no address at all"
/// from a sparse but usable one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub addr1: String,
    pub addr2: String,
    pub city: String,
    pub state: String,
    pub zip5: String,
    pub zip4: String,
    /// Set when this address was produced from a parsed street address
    /// rather than raw user input.
    #[serde(skip)]
    pub parsed: bool,
}

impl Address {
    #[must_use]
    pub fn new(addr1: &str, addr2: &str, city: &str, state: &str, zip5: &str, zip4: &str) -> Self {
        Self {
            addr1: addr1.to_string(),
            addr2: addr2.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            zip5: zip5.to_string(),
            zip4: zip4.to_string(),
            parsed: false,
        }
    }

    /// True when every component is blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addr1.trim().is_empty()
            && self.addr2.trim().is_empty()
            && self.city.trim().is_empty()
            && self.state.trim().is_empty()
            && self.zip5.trim().is_empty()
    }

    /// True when the state field is New York (or blank, which is
    /// treated as in-state by convention).
    #[must_use]
    pub fn is_ny_state(&self) -> bool {
        let state = self.state.trim();
        state.is_empty() || state.eq_ignore_ascii_case("NY") || state.eq_ignore_ascii_case("NEW YORK")
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<&str> = Vec::new();
        for part in [&self.addr1, &self.addr2, &self.city, &self.state] {
            if !part.trim().is_empty() {
                parts.push(part.trim());
            }
        }
        write!(f, "{}", parts.join(", "))?;
        if !self.zip5.trim().is_empty() {
            write!(f, " {}", self.zip5.trim())?;
            if !self.zip4.trim().is_empty() {
                write!(f, "-{}", self.zip4.trim())?;
            }
        }
        Ok(())
    }
}

/// A street address decomposed into its structural components.
///
/// `bldg_num == 0` means no building number was present. All street
/// components are stored upper-case; presentation layers title-case
/// them on the way out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreetAddress {
    pub bldg_num: u32,
    pub pre_dir: String,
    pub street_name: String,
    pub street_type: String,
    pub post_dir: String,
    pub unit_type: String,
    pub unit_num: String,
    /// City or place name.
    pub location: String,
    pub state: String,
    pub zip5: String,
    pub zip4: String,
    /// PO box number when the address is a PO box.
    pub po_box: String,
}

impl StreetAddress {
    /// True when no street name was recovered.
    #[must_use]
    pub fn is_street_empty(&self) -> bool {
        self.street_name.trim().is_empty()
    }

    /// True when the address is a PO box rather than a street address.
    #[must_use]
    pub fn is_po_box(&self) -> bool {
        !self.po_box.is_empty()
    }

    /// The street line with directionals and type, without the unit.
    #[must_use]
    pub fn street_line(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let num = self.bldg_num.to_string();
        if self.bldg_num > 0 {
            parts.push(&num);
        }
        for part in [&self.pre_dir, &self.street_name, &self.street_type, &self.post_dir] {
            if !part.is_empty() {
                parts.push(part);
            }
        }
        parts.join(" ")
    }

    /// Converts back to a raw [`Address`] with the `parsed` flag set.
    #[must_use]
    pub fn to_address(&self) -> Address {
        let addr1 = if self.is_po_box() {
            format!("PO Box {}", self.po_box)
        } else {
            self.street_line()
        };
        let addr2 = if self.unit_type.is_empty() && self.unit_num.is_empty() {
            String::new()
        } else {
            format!("{} {}", self.unit_type, self.unit_num).trim().to_string()
        };
        let mut address = Address::new(&addr1, &addr2, &self.location, &self.state, &self.zip5, &self.zip4);
        address.parsed = true;
        address
    }
}

impl std::fmt::Display for StreetAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_address())
    }
}

/// An address paired with the geocode resolved for it.
///
/// Either half may be absent; the pair is only *valid* when both
/// halves pass their own checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodedAddress {
    pub address: Option<Address>,
    pub geocode: Option<Geocode>,
}

impl GeocodedAddress {
    #[must_use]
    pub const fn new(address: Option<Address>, geocode: Option<Geocode>) -> Self {
        Self { address, geocode }
    }

    #[must_use]
    pub const fn from_address(address: Address) -> Self {
        Self {
            address: Some(address),
            geocode: None,
        }
    }

    #[must_use]
    pub fn is_valid_address(&self) -> bool {
        self.address.as_ref().is_some_and(|a| !a.is_empty())
    }

    #[must_use]
    pub fn is_valid_geocode(&self) -> bool {
        self.geocode.as_ref().is_some_and(Geocode::is_valid)
    }
}

/// A parsed street address paired with its geocode, as returned by the
/// geocode cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedStreetAddress {
    pub street_address: StreetAddress,
    pub geocode: Geocode,
}

impl GeocodedStreetAddress {
    /// Converts to the raw-address pairing used by the pipelines.
    #[must_use]
    pub fn to_geocoded_address(&self) -> GeocodedAddress {
        GeocodedAddress::new(Some(self.street_address.to_address()), Some(self.geocode.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeocodeQuality;

    #[test]
    fn empty_address_detected() {
        assert!(Address::default().is_empty());
        assert!(!Address::new("200 State St", "", "Albany", "NY", "12210", "").is_empty());
    }

    #[test]
    fn ny_state_check() {
        assert!(Address::new("", "", "Albany", "NY", "", "").is_ny_state());
        assert!(Address::new("", "", "Albany", "new york", "", "").is_ny_state());
        assert!(!Address::new("", "", "Boston", "MA", "02108", "").is_ny_state());
    }

    #[test]
    fn street_line_assembles_components() {
        let sa = StreetAddress {
            bldg_num: 200,
            pre_dir: "N".to_string(),
            street_name: "STATE".to_string(),
            street_type: "ST".to_string(),
            ..StreetAddress::default()
        };
        assert_eq!(sa.street_line(), "200 N STATE ST");
    }

    #[test]
    fn po_box_to_address() {
        let sa = StreetAddress {
            po_box: "7016".to_string(),
            location: "Albany".to_string(),
            state: "NY".to_string(),
            zip5: "12225".to_string(),
            ..StreetAddress::default()
        };
        let addr = sa.to_address();
        assert_eq!(addr.addr1, "PO Box 7016");
        assert!(addr.parsed);
    }

    #[test]
    fn geocoded_address_validity() {
        let mut ga = GeocodedAddress::from_address(Address::new(
            "200 State St",
            "",
            "Albany",
            "NY",
            "12210",
            "",
        ));
        assert!(ga.is_valid_address());
        assert!(!ga.is_valid_geocode());
        ga.geocode = Some(Geocode::new(42.65, -73.76, GeocodeQuality::House, "test"));
        assert!(ga.is_valid_geocode());
    }
}
