use serde::{Deserialize, Serialize};

use forgeroute_core::Coordinates;

/// Where the customer wants the order delivered.
///
/// `coordinates` starts out empty for most orders and is filled in once the
/// address has been geocoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

impl ShippingAddress {
    /// Single-line form used for geocoding lookups: non-empty parts joined
    /// with ", " in street, city, state, zip, country order.
    pub fn one_line(&self) -> String {
        [
            self.street.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.zip.as_str(),
            self.country.as_str(),
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }

    pub fn is_blank(&self) -> bool {
        self.one_line().is_empty()
    }
}
