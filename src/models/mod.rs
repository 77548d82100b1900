pub mod raw;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use raw::{NetImoveisDetail, OlxCard, RawListing, VivaRealCard, ZapCard};

/// Placeholder for free-text fields a site did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// Site a listing was scraped from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Origin {
    #[serde(rename = "OLX")]
    Olx,
    #[serde(rename = "VIVA_REAL", alias = "VR")]
    VivaReal,
    #[serde(rename = "ZAP_IMOVEIS", alias = "ZI")]
    ZapImoveis,
    #[serde(rename = "NETIMOVEIS")]
    NetImoveis,
}

impl Origin {
    pub const ALL: [Origin; 4] = [
        Origin::Olx,
        Origin::VivaReal,
        Origin::ZapImoveis,
        Origin::NetImoveis,
    ];

    /// Key used in the config file and as the buffer directory name.
    pub fn key(self) -> &'static str {
        match self {
            Origin::Olx => "olx",
            Origin::VivaReal => "viva-real",
            Origin::ZapImoveis => "zap-imoveis",
            Origin::NetImoveis => "netimoveis",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Origin::Olx => "OLX",
            Origin::VivaReal => "VIVA_REAL",
            Origin::ZapImoveis => "ZAP_IMOVEIS",
            Origin::NetImoveis => "NETIMOVEIS",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Everything a listing is made of except its derived total.
///
/// Also the on-disk shape accepted when reading batches back, so a stored
/// `totalPrice` is ignored and recomputed.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListingFields {
    pub link: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    #[serde(default)]
    pub area: u32,
    #[serde(default)]
    pub price: u64,
    #[serde(default)]
    pub iptu: u64,
    #[serde(default)]
    pub condominio: u64,
    #[serde(default = "not_available")]
    pub location: String,
    #[serde(default = "not_available")]
    pub date_posted: String,
    pub origin: Origin,
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

/// Canonical rental listing shared by every source.
///
/// Immutable once built; `total_price` always equals
/// `price + iptu + condominio`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", from = "ListingFields")]
pub struct Listing {
    link: String,
    title: String,
    bedrooms: u32,
    bathrooms: u32,
    area: u32,
    price: u64,
    iptu: u64,
    condominio: u64,
    total_price: u64,
    location: String,
    date_posted: String,
    origin: Origin,
}

impl From<ListingFields> for Listing {
    fn from(fields: ListingFields) -> Self {
        let total_price = fields
            .price
            .saturating_add(fields.iptu)
            .saturating_add(fields.condominio);

        Self {
            link: fields.link,
            title: fields.title,
            bedrooms: fields.bedrooms,
            bathrooms: fields.bathrooms,
            area: fields.area,
            price: fields.price,
            iptu: fields.iptu,
            condominio: fields.condominio,
            total_price,
            location: fields.location,
            date_posted: fields.date_posted,
            origin: fields.origin,
        }
    }
}

impl Listing {
    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn bedrooms(&self) -> u32 {
        self.bedrooms
    }

    pub fn bathrooms(&self) -> u32 {
        self.bathrooms
    }

    /// Area in m², 0 when the site did not show one.
    pub fn area(&self) -> u32 {
        self.area
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn iptu(&self) -> u64 {
        self.iptu
    }

    pub fn condominio(&self) -> u64 {
        self.condominio
    }

    pub fn total_price(&self) -> u64 {
        self.total_price
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn date_posted(&self) -> &str {
        &self.date_posted
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }
}

#[cfg(test)]
pub(crate) fn sample_listing(link: &str, total: u64, area: u32, origin: Origin) -> Listing {
    Listing::from(ListingFields {
        link: link.to_string(),
        title: format!("Apartamento {link}"),
        bedrooms: 1,
        bathrooms: 1,
        area,
        price: total,
        iptu: 0,
        condominio: 0,
        location: NOT_AVAILABLE.to_string(),
        date_posted: NOT_AVAILABLE.to_string(),
        origin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_sum_of_price_and_fees() {
        let listing = Listing::from(ListingFields {
            link: "https://example.com/1".to_string(),
            title: String::new(),
            bedrooms: 2,
            bathrooms: 1,
            area: 48,
            price: 1_200,
            iptu: 85,
            condominio: 310,
            location: "Centro".to_string(),
            date_posted: NOT_AVAILABLE.to_string(),
            origin: Origin::Olx,
        });

        assert_eq!(listing.total_price(), 1_595);
    }

    #[test]
    fn stored_total_is_recomputed_on_read() {
        let json = r#"{
            "link": "https://example.com/2",
            "title": "Kitnet",
            "bedrooms": 1,
            "bathrooms": 1,
            "area": 30,
            "price": 1000,
            "iptu": 50,
            "condominio": 200,
            "totalPrice": 99999,
            "location": "Prado",
            "datePosted": "N/A",
            "origin": "VR"
        }"#;

        let listing: Listing = serde_json::from_str(json).unwrap();

        assert_eq!(listing.total_price(), 1_250);
        assert_eq!(listing.origin(), Origin::VivaReal);
    }

    #[test]
    fn serializes_camel_case_with_origin_tag() {
        let listing = sample_listing("https://example.com/3", 1500, 40, Origin::ZapImoveis);

        let value = serde_json::to_value(&listing).unwrap();

        assert_eq!(value["totalPrice"], 1500);
        assert_eq!(value["datePosted"], "N/A");
        assert_eq!(value["origin"], "ZAP_IMOVEIS");
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = r#"{"link": "https://example.com/4", "origin": "NETIMOVEIS"}"#;

        let listing: Listing = serde_json::from_str(json).unwrap();

        assert_eq!(listing.area(), 0);
        assert_eq!(listing.location(), NOT_AVAILABLE);
        assert_eq!(listing.title(), "");
    }
}
