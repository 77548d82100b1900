//! Site-specific records as pulled from the page, before normalization.
//!
//! Fields hold the raw text fragments; numeric coercion happens in
//! [`crate::normalizer`].

use super::Origin;

/// OLX search-result card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OlxCard {
    pub link: String,
    pub title: Option<String>,
    /// aria-label of the bedrooms detail, e.g. "2 quartos"
    pub bedrooms_label: Option<String>,
    pub bathrooms_label: Option<String>,
    pub area_label: Option<String>,
    pub price_text: Option<String>,
    pub iptu_text: Option<String>,
    pub condominio_text: Option<String>,
    pub location: Option<String>,
    pub date_posted: Option<String>,
}

/// Viva Real search-result card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VivaRealCard {
    pub link: String,
    pub title: Option<String>,
    pub street: Option<String>,
    pub area_text: Option<String>,
    pub bedrooms_text: Option<String>,
    pub bathrooms_text: Option<String>,
    pub price_text: Option<String>,
    /// Lines like "Cond. R$ 720 • IPTU R$ 271"
    pub fee_lines: Vec<String>,
}

/// Zap Imóveis search-result card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZapCard {
    pub link: String,
    pub heading: Option<String>,
    pub street: Option<String>,
    /// Last text child of the heading, when it has several
    pub neighbourhood: Option<String>,
    pub bedrooms_text: Option<String>,
    pub bathrooms_text: Option<String>,
    pub area_text: Option<String>,
    pub price_text: Option<String>,
    pub fee_lines: Vec<String>,
}

/// NetImoveis listing. Index pages only provide `link`; the rest is
/// filled from the detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetImoveisDetail {
    pub link: String,
    pub title: Option<String>,
    pub location: Option<String>,
    /// `(name, value)` pairs from the prices section
    pub price_details: Vec<(String, String)>,
    /// Every `.detail-value` text on the page
    pub feature_values: Vec<String>,
}

impl NetImoveisDetail {
    pub fn from_link(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            ..Self::default()
        }
    }
}

/// One extracted item, tagged by the adapter that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawListing {
    Olx(OlxCard),
    VivaReal(VivaRealCard),
    ZapImoveis(ZapCard),
    NetImoveis(NetImoveisDetail),
}

impl RawListing {
    pub fn origin(&self) -> Origin {
        match self {
            RawListing::Olx(_) => Origin::Olx,
            RawListing::VivaReal(_) => Origin::VivaReal,
            RawListing::ZapImoveis(_) => Origin::ZapImoveis,
            RawListing::NetImoveis(_) => Origin::NetImoveis,
        }
    }

    pub fn link(&self) -> &str {
        match self {
            RawListing::Olx(card) => &card.link,
            RawListing::VivaReal(card) => &card.link,
            RawListing::ZapImoveis(card) => &card.link,
            RawListing::NetImoveis(detail) => &detail.link,
        }
    }
}
