//! Raw site records to canonical [`Listing`]s.
//!
//! Pure and deterministic: no I/O, no clock. The total price is always
//! computed here (via [`Listing::from`]), never copied from a page.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{
    Listing, ListingFields, NetImoveisDetail, OlxCard, Origin, RawListing, VivaRealCard, ZapCard,
    NOT_AVAILABLE,
};
use crate::scrapers::parsing::{amount_before_cents, count, digits, first_number};

static CONDO_FEE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Cond\.\s*R\$\s*([\d.,]+)").expect("valid regex"));
static IPTU_FEE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)IPTU\s*R\$\s*([\d.,]+)").expect("valid regex"));
static AREA_M2: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(?:-\d+)?\s*m²").expect("valid regex"));
static PER_MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)/\s*mês").expect("valid regex"));

pub fn normalize(raw: RawListing) -> Listing {
    match raw {
        RawListing::Olx(card) => from_olx(card),
        RawListing::VivaReal(card) => from_viva_real(card),
        RawListing::ZapImoveis(card) => from_zap(card),
        RawListing::NetImoveis(detail) => from_netimoveis(detail),
    }
}

impl From<RawListing> for Listing {
    fn from(raw: RawListing) -> Self {
        normalize(raw)
    }
}

fn or_not_available(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn number_of(text: Option<&str>, parse: fn(&str) -> u64) -> u64 {
    text.map(parse).unwrap_or(0)
}

/// Last amount matched by `pattern` across the fee lines.
fn fee(lines: &[String], pattern: &Regex) -> u64 {
    lines
        .iter()
        .filter_map(|line| pattern.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|amount| digits(amount.as_str()))
        .last()
        .unwrap_or(0)
}

fn from_olx(card: OlxCard) -> Listing {
    Listing::from(ListingFields {
        link: card.link,
        title: card.title.unwrap_or_default(),
        bedrooms: count(number_of(card.bedrooms_label.as_deref(), first_number)),
        bathrooms: count(number_of(card.bathrooms_label.as_deref(), first_number)),
        area: count(number_of(card.area_label.as_deref(), first_number)),
        price: number_of(card.price_text.as_deref(), digits),
        iptu: number_of(card.iptu_text.as_deref(), digits),
        condominio: number_of(card.condominio_text.as_deref(), digits),
        location: or_not_available(card.location),
        date_posted: or_not_available(card.date_posted),
        origin: Origin::Olx,
    })
}

fn from_viva_real(card: VivaRealCard) -> Listing {
    Listing::from(ListingFields {
        link: card.link,
        title: card.title.unwrap_or_default(),
        bedrooms: count(number_of(card.bedrooms_text.as_deref(), digits)),
        bathrooms: count(number_of(card.bathrooms_text.as_deref(), digits)),
        area: count(number_of(card.area_text.as_deref(), digits)),
        price: number_of(card.price_text.as_deref(), digits),
        iptu: fee(&card.fee_lines, &IPTU_FEE),
        condominio: fee(&card.fee_lines, &CONDO_FEE),
        location: or_not_available(card.street),
        date_posted: NOT_AVAILABLE.to_string(),
        origin: Origin::VivaReal,
    })
}

fn zap_area(text: &str) -> u64 {
    AREA_M2
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| digits(m.as_str()))
        .unwrap_or(0)
}

fn zap_price(text: &str) -> u64 {
    digits(&PER_MONTH.replace_all(text, ""))
}

fn from_zap(card: ZapCard) -> Listing {
    let title = [card.heading.as_deref(), card.street.as_deref()]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" - ");

    Listing::from(ListingFields {
        link: card.link,
        title,
        bedrooms: count(number_of(card.bedrooms_text.as_deref(), first_number)),
        bathrooms: count(number_of(card.bathrooms_text.as_deref(), first_number)),
        area: count(number_of(card.area_text.as_deref(), zap_area)),
        price: number_of(card.price_text.as_deref(), zap_price),
        iptu: fee(&card.fee_lines, &IPTU_FEE),
        condominio: fee(&card.fee_lines, &CONDO_FEE),
        location: or_not_available(card.neighbourhood),
        date_posted: NOT_AVAILABLE.to_string(),
        origin: Origin::ZapImoveis,
    })
}

fn from_netimoveis(detail: NetImoveisDetail) -> Listing {
    let mut price = 0;
    let mut iptu = 0;
    let mut condominio = 0;
    for (name, value) in &detail.price_details {
        let name = name.to_lowercase();
        if name.contains("valor de locação") {
            price = amount_before_cents(value);
        } else if name.contains("condomínio") {
            condominio = amount_before_cents(value);
        } else if name.contains("iptu") {
            iptu = amount_before_cents(value);
        }
    }

    let mut bedrooms = 0;
    let mut bathrooms = 0;
    let mut area = 0;
    for value in &detail.feature_values {
        let value = value.to_lowercase();
        if value.contains("quart") {
            bedrooms = digits(&value);
        } else if value.contains("banhei") {
            bathrooms = digits(&value);
        } else if value.contains("m²") {
            area = amount_before_cents(&value);
        }
    }

    Listing::from(ListingFields {
        link: detail.link,
        title: detail.title.unwrap_or_default(),
        bedrooms: count(bedrooms),
        bathrooms: count(bathrooms),
        area: count(area),
        price,
        iptu,
        condominio,
        location: or_not_available(detail.location),
        date_posted: NOT_AVAILABLE.to_string(),
        origin: Origin::NetImoveis,
    })
}
