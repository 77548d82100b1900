use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::error::ItemError;
use crate::models::{Origin, RawListing, VivaRealCard};
use crate::scrapers::parsing::{absolute_url, css, element_text, non_blank, select_text};
use crate::scrapers::traits::SourceAdapter;
use crate::scrapers::types::{NextPageCheck, PageExtraction};

const BASE_URL: &str = "https://www.vivareal.com.br";
const CARD: &str = r#"li[data-cy="rp-property-cd"]"#;

struct Selectors {
    card: Selector,
    link: Selector,
    title: Selector,
    street: Selector,
    area: Selector,
    bedrooms: Selector,
    bathrooms: Selector,
    price: Selector,
    fees: Selector,
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    card: css(CARD),
    link: css("a[href]"),
    title: css(r#"h2[data-cy="rp-cardProperty-location-txt"]"#),
    street: css(r#"p[data-cy="rp-cardProperty-street-txt"]"#),
    area: css(r#"li[data-cy="rp-cardProperty-propertyArea-txt"]"#),
    bedrooms: css(r#"li[data-cy="rp-cardProperty-bedroomQuantity-txt"]"#),
    bathrooms: css(r#"li[data-cy="rp-cardProperty-bathroomQuantity-txt"]"#),
    price: css(r#"div[data-cy="rp-cardProperty-price-txt"] p.text-2-25"#),
    fees: css(r#"div[data-cy="rp-cardProperty-price-txt"] p.text-1-75"#),
});

/// Viva Real rental search results
#[derive(Debug, Default, Clone, Copy)]
pub struct VivaRealAdapter;

#[async_trait]
impl SourceAdapter for VivaRealAdapter {
    fn origin(&self) -> Origin {
        Origin::VivaReal
    }

    fn ready_selector(&self) -> Option<&'static str> {
        Some(CARD)
    }

    fn next_page_check(&self) -> NextPageCheck {
        NextPageCheck::DisabledAttribute(r#"button[data-testid="next-page"]"#)
    }

    fn parse_page(&self, html: &str) -> PageExtraction {
        let document = Html::parse_document(html);
        PageExtraction::from_outcomes(
            document
                .select(&SELECTORS.card)
                .enumerate()
                .map(|(index, card)| parse_card(index, card)),
        )
    }
}

fn parse_card(index: usize, card: ElementRef<'_>) -> Result<RawListing, ItemError> {
    let s = &*SELECTORS;

    let href = card
        .select(&s.link)
        .next()
        .and_then(|anchor| non_blank(anchor.value().attr("href")))
        .ok_or(ItemError::MissingLink { index })?;

    Ok(RawListing::VivaReal(VivaRealCard {
        link: absolute_url(BASE_URL, &href),
        title: select_text(card, &s.title),
        street: select_text(card, &s.street),
        area_text: select_text(card, &s.area),
        bedrooms_text: select_text(card, &s.bedrooms),
        bathrooms_text: select_text(card, &s.bathrooms),
        price_text: select_text(card, &s.price),
        fee_lines: card.select(&s.fees).filter_map(element_text).collect(),
    }))
}
