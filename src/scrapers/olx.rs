use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::browser::WaitCondition;
use crate::error::ItemError;
use crate::models::{OlxCard, Origin, RawListing};
use crate::scrapers::parsing::{absolute_url, css, element_text, non_blank, select_text};
use crate::scrapers::traits::SourceAdapter;
use crate::scrapers::types::{NextPageCheck, PageExtraction};

const BASE_URL: &str = "https://www.olx.com.br";

struct Selectors {
    card: Selector,
    link: Selector,
    detail: Selector,
    price: Selector,
    price_info: Selector,
    location: Selector,
    date: Selector,
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    card: css("section.olx-adcard"),
    link: css("a.olx-adcard__link[href]"),
    detail: css(".olx-adcard__detail"),
    price: css("h3.olx-adcard__price"),
    price_info: css("div.olx-adcard__price-info"),
    location: css("p.olx-adcard__location"),
    date: css("p.olx-adcard__date"),
});

/// OLX rental search results
#[derive(Debug, Default, Clone, Copy)]
pub struct OlxAdapter;

#[async_trait]
impl SourceAdapter for OlxAdapter {
    fn origin(&self) -> Origin {
        Origin::Olx
    }

    fn wait_condition(&self) -> WaitCondition {
        WaitCondition::NetworkIdle
    }

    fn ready_selector(&self) -> Option<&'static str> {
        Some("section.olx-adcard")
    }

    fn next_page_check(&self) -> NextPageCheck {
        NextPageCheck::RelNext(r#"a[rel="next"]"#)
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

    let anchor = card.select(&s.link).next().ok_or(ItemError::MissingLink { index })?;
    let href = non_blank(anchor.value().attr("href")).ok_or(ItemError::MissingLink { index })?;

    let mut raw = OlxCard {
        link: absolute_url(BASE_URL, &href),
        title: non_blank(anchor.value().attr("title")).or_else(|| element_text(anchor)),
        price_text: select_text(card, &s.price),
        location: select_text(card, &s.location),
        date_posted: select_text(card, &s.date),
        ..OlxCard::default()
    };

    for detail in card.select(&s.detail) {
        let label = detail.value().attr("aria-label").unwrap_or_default().to_lowercase();
        let text = element_text(detail).unwrap_or_default().to_lowercase();

        if label.contains("quarto") {
            raw.bedrooms_label = Some(label);
        } else if label.contains("metro") || label.contains("m²") || text.contains("m²") {
            raw.area_label = Some(if label.is_empty() { text } else { label });
        } else if label.contains("banheiro") {
            raw.bathrooms_label = Some(label);
        }
    }

    for info in card.select(&s.price_info).filter_map(element_text) {
        let lower = info.to_lowercase();
        if lower.starts_with("iptu") {
            raw.iptu_text = Some(info);
        } else if lower.starts_with("condomínio") || lower.starts_with("condominio") {
            raw.condominio_text = Some(info);
        }
    }

    Ok(RawListing::Olx(raw))
}
