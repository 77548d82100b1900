use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::ItemError;
use crate::models::{Origin, RawListing, ZapCard};
use crate::scrapers::parsing::{absolute_url, collapse_whitespace, css, element_text, non_blank, select_text};
use crate::scrapers::traits::SourceAdapter;
use crate::scrapers::types::{NextPageCheck, PageExtraction};

const BASE_URL: &str = "https://www.zapimoveis.com.br";
const CARD: &str = r#"li[data-cy="rp-property-cd"] > a"#;

struct Selectors {
    card: Selector,
    heading: Selector,
    street: Selector,
    bedrooms: Selector,
    bathrooms: Selector,
    area: Selector,
    price: Selector,
    fees: Selector,
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    card: css(CARD),
    heading: css(r#"h2[data-cy="rp-cardProperty-location-txt"]"#),
    street: css(r#"p[data-cy="rp-cardProperty-street-txt"]"#),
    bedrooms: css(r#"li[data-cy="rp-cardProperty-bedroomQuantity-txt"] h3"#),
    bathrooms: css(r#"li[data-cy="rp-cardProperty-bathroomQuantity-txt"] h3"#),
    area: css(r#"li[data-cy="rp-cardProperty-propertyArea-txt"] h3"#),
    price: css(r#"div[data-cy="rp-cardProperty-price-txt"] p.text-2-25"#),
    fees: css(r#"div[data-cy="rp-cardProperty-price-txt"] p.text-1-75"#),
});

/// Zap Imóveis rental search results
#[derive(Debug, Default, Clone, Copy)]
pub struct ZapImoveisAdapter;

#[async_trait]
impl SourceAdapter for ZapImoveisAdapter {
    fn origin(&self) -> Origin {
        Origin::ZapImoveis
    }

    fn ready_selector(&self) -> Option<&'static str> {
        Some(CARD)
    }

    fn next_page_check(&self) -> NextPageCheck {
        NextPageCheck::DisabledAttribute(r#"nav[data-testid="l-pagination"] button[aria-label="Próxima página"]"#)
    }

    fn parse_page(&self, html: &str) -> PageExtraction {
        let document = Html::parse_document(html);
        PageExtraction::from_outcomes(
            document
                .select(&SELECTORS.card)
                .enumerate()
                .map(|(index, anchor)| parse_card(index, anchor)),
        )
    }
}

fn parse_card(index: usize, anchor: ElementRef<'_>) -> Result<RawListing, ItemError> {
    let s = &*SELECTORS;

    let href = non_blank(anchor.value().attr("href")).ok_or(ItemError::MissingLink { index })?;
    let heading = anchor.select(&s.heading).next();

    Ok(RawListing::ZapImoveis(ZapCard {
        link: absolute_url(BASE_URL, &href),
        heading: heading.and_then(element_text),
        street: select_text(anchor, &s.street),
        neighbourhood: heading.and_then(last_child_text),
        bedrooms_text: select_text(anchor, &s.bedrooms),
        bathrooms_text: select_text(anchor, &s.bathrooms),
        area_text: select_text(anchor, &s.area),
        price_text: select_text(anchor, &s.price),
        fee_lines: anchor.select(&s.fees).filter_map(element_text).collect(),
    }))
}

/// Text of the heading's last non-blank child, when it has more than one.
fn last_child_text(heading: ElementRef<'_>) -> Option<String> {
    let texts: Vec<String> = heading
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(collapse_whitespace(text)),
            Node::Element(_) => ElementRef::wrap(child).and_then(element_text),
            _ => None,
        })
        .filter(|text| !text.is_empty())
        .collect();

    if texts.len() > 1 {
        texts.last().cloned()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body><ul>
        <li data-cy="rp-property-cd">
            <a href="https://www.zapimoveis.com.br/imovel/aluguel-apartamento-1-quarto-prado-id-10/">
                <h2 data-cy="rp-cardProperty-location-txt">
                    <span>Apartamento para alugar em</span>
                    Prado, Belo Horizonte
                </h2>
                <p data-cy="rp-cardProperty-street-txt">Rua Platina</p>
                <ul>
                    <li data-cy="rp-cardProperty-bedroomQuantity-txt"><h3>1 quarto</h3></li>
                    <li data-cy="rp-cardProperty-bathroomQuantity-txt"><h3>1</h3></li>
                    <li data-cy="rp-cardProperty-propertyArea-txt"><h3>40-45 m²</h3></li>
                </ul>
                <div data-cy="rp-cardProperty-price-txt">
                    <p class="text-2-25">R$ 1.100 /mês</p>
                    <p class="text-1-75">Cond. R$ 250 • IPTU R$ 40</p>
                </div>
            </a>
        </li>
        <li data-cy="rp-property-cd">
            <a href="/imovel/aluguel-casa-santa-tereza-id-11/">
                <h2 data-cy="rp-cardProperty-location-txt">Casa em Santa Tereza</h2>
            </a>
        </li>
        <li data-cy="rp-property-cd"><a>Anúncio patrocinado</a></li>
        </ul>
        <nav data-testid="l-pagination">
            <button aria-label="Página anterior" disabled>‹</button>
            <button aria-label="Próxima página">›</button>
        </nav>
        </body></html>
    "#;

    #[test]
    fn parses_cards() {
        let extraction = ZapImoveisAdapter.parse_page(PAGE);

        assert_eq!(extraction.items.len(), 2);
        assert_eq!(extraction.skipped, vec![ItemError::MissingLink { index: 2 }]);

        let RawListing::ZapImoveis(first) = &extraction.items[0] else {
            panic!("expected a Zap card");
        };
        assert_eq!(
            first.heading.as_deref(),
            Some("Apartamento para alugar em Prado, Belo Horizonte")
        );
        assert_eq!(first.neighbourhood.as_deref(), Some("Prado, Belo Horizonte"));
        assert_eq!(first.street.as_deref(), Some("Rua Platina"));
        assert_eq!(first.bedrooms_text.as_deref(), Some("1 quarto"));
        assert_eq!(first.area_text.as_deref(), Some("40-45 m²"));
        assert_eq!(first.price_text.as_deref(), Some("R$ 1.100 /mês"));
        assert_eq!(first.fee_lines.len(), 1);
    }

    #[test]
    fn single_child_heading_has_no_neighbourhood() {
        let extraction = ZapImoveisAdapter.parse_page(PAGE);

        let RawListing::ZapImoveis(second) = &extraction.items[1] else {
            panic!("expected a Zap card");
        };
        assert_eq!(second.link, "https://www.zapimoveis.com.br/imovel/aluguel-casa-santa-tereza-id-11/");
        assert!(second.neighbourhood.is_none());
        assert!(second.street.is_none());
    }

    #[test]
    fn enabled_next_button_continues() {
        let check = ZapImoveisAdapter.next_page_check();

        assert!(check.has_next(PAGE));
        assert!(!check.has_next(
            r#"<nav data-testid="l-pagination"><button aria-label="Próxima página" disabled>›</button></nav>"#
        ));
    }
}
