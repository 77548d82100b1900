//! NetImoveis: index pages list links only, so every collected link is
//! resolved on its own detail page after pagination ends.

use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::browser::{BrowserPage, WaitCondition};
use crate::error::ItemError;
use crate::models::{NetImoveisDetail, Origin, RawListing};
use crate::scrapers::parsing::{absolute_url, css, element_text, non_blank, select_text};
use crate::scrapers::traits::SourceAdapter;
use crate::scrapers::types::{NextPageCheck, PageExtraction};

const BASE_URL: &str = "https://www.netimoveis.com";
const CARD: &str = "article.card-imovel";
const DETAIL_READY: &str = "h1#titulo";

/// Clicks whichever child of the "next" item is clickable in this render.
const CLICK_NEXT_SCRIPT: &str = r#"(() => {
    const next = document.querySelector("nav ul.pagination li.clnext");
    if (!next || next.classList.contains("disabled")) return false;
    (next.querySelector("span") || next.querySelector("a") || next).click();
    return true;
})()"#;

struct Selectors {
    card: Selector,
    link: Selector,
    title: Selector,
    location: Selector,
    price_detail: Selector,
    detail_name: Selector,
    detail_value: Selector,
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    card: css(CARD),
    link: css("a.link-imovel"),
    title: css(DETAIL_READY),
    location: css("section.section-title > div.text-gray"),
    price_detail: css("section.details.prices div.detail"),
    detail_name: css(".detail-name"),
    detail_value: css(".detail-value"),
});

/// NetImoveis rental search results
#[derive(Debug, Default, Clone, Copy)]
pub struct NetImoveisAdapter;

#[async_trait]
impl SourceAdapter for NetImoveisAdapter {
    fn origin(&self) -> Origin {
        Origin::NetImoveis
    }

    fn wait_condition(&self) -> WaitCondition {
        WaitCondition::NetworkIdle
    }

    fn ready_selector(&self) -> Option<&'static str> {
        Some(CARD)
    }

    fn next_page_check(&self) -> NextPageCheck {
        NextPageCheck::DisabledClass {
            selector: "nav ul.pagination li.clnext",
            class: "disabled",
        }
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

    async fn advance_page(&self, page: &dyn BrowserPage) -> bool {
        let before = match page.content().await {
            Ok(html) => self.page_marker(&html),
            Err(e) => {
                warn!("{}: could not read page before advancing: {}", self.origin(), e);
                return false;
            }
        };

        match page.evaluate(CLICK_NEXT_SCRIPT).await {
            Ok(serde_json::Value::Bool(true)) => {}
            Ok(other) => {
                debug!("{}: next control not clickable ({})", self.origin(), other);
                return false;
            }
            Err(e) => {
                warn!("{}: next page click failed: {}", self.origin(), e);
                return false;
            }
        }

        self.await_new_results(page, before).await
    }

    async fn resolve_item(&self, page: &dyn BrowserPage, item: RawListing) -> Result<RawListing, ItemError> {
        let link = item.link().to_string();
        let unavailable = |e: crate::error::BrowserError| ItemError::DetailUnavailable {
            link: link.clone(),
            message: e.to_string(),
        };

        page.goto(&link, WaitCondition::NetworkIdle).await.map_err(unavailable)?;
        page.wait_for(DETAIL_READY).await.map_err(unavailable)?;
        let html = page.content().await.map_err(unavailable)?;

        Ok(RawListing::NetImoveis(parse_detail(&link, &html)))
    }

    fn resolves_items(&self) -> bool {
        true
    }
}

fn parse_card(index: usize, card: ElementRef<'_>) -> Result<RawListing, ItemError> {
    let href = card
        .select(&SELECTORS.link)
        .next()
        .and_then(|anchor| non_blank(anchor.value().attr("href")))
        .ok_or(ItemError::MissingLink { index })?;
    let link = absolute_url(BASE_URL, &href);

    if link.to_lowercase().contains("urldetalheimovel") {
        return Err(ItemError::DiscardedLink(link));
    }

    Ok(RawListing::NetImoveis(NetImoveisDetail::from_link(link)))
}

/// Reads a listing detail page.
pub fn parse_detail(link: &str, html: &str) -> NetImoveisDetail {
    let s = &*SELECTORS;
    let document = Html::parse_document(html);
    let root = document.root_element();

    let price_details = root
        .select(&s.price_detail)
        .map(|detail| {
            (
                select_text(detail, &s.detail_name).unwrap_or_default(),
                select_text(detail, &s.detail_value).unwrap_or_default(),
            )
        })
        .collect();

    NetImoveisDetail {
        link: link.to_string(),
        title: select_text(root, &s.title),
        location: select_text(root, &s.location),
        price_details,
        feature_values: root.select(&s.detail_value).filter_map(element_text).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeWeb;

    const INDEX: &str = r#"
        <html><body>
        <article class="card-imovel"><a class="link-imovel" href="/imovel/apartamento-carlos-prates-1">Ver</a></article>
        <article class="card-imovel"><a class="link-imovel" href="/UrlDetalheImovel?id=9">Ver</a></article>
        <article class="card-imovel"><span>Lançamento</span></article>
        <nav><ul class="pagination"><li class="clnext disabled"><span>›</span></li></ul></nav>
        </body></html>
    "#;

    const DETAIL: &str = r#"
        <html><body>
        <section class="mb-3 section-title">
            <h1 id="titulo">
                Apartamento com 2 quartos
                para alugar
            </h1>
            <div class="mb-1 text-gray">Rua Itanhandu, Carlos Prates – Belo Horizonte</div>
        </section>
        <section class="details prices">
            <div class="detail"><span class="detail-name">Valor de locação</span><span class="detail-value">R$ 1.100,00</span></div>
            <div class="detail"><span class="detail-name">Condomínio</span><span class="detail-value">R$ 280,00</span></div>
            <div class="detail"><span class="detail-name">IPTU</span><span class="detail-value">R$ 45,50</span></div>
        </section>
        <section class="details features arealote">
            <div class="detail"><span class="detail-value">2 quartos</span></div>
            <div class="detail"><span class="detail-value">1 banheiro</span></div>
            <div class="detail"><span class="detail-value">62,5 m²</span></div>
        </section>
        </body></html>
    "#;

    #[test]
    fn index_keeps_detail_links_only() {
        let extraction = NetImoveisAdapter.parse_page(INDEX);

        assert_eq!(
            extraction.items,
            vec![RawListing::NetImoveis(NetImoveisDetail::from_link(
                "https://www.netimoveis.com/imovel/apartamento-carlos-prates-1"
            ))]
        );
        assert_eq!(extraction.skipped.len(), 2);
        assert!(matches!(extraction.skipped[0], ItemError::DiscardedLink(_)));
        assert_eq!(extraction.skipped[1], ItemError::MissingLink { index: 2 });
    }

    #[test]
    fn disabled_class_ends_pagination() {
        assert!(!NetImoveisAdapter.next_page_check().has_next(INDEX));
    }

    #[test]
    fn detail_page_is_read() {
        let detail = parse_detail("https://www.netimoveis.com/imovel/1", DETAIL);

        assert_eq!(detail.title.as_deref(), Some("Apartamento com 2 quartos para alugar"));
        assert_eq!(
            detail.location.as_deref(),
            Some("Rua Itanhandu, Carlos Prates – Belo Horizonte")
        );
        assert_eq!(detail.price_details.len(), 3);
        assert_eq!(
            detail.price_details[0],
            ("Valor de locação".to_string(), "R$ 1.100,00".to_string())
        );
        assert_eq!(detail.feature_values.len(), 6);
    }

    fn index_page(slug: &str) -> String {
        format!(
            r#"<article class="card-imovel"><a class="link-imovel" href="/imovel/{slug}">Ver</a></article>
            <nav><ul class="pagination"><li class="clnext"><span>›</span></li></ul></nav>"#
        )
    }

    #[tokio::test(start_paused = true)]
    async fn advance_waits_for_the_next_index_to_render() {
        let start = "https://www.netimoveis.com/locacao/minas-gerais/belo-horizonte";
        let page = FakeWeb::default()
            .lagging_site(start, vec![index_page("apto-1"), index_page("apto-2")], 3)
            .page();
        NetImoveisAdapter.load(&page, start).await.unwrap();

        assert!(NetImoveisAdapter.advance_page(&page).await);

        let extraction = NetImoveisAdapter.extract_page_items(&page).await.unwrap();
        assert_eq!(extraction.items[0].link(), "https://www.netimoveis.com/imovel/apto-2");
    }

    #[tokio::test]
    async fn resolve_visits_detail_page() {
        let link = "https://www.netimoveis.com/imovel/1";
        let page = FakeWeb::default().document(link, DETAIL).page();

        let resolved = NetImoveisAdapter
            .resolve_item(&page, RawListing::NetImoveis(NetImoveisDetail::from_link(link)))
            .await
            .unwrap();

        let RawListing::NetImoveis(detail) = resolved else {
            panic!("expected a NetImoveis detail");
        };
        assert_eq!(detail.title.as_deref(), Some("Apartamento com 2 quartos para alugar"));
    }

    #[tokio::test]
    async fn unreachable_detail_is_an_item_error() {
        let page = FakeWeb::default().page();

        let result = NetImoveisAdapter
            .resolve_item(
                &page,
                RawListing::NetImoveis(NetImoveisDetail::from_link("https://www.netimoveis.com/gone")),
            )
            .await;

        assert!(matches!(result, Err(ItemError::DetailUnavailable { .. })));
    }
}
