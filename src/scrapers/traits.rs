use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::browser::{BrowserPage, WaitCondition};
use crate::error::{ItemError, SourceError};
use crate::models::{Origin, RawListing};
use crate::scrapers::types::{NextPageCheck, PageExtraction};

/// Pause between reads while waiting for a click to replace the results.
const CHANGE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One site's page vocabulary behind a uniform capability set.
///
/// Sites only describe themselves (`origin`, selectors, `parse_page`); the
/// async operations have defaults built on that description and are what
/// the pagination driver calls.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn origin(&self) -> Origin;

    /// Wait condition for the start URL and for page transitions.
    fn wait_condition(&self) -> WaitCondition {
        WaitCondition::DomContentLoaded
    }

    /// Element that must be present before the page is read.
    fn ready_selector(&self) -> Option<&'static str> {
        None
    }

    fn next_page_check(&self) -> NextPageCheck;

    /// Parses one results page. Missing fields fall back to defaults and a
    /// broken card only skips itself.
    fn parse_page(&self, html: &str) -> PageExtraction;

    async fn load(&self, page: &dyn BrowserPage, url: &str) -> Result<(), SourceError> {
        page.goto(url, self.wait_condition()).await?;
        Ok(())
    }

    async fn extract_page_items(&self, page: &dyn BrowserPage) -> Result<PageExtraction, SourceError> {
        if let Some(selector) = self.ready_selector() {
            page.wait_for(selector).await?;
        }
        let html = page.content().await?;
        Ok(self.parse_page(&html))
    }

    async fn has_next_page(&self, page: &dyn BrowserPage) -> bool {
        match page.content().await {
            Ok(html) => self.next_page_check().has_next(&html),
            Err(e) => {
                warn!("{}: could not read page for next-page check: {}", self.origin(), e);
                false
            }
        }
    }

    /// Identifies the results a document shows: the hash of its item
    /// links, or of the whole document when it has none.
    fn page_marker(&self, html: &str) -> u64 {
        let items = self.parse_page(html).items;
        let mut hasher = DefaultHasher::new();
        if items.is_empty() {
            html.hash(&mut hasher);
        } else {
            for item in &items {
                item.link().hash(&mut hasher);
            }
        }
        hasher.finish()
    }

    /// Moves to the next results page and waits for it to load. Returns
    /// `false` instead of failing so the driver can keep what it has.
    async fn advance_page(&self, page: &dyn BrowserPage) -> bool {
        let before = match page.content().await {
            Ok(html) => self.page_marker(&html),
            Err(e) => {
                warn!("{}: could not read page before advancing: {}", self.origin(), e);
                return false;
            }
        };

        if let Err(e) = page.click(self.next_page_check().selector()).await {
            warn!("{}: next page click failed: {}", self.origin(), e);
            return false;
        }

        self.await_new_results(page, before).await
    }

    /// Polls the page until its marker differs from `before`, then lets the
    /// new document finish loading. A click can return while the old
    /// results are still showing, so returning early would re-read them.
    async fn await_new_results(&self, page: &dyn BrowserPage, before: u64) -> bool {
        let origin = self.origin();
        let timeout = page.navigation_timeout();

        let changed = tokio::time::timeout(timeout, async {
            loop {
                match page.content().await {
                    Ok(html) if self.page_marker(&html) != before => break,
                    Ok(_) => {}
                    Err(e) => debug!("{}: page not readable yet: {}", origin, e),
                }
                tokio::time::sleep(CHANGE_POLL_INTERVAL).await;
            }
        })
        .await;

        if changed.is_err() {
            warn!("{}: results unchanged {:?} after advancing", origin, timeout);
            return false;
        }

        match page.wait_for_navigation(self.wait_condition()).await {
            Ok(()) => true,
            Err(e) => {
                warn!("{}: next page navigation failed: {}", origin, e);
                false
            }
        }
    }

    /// Second pass over one collected item once pagination has ended.
    async fn resolve_item(&self, _page: &dyn BrowserPage, item: RawListing) -> Result<RawListing, ItemError> {
        Ok(item)
    }

    /// Whether `resolve_item` does any work for this source.
    fn resolves_items(&self) -> bool {
        false
    }
}
