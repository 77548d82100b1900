//! In-memory browser serving canned HTML.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::{BrowserPage, BrowserSession, WaitCondition};
use crate::error::BrowserError;

/// Paginated result set reachable from one start URL.
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pub pages: Vec<String>,
    /// Advancing away from this page index fails.
    pub fail_advance_from: Option<usize>,
    /// Reads that still see the old page after a click.
    pub lag: usize,
}

/// Routing table shared by every fake page.
#[derive(Debug, Clone, Default)]
pub struct FakeWeb {
    sites: HashMap<String, FakeSite>,
    documents: HashMap<String, String>,
    closed: Arc<AtomicUsize>,
}

impl FakeWeb {
    pub fn site(mut self, start_url: &str, pages: Vec<String>) -> Self {
        self.sites.insert(
            start_url.to_string(),
            FakeSite {
                pages,
                ..FakeSite::default()
            },
        );
        self
    }

    pub fn failing_site(mut self, start_url: &str, pages: Vec<String>, fail_from: usize) -> Self {
        self.sites.insert(
            start_url.to_string(),
            FakeSite {
                pages,
                fail_advance_from: Some(fail_from),
                ..FakeSite::default()
            },
        );
        self
    }

    /// A site whose clicks return before the next page has replaced the
    /// current one, like a client-side render.
    pub fn lagging_site(mut self, start_url: &str, pages: Vec<String>, lag: usize) -> Self {
        self.sites.insert(
            start_url.to_string(),
            FakeSite {
                pages,
                lag,
                ..FakeSite::default()
            },
        );
        self
    }

    /// Counts `close` calls across every page this web hands out.
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closed)
    }

    pub fn document(mut self, url: &str, html: &str) -> Self {
        self.documents.insert(url.to_string(), html.to_string());
        self
    }

    pub fn session(self) -> FakeSession {
        FakeSession { web: Arc::new(self) }
    }

    pub fn page(self) -> FakePage {
        FakePage::new(Arc::new(self))
    }
}

pub struct FakeSession {
    web: Arc<FakeWeb>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        Ok(Box::new(FakePage::new(Arc::clone(&self.web))))
    }
}

struct PendingPage {
    index: usize,
    html: String,
    stale_reads: usize,
}

#[derive(Default)]
struct FakeState {
    site: Option<String>,
    index: usize,
    html: String,
    pending: Option<PendingPage>,
}

pub struct FakePage {
    web: Arc<FakeWeb>,
    state: Mutex<FakeState>,
}

impl FakePage {
    fn new(web: Arc<FakeWeb>) -> Self {
        Self {
            web,
            state: Mutex::new(FakeState::default()),
        }
    }

    fn advance(&self) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        let site = state
            .site
            .as_ref()
            .and_then(|url| self.web.sites.get(url))
            .ok_or_else(|| BrowserError::Navigation {
                url: "about:blank".to_string(),
                message: "no paginated site loaded".to_string(),
            })?;

        if site.fail_advance_from.is_some_and(|from| state.index >= from) {
            return Err(BrowserError::Navigation {
                url: format!("page {}", state.index + 1),
                message: "navigation timed out".to_string(),
            });
        }

        let next = state.index + 1;
        let html = site.pages.get(next).cloned().ok_or_else(|| BrowserError::Navigation {
            url: format!("page {next}"),
            message: "no such page".to_string(),
        })?;
        if site.lag > 0 {
            state.pending = Some(PendingPage {
                index: next,
                html,
                stale_reads: site.lag,
            });
        } else {
            state.index = next;
            state.html = html;
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, url: &str, _wait: WaitCondition) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        if let Some(site) = self.web.sites.get(url) {
            state.site = Some(url.to_string());
            state.index = 0;
            state.pending = None;
            state.html = site.pages.first().cloned().unwrap_or_default();
            Ok(())
        } else if let Some(html) = self.web.documents.get(url) {
            state.pending = None;
            state.html = html.clone();
            Ok(())
        } else {
            Err(BrowserError::Navigation {
                url: url.to_string(),
                message: "404".to_string(),
            })
        }
    }

    async fn content(&self) -> Result<String, BrowserError> {
        let mut state = self.state.lock().unwrap();
        if let Some(mut pending) = state.pending.take() {
            if pending.stale_reads == 0 {
                state.index = pending.index;
                state.html = pending.html;
            } else {
                pending.stale_reads -= 1;
                state.pending = Some(pending);
            }
        }
        Ok(state.html.clone())
    }

    async fn wait_for(&self, selector: &str) -> Result<(), BrowserError> {
        let html = self.state.lock().unwrap().html.clone();
        let parsed = Selector::parse(selector).unwrap();
        if Html::parse_document(&html).select(&parsed).next().is_some() {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound {
                selector: selector.to_string(),
                message: "timed out".to_string(),
            })
        }
    }

    async fn click(&self, _selector: &str) -> Result<(), BrowserError> {
        self.advance()
    }

    async fn evaluate(&self, _expression: &str) -> Result<serde_json::Value, BrowserError> {
        self.advance()?;
        Ok(serde_json::Value::Bool(true))
    }

    async fn wait_for_navigation(&self, _wait: WaitCondition) -> Result<(), BrowserError> {
        Ok(())
    }

    fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.web.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
