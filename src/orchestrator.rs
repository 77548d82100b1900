//! Runs every configured source concurrently and waits for all of them.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::browser::{BrowserPage, BrowserSession};
use crate::buffer::BufferStore;
use crate::models::{Listing, Origin};
use crate::normalizer::normalize;
use crate::pagination::{drive, PaginationLimits, Terminal};
use crate::scrapers::SourceAdapter;

/// One source and the search URLs it should crawl.
#[derive(Clone)]
pub struct SourceJob {
    pub adapter: Arc<dyn SourceAdapter>,
    pub start_urls: Vec<String>,
}

/// What one source produced across all of its start URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub origin: Origin,
    pub listings: usize,
    pub pages: u32,
    pub skipped: usize,
    pub batches_written: usize,
    pub failures: Vec<String>,
}

impl SourceReport {
    fn new(origin: Origin) -> Self {
        Self {
            origin,
            listings: 0,
            pages: 0,
            skipped: 0,
            batches_written: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sources: Vec<SourceReport>,
}

impl RunSummary {
    pub fn total_listings(&self) -> usize {
        self.sources.iter().map(|report| report.listings).sum()
    }

    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|report| !report.is_clean()).count()
    }
}

pub struct Orchestrator {
    browser: Arc<dyn BrowserSession>,
    store: Arc<dyn BufferStore>,
    limits: PaginationLimits,
}

impl Orchestrator {
    pub fn new(browser: Arc<dyn BrowserSession>, store: Arc<dyn BufferStore>, limits: PaginationLimits) -> Self {
        Self { browser, store, limits }
    }

    /// Crawls all sources concurrently. Never fails: a broken source ends
    /// up as failures in its own report and the others carry on.
    pub async fn run(&self, jobs: Vec<SourceJob>) -> RunSummary {
        info!("Starting {} sources", jobs.len());

        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let origin = job.adapter.origin();
            let browser = Arc::clone(&self.browser);
            let store = Arc::clone(&self.store);
            let limits = self.limits;

            let handle = tokio::spawn(async move { run_source(browser, store, job, limits).await });
            handles.push((origin, handle));
        }

        let mut summary = RunSummary::default();
        for (origin, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    warn!("{}: source task aborted: {}", origin, e);
                    let mut report = SourceReport::new(origin);
                    report.failures.push(format!("task aborted: {e}"));
                    report
                }
            };

            if report.listings == 0 {
                warn!("{}: produced no listings", origin);
            }
            info!(
                "{}: {} listings from {} pages, {} skipped, {} failures",
                origin,
                report.listings,
                report.pages,
                report.skipped,
                report.failures.len()
            );
            summary.sources.push(report);
        }

        info!(
            "All sources settled: {} listings, {} source(s) with failures",
            summary.total_listings(),
            summary.failed_sources()
        );
        summary
    }
}

async fn run_source(
    browser: Arc<dyn BrowserSession>,
    store: Arc<dyn BufferStore>,
    job: SourceJob,
    limits: PaginationLimits,
) -> SourceReport {
    let origin = job.adapter.origin();

    let page: Arc<dyn BrowserPage> = match browser.new_page().await {
        Ok(page) => Arc::from(page),
        Err(e) => {
            warn!("{}: could not open a page: {}", origin, e);
            let mut report = SourceReport::new(origin);
            report.failures.push(e.to_string());
            return report;
        }
    };

    // The crawl runs in its own task so a panic still reaches the close below.
    let crawl = tokio::spawn(crawl_source(Arc::clone(&page), store, job, limits));
    let report = match crawl.await {
        Ok(report) => report,
        Err(e) => {
            warn!("{}: crawl task aborted: {}", origin, e);
            let mut report = SourceReport::new(origin);
            report.failures.push(format!("task aborted: {e}"));
            report
        }
    };

    if let Err(e) = page.close().await {
        warn!("{}: could not close page: {}", origin, e);
    }
    report
}

async fn crawl_source(
    page: Arc<dyn BrowserPage>,
    store: Arc<dyn BufferStore>,
    job: SourceJob,
    limits: PaginationLimits,
) -> SourceReport {
    let adapter = job.adapter.as_ref();
    let origin = adapter.origin();
    let mut report = SourceReport::new(origin);

    // Batches from an earlier run would otherwise win the dedup.
    if let Err(e) = store.clear_source(origin).await {
        warn!("{}: could not clear previous batches: {}", origin, e);
        report.failures.push(e.to_string());
    }

    let deadline = limits.start_deadline();
    for start_url in &job.start_urls {
        info!("{}: crawling {}", origin, start_url);
        let outcome = drive(adapter, page.as_ref(), start_url, &limits, deadline).await;

        debug!(
            "{}: {} pages, {} advances from {}",
            origin, outcome.pages, outcome.advances, start_url
        );
        report.pages += outcome.pages;
        report.skipped += outcome.skipped.len();
        if let Terminal::Failed(e) = &outcome.terminal {
            report.failures.push(format!("{start_url}: {e}"));
        }

        let listings: Vec<Listing> = outcome.items.into_iter().map(normalize).collect();
        report.listings += listings.len();

        match store.write_batch(origin, &listings).await {
            Ok(location) => {
                info!("{}: buffered {} listings at {}", origin, listings.len(), location.0);
                report.batches_written += 1;
            }
            Err(e) => {
                warn!("{}: could not buffer batch: {}", origin, e);
                report.failures.push(e.to_string());
            }
        }
    }

    report
}
