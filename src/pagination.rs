//! Generic pagination driver.
//!
//! Runs one source adapter through
//! `Loading → Extracting → CheckingNext → {Advancing | Done | Failed}`.
//! Both terminal states hand back every item collected so far.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::browser::BrowserPage;
use crate::error::{ItemError, SourceError};
use crate::models::RawListing;
use crate::scrapers::SourceAdapter;

/// Bounds that keep a source from paging forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationLimits {
    pub max_pages: u32,
    /// Wall-clock budget for one source across all of its start URLs,
    /// detail pages included.
    pub deadline: Option<Duration>,
}

impl PaginationLimits {
    /// Starts the source's clock. Call once per source and hand the result
    /// to every [`drive`] for that source.
    pub fn start_deadline(&self) -> Option<Deadline> {
        self.deadline.map(Deadline::after)
    }
}

impl Default for PaginationLimits {
    fn default() -> Self {
        Self {
            max_pages: 50,
            deadline: Some(Duration::from_secs(900)),
        }
    }
}

/// A fixed point in time after which a source stops working.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    fn passed(&self) -> bool {
        Instant::now() >= self.at
    }
}

#[derive(Debug)]
enum PaginationState {
    Loading,
    Extracting,
    CheckingNext,
    Advancing,
    Done,
    Failed(SourceError),
}

#[derive(Debug)]
pub enum Terminal {
    Done,
    Failed(SourceError),
}

#[derive(Debug, Default)]
struct Cursor {
    page: u32,
    exhausted: bool,
    failure: Option<SourceError>,
    last_fingerprint: Option<u64>,
}

#[derive(Debug)]
pub struct PaginationOutcome {
    pub items: Vec<RawListing>,
    /// Pages whose items were captured
    pub pages: u32,
    pub advances: u32,
    pub skipped: Vec<ItemError>,
    pub terminal: Terminal,
}

impl PaginationOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self.terminal, Terminal::Done)
    }
}

fn fingerprint(items: &[RawListing]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for item in items {
        item.link().hash(&mut hasher);
    }
    hasher.finish()
}

/// Runs `step` under whatever is left of the deadline.
async fn within<T>(deadline: Option<Deadline>, step: impl Future<Output = T>) -> Result<T, SourceError> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline.at, step)
            .await
            .map_err(|_| SourceError::DeadlineExceeded(deadline.budget)),
        None => Ok(step.await),
    }
}

/// Drives `adapter` from `start_url` until it runs out of pages, hits the
/// page cap or `deadline`, or fails.
pub async fn drive(
    adapter: &dyn SourceAdapter,
    page: &dyn BrowserPage,
    start_url: &str,
    limits: &PaginationLimits,
    deadline: Option<Deadline>,
) -> PaginationOutcome {
    let origin = adapter.origin();

    let mut cursor = Cursor::default();
    let mut items = Vec::new();
    let mut skipped = Vec::new();
    let mut advances = 0;
    let mut state = PaginationState::Loading;

    loop {
        state = match state {
            PaginationState::Loading => {
                debug!("{}: loading {}", origin, start_url);
                match within(deadline, adapter.load(page, start_url)).await {
                    Ok(Ok(())) => PaginationState::Extracting,
                    Ok(Err(e)) | Err(e) => PaginationState::Failed(e),
                }
            }
            PaginationState::Extracting => match within(deadline, adapter.extract_page_items(page)).await {
                Ok(Ok(extraction)) => {
                    let page_number = cursor.page + 1;
                    let print = fingerprint(&extraction.items);

                    if !extraction.items.is_empty() && cursor.last_fingerprint == Some(print) {
                        PaginationState::Failed(SourceError::Stalled { page: page_number })
                    } else {
                        debug!(
                            "{}: page {} yielded {} items ({} skipped)",
                            origin,
                            page_number,
                            extraction.items.len(),
                            extraction.skipped.len()
                        );
                        for reason in &extraction.skipped {
                            debug!("{}: skipped item: {}", origin, reason);
                        }
                        cursor.page = page_number;
                        cursor.last_fingerprint = Some(print);
                        items.extend(extraction.items);
                        skipped.extend(extraction.skipped);
                        PaginationState::CheckingNext
                    }
                }
                Ok(Err(e)) | Err(e) => PaginationState::Failed(e),
            },
            PaginationState::CheckingNext => match within(deadline, adapter.has_next_page(page)).await {
                Ok(true) if cursor.page >= limits.max_pages => {
                    PaginationState::Failed(SourceError::PageLimit { max: limits.max_pages })
                }
                Ok(true) => PaginationState::Advancing,
                Ok(false) => {
                    cursor.exhausted = true;
                    PaginationState::Done
                }
                Err(e) => PaginationState::Failed(e),
            },
            PaginationState::Advancing => {
                advances += 1;
                match within(deadline, adapter.advance_page(page)).await {
                    Ok(true) => PaginationState::Extracting,
                    Ok(false) => PaginationState::Failed(SourceError::AdvanceFailed { page: cursor.page }),
                    Err(e) => PaginationState::Failed(e),
                }
            }
            PaginationState::Done => break,
            PaginationState::Failed(e) => {
                cursor.failure = Some(e);
                break;
            }
        };
    }

    let terminal = match cursor.failure.take() {
        Some(e) => {
            warn!(
                "{}: stopped after {} page(s) with {} items: {}",
                origin,
                cursor.page,
                items.len(),
                e
            );
            Terminal::Failed(e)
        }
        None => {
            debug_assert!(cursor.exhausted);
            info!("{}: exhausted after {} page(s), {} items", origin, cursor.page, items.len());
            Terminal::Done
        }
    };

    let items = if adapter.resolves_items() {
        resolve_all(adapter, page, items, deadline, &mut skipped).await
    } else {
        items
    };

    PaginationOutcome {
        items,
        pages: cursor.page,
        advances,
        skipped,
        terminal,
    }
}

async fn resolve_all(
    adapter: &dyn SourceAdapter,
    page: &dyn BrowserPage,
    items: Vec<RawListing>,
    deadline: Option<Deadline>,
    skipped: &mut Vec<ItemError>,
) -> Vec<RawListing> {
    let origin = adapter.origin();
    let total = items.len();
    let mut resolved = Vec::with_capacity(total);

    for item in items {
        if deadline.is_some_and(|deadline| deadline.passed()) {
            skipped.push(ItemError::Unresolved(item.link().to_string()));
            continue;
        }

        let step = adapter.resolve_item(page, item.clone());
        let outcome = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline.at, step)
                .await
                .unwrap_or_else(|_| Err(ItemError::Unresolved(item.link().to_string()))),
            None => step.await,
        };

        match outcome {
            Ok(item) => resolved.push(item),
            Err(reason) => {
                debug!("{}: skipped item: {}", origin, reason);
                skipped.push(reason);
            }
        }
    }

    info!("{}: resolved {}/{} detail pages", origin, resolved.len(), total);
    resolved
}
