//! Cross-source merge: flatten, dedup by link, filter, sort by area.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::buffer::BufferStore;
use crate::error::BufferError;
use crate::models::Listing;

/// Budget and size window a listing must fall into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    /// Minimum monthly total (BRL), inclusive
    pub min_total: u64,
    /// Maximum monthly total (BRL), inclusive
    pub max_total: u64,
    /// Minimum size in square meters
    pub min_area: u32,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_total: 1300,
            max_total: 1700,
            min_area: 35,
        }
    }
}

impl FilterCriteria {
    /// Listings without a known area never match.
    pub fn matches(&self, listing: &Listing) -> bool {
        let total = listing.total_price();
        listing.area() != 0
            && listing.area() >= self.min_area
            && total >= self.min_total
            && total <= self.max_total
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub seen: usize,
    pub duplicates: usize,
    pub filtered_out: usize,
    pub kept: usize,
}

/// Merges every batch into the canonical result sequence.
pub fn aggregate(batches: Vec<Vec<Listing>>, criteria: &FilterCriteria) -> (Vec<Listing>, AggregationStats) {
    let mut stats = AggregationStats::default();
    let mut links = HashSet::new();
    let mut unique = Vec::new();

    for listing in batches.into_iter().flatten() {
        stats.seen += 1;
        if links.insert(listing.link().to_string()) {
            unique.push(listing);
        } else {
            stats.duplicates += 1;
        }
    }

    let mut kept: Vec<Listing> = unique
        .into_iter()
        .filter(|listing| criteria.matches(listing))
        .collect();
    stats.kept = kept.len();
    stats.filtered_out = stats.seen - stats.duplicates - stats.kept;

    // sort_by_key is stable: equal areas keep discovery order
    kept.sort_by_key(Listing::area);

    (kept, stats)
}

/// Reads everything the buffer holds and aggregates it.
pub async fn aggregate_store(
    store: &dyn BufferStore,
    criteria: &FilterCriteria,
) -> Result<(Vec<Listing>, AggregationStats), BufferError> {
    let batches = store.read_all().await?;
    info!("Aggregating {} buffered batches", batches.len());

    let (listings, stats) = aggregate(batches, criteria);
    info!(
        "Aggregated {} listings: {} duplicates, {} filtered out, {} kept",
        stats.seen, stats.duplicates, stats.filtered_out, stats.kept
    );
    Ok((listings, stats))
}
