//! Page automation boundary.
//!
//! Adapters only talk to [`BrowserPage`]; [`chrome`] drives a real
//! headless Chrome and `fake` serves canned documents in tests.

pub mod chrome;
#[cfg(test)]
pub mod fake;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BrowserError;

pub use chrome::{ChromeOptions, ChromeSession};

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    DomContentLoaded,
    /// Load event plus a settle delay for late XHR-rendered content.
    NetworkIdle,
}

/// Shared browser process handing out one page per source task.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError>;
}

/// A single tab, owned by exactly one task.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn goto(&self, url: &str, wait: WaitCondition) -> Result<(), BrowserError>;

    /// Serialized HTML of the current document.
    async fn content(&self) -> Result<String, BrowserError>;

    async fn wait_for(&self, selector: &str) -> Result<(), BrowserError>;

    /// Clicks the first element matching `selector`. Returns as soon as the
    /// click is dispatched; the document may still be the old one.
    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, BrowserError>;

    /// Waits out a navigation in flight, if any, then settles per `wait`.
    async fn wait_for_navigation(&self, wait: WaitCondition) -> Result<(), BrowserError>;

    /// How long a page transition may take before it counts as failed.
    fn navigation_timeout(&self) -> Duration;

    async fn close(&self) -> Result<(), BrowserError>;
}
