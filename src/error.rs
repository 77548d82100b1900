use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Fatal startup problems. Nothing is crawled when one of these occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config is missing required source `{0}`")]
    MissingSource(&'static str),

    #[error("source `{0}` has no start URL")]
    NoStartUrls(&'static str),

    #[error("filter range is empty: minTotal {min} > maxTotal {max}")]
    EmptyRange { min: u64, max: u64 },
}

/// Failures reported by the browser collaborator.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("failed to open page: {0}")]
    NewPage(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("element `{selector}` not found: {message}")]
    ElementNotFound { selector: String, message: String },

    #[error("click on `{selector}` failed: {message}")]
    Click { selector: String, message: String },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("failed to read page content: {0}")]
    Content(String),

    #[error("browser task failed: {0}")]
    Task(String),
}

/// Per-source failures. These stop one source's pagination but never
/// cross into other sources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("could not advance past page {page}")]
    AdvanceFailed { page: u32 },

    #[error("page {page} repeated the previous page's items")]
    Stalled { page: u32 },

    #[error("reached the page limit of {max}")]
    PageLimit { max: u32 },

    #[error("source deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// Reason a single item was skipped during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("card #{index} has no link")]
    MissingLink { index: usize },

    #[error("discarded link {0}")]
    DiscardedLink(String),

    #[error("detail page {link} unavailable: {message}")]
    DetailUnavailable { link: String, message: String },

    #[error("deadline passed before {0} was resolved")]
    Unresolved(String),
}

/// Buffer store and output I/O failures. Fatal for aggregation only.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl BufferError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
