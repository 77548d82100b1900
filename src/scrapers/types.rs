use scraper::{ElementRef, Html, Selector};

use crate::error::ItemError;
use crate::models::RawListing;

/// Items extracted from one page plus the ones that had to be skipped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageExtraction {
    pub items: Vec<RawListing>,
    pub skipped: Vec<ItemError>,
}

impl PageExtraction {
    /// Splits per-item outcomes into kept items and skip reasons.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = Result<RawListing, ItemError>>) -> Self {
        let mut extraction = Self::default();
        for outcome in outcomes {
            match outcome {
                Ok(item) => extraction.items.push(item),
                Err(reason) => extraction.skipped.push(reason),
            }
        }
        extraction
    }
}

/// How a site signals that another results page exists.
///
/// A missing control always means "no next page".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPageCheck {
    /// The control exists and has no `disabled` attribute.
    DisabledAttribute(&'static str),
    /// The control exists and lacks the given class.
    DisabledClass {
        selector: &'static str,
        class: &'static str,
    },
    /// A `rel="next"` link exists.
    RelNext(&'static str),
}

impl NextPageCheck {
    /// Selector of the control to click when advancing.
    pub fn selector(&self) -> &'static str {
        match self {
            NextPageCheck::DisabledAttribute(selector)
            | NextPageCheck::DisabledClass { selector, .. }
            | NextPageCheck::RelNext(selector) => *selector,
        }
    }

    pub fn has_next(&self, html: &str) -> bool {
        let Ok(selector) = Selector::parse(self.selector()) else {
            return false;
        };
        let document = Html::parse_document(html);
        let control = document.select(&selector).next();

        match (self, control) {
            (_, None) => false,
            (NextPageCheck::DisabledAttribute(_), Some(el)) => el.value().attr("disabled").is_none(),
            (NextPageCheck::DisabledClass { class, .. }, Some(el)) => !has_class(el, class),
            (NextPageCheck::RelNext(_), Some(_)) => true,
        }
    }
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}
