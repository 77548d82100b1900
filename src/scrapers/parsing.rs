//! Text and number helpers shared by the site adapters and the normalizer.
//!
//! Numbers follow one rule: every non-digit character is stripped before
//! coercion, so "R$ 1.700/mês" reads as 1700. Anything that still fails
//! to parse reads as 0.

use scraper::{ElementRef, Selector};

/// Compiles a selector literal. Only used for the static selector tables.
pub fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("valid selector")
}

/// All digits of `text` read as one integer.
pub fn digits(text: &str) -> u64 {
    text.chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

/// First run of digits, for labels like "2 quartos" or "45-60 m²".
pub fn first_number(text: &str) -> u64 {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|run| !run.is_empty())
        .and_then(|run| run.parse().ok())
        .unwrap_or(0)
}

/// Money with cents after a comma ("R$ 1.500,00"); cents are dropped.
pub fn amount_before_cents(text: &str) -> u64 {
    digits(text.split(',').next().unwrap_or_default())
}

/// Narrows a parsed number to a count, treating overflow as unparseable.
pub fn count(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-collapsed text content of an element, `None` when blank.
pub fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = collapse_whitespace(&element.text().collect::<String>());
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Text of the first descendant matching `selector`.
pub fn select_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element.select(selector).next().and_then(element_text)
}

pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Resolves an `href` attribute against the site's base URL.
pub fn absolute_url(base: &str, href: &str) -> String {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), href)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), href)
    }
}
