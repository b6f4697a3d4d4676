//! Ordered fallback over field lookups.
//!
//! Each field on an article page can be found in several places. A cascade
//! is a slice of strategies tried in order; the first one yielding a
//! non-blank string wins.

use scraper::Html;

/// A single lookup for a field value.
pub type Strategy = fn(&Html) -> Option<String>;

/// Run `strategies` in order and return the first non-blank result, trimmed.
pub fn first_non_empty(document: &Html, strategies: &[Strategy]) -> Option<String> {
    strategies
        .iter()
        .filter_map(|strategy| strategy(document))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
