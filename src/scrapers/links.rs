//! Article link discovery on category pages.
//!
//! Every `a[href]` on a listing page is resolved against the page URL and
//! kept only if it looks like an article on the configured site:
//!
//! 1. contains one of the section patterns (`/politik/`, `/article/`, ...)
//! 2. starts with the site's base URL
//! 3. has not been attempted earlier in this run
//! 4. has a path of at least three `/`-separated segments
//! 5. does not end in `/` (those are section listings)
//!
//! Only the single fetched page is considered; pagination is not followed.

use crate::config::ScraperConfig;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, instrument};
use url::Url;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

/// Filters anchors on a listing page down to candidate article URLs.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    base_url: String,
    section_patterns: Vec<String>,
}

impl LinkFilter {
    pub fn new(base_url: impl Into<String>, section_patterns: Vec<String>) -> Self {
        Self {
            base_url: base_url.into(),
            section_patterns,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(config.base_url.clone(), config.section_patterns.clone())
    }

    /// Collect candidate article URLs from `html`, skipping anything in
    /// `scraped`.
    ///
    /// # Arguments
    ///
    /// * `html` - the category page markup
    /// * `page_url` - the page's own URL, used to resolve relative `href`s
    /// * `scraped` - URLs already attempted this run
    ///
    /// # Returns
    ///
    /// Absolute URLs that pass [`LinkFilter::is_candidate`], without
    /// duplicates. The set is unordered. Unresolvable `href`s are dropped.
    #[instrument(level = "debug", skip_all, fields(page_url = %page_url))]
    pub fn extract_links(
        &self,
        html: &str,
        page_url: &Url,
        scraped: &HashSet<String>,
    ) -> HashSet<String> {
        let document = Html::parse_document(html);
        let links: HashSet<String> = document
            .select(&ANCHOR_SELECTOR)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| page_url.join(href.trim()).ok())
            .map(String::from)
            .filter(|url| !scraped.contains(url) && self.is_candidate(url))
            .collect();

        debug!(count = links.len(), "Candidate article links");
        links
    }

    /// The URL-shape checks, independent of run state.
    pub fn is_candidate(&self, url: &str) -> bool {
        if !self.section_patterns.iter().any(|p| url.contains(p.as_str())) {
            return false;
        }
        if !url.starts_with(&self.base_url) {
            return false;
        }
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        parsed.path().split('/').count() >= 3 && !url.ends_with('/')
    }
}
