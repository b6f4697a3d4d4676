//! Run orchestration.
//!
//! A run visits each configured category page in order, extracts candidate
//! article links, and processes them one at a time:
//!
//! 1. stop once the per-category cap of extracted articles is reached
//! 2. skip URLs already attempted in this run, otherwise mark them attempted
//! 3. fetch and extract the article, saving it if valid
//! 4. pause for the request delay
//!
//! After the last category the combined output is written. Links within a
//! category come from a set, so the order they are processed in is
//! unspecified.
//!
//! Everything runs sequentially on one task; the only waits are the fetches
//! themselves and the courtesy delay.

use crate::config::ScraperConfig;
use crate::fetch::{PageSource, RetryFetch};
use crate::outputs::json::ArticleStore;
use crate::scrapers::article::extract_article;
use crate::scrapers::links::LinkFilter;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Articles persisted from one category page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryResult {
    pub category_url: String,
    pub saved: usize,
}

/// Outcome of a full run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub categories: Vec<CategoryResult>,
    pub total_saved: usize,
    pub urls_attempted: usize,
}

/// Owns all per-run state: the fetcher, the attempted-URL set and the store.
#[derive(Debug)]
pub struct Scraper<F> {
    fetcher: RetryFetch<F>,
    links: LinkFilter,
    store: ArticleStore,
    category_urls: Vec<String>,
    max_articles_per_category: usize,
    delay: Duration,
    scraped_urls: HashSet<String>,
}

impl<F> Scraper<F>
where
    F: PageSource,
{
    pub fn new(config: &ScraperConfig, source: F) -> Self {
        Self {
            fetcher: RetryFetch::from_config(source, config),
            links: LinkFilter::from_config(config),
            store: ArticleStore::from_config(config),
            category_urls: config.category_urls.clone(),
            max_articles_per_category: config.max_articles_per_category,
            delay: config.request_delay(),
            scraped_urls: HashSet::new(),
        }
    }

    /// Scrape every configured category, then write the combined output.
    ///
    /// # Returns
    ///
    /// Per-category saved counts, in configured order, plus run totals. The
    /// combined output is written even when nothing was saved; a failure to
    /// write it is logged rather than returned.
    #[instrument(level = "info", skip_all)]
    pub async fn scrape_all(&mut self) -> RunSummary {
        info!(categories = self.category_urls.len(), "Starting scraper");

        let mut summary = RunSummary::default();
        for category_url in self.category_urls.clone() {
            let before = self.store.len();
            self.scrape_category(&category_url, self.max_articles_per_category)
                .await;
            let saved = self.store.len() - before;
            info!(%category_url, saved, "Finished category");
            summary.categories.push(CategoryResult {
                category_url,
                saved,
            });
        }

        if self.store.is_empty() {
            warn!("No articles saved this run");
        }
        if let Err(e) = self.store.save_all().await {
            error!(error = %e, "Error saving combined articles");
        }

        summary.total_saved = self.store.len();
        summary.urls_attempted = self.scraped_urls.len();
        info!(total = summary.total_saved, "Scraping complete");
        summary
    }

    /// Scrape up to `max_articles` articles linked from one category page.
    #[instrument(level = "info", skip(self))]
    pub async fn scrape_category(&mut self, category_url: &str, max_articles: usize) {
        let page_url = match Url::parse(category_url) {
            Ok(u) => u,
            Err(e) => {
                error!(error = %e, "Invalid category URL; skipping");
                return;
            }
        };

        let html = match self.fetcher.fetch(category_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "Category page unavailable; skipping");
                return;
            }
        };

        let candidates = self
            .links
            .extract_links(&html, &page_url, &self.scraped_urls);
        info!(count = candidates.len(), "Found article links");

        let mut extracted = 0usize;
        for article_url in candidates {
            if extracted >= max_articles {
                debug!(max_articles, "Category cap reached");
                break;
            }
            if !self.scraped_urls.insert(article_url.clone()) {
                continue;
            }

            match extract_article(&self.fetcher, &article_url).await {
                Ok(article) => {
                    self.store.save(article).await;
                    extracted += 1;
                }
                Err(e) if e.is_validation() => {
                    debug!(url = %article_url, reason = %e, "Discarded article");
                }
                Err(e) => {
                    warn!(url = %article_url, error = %e, "Skipping article");
                }
            }

            sleep(self.delay).await;
        }
    }

    pub fn store(&self) -> &ArticleStore {
        &self.store
    }
}
