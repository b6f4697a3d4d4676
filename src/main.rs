//! # News Scraper
//!
//! Scrapes a news publisher's category pages, follows the article links on
//! each, extracts title, author, date, category and body text, and archives
//! every article as its own JSON file plus one combined JSON array per run.
//!
//! ## Usage
//!
//! ```sh
//! news_scraper -c scraper.yaml
//! ```
//!
//! ## Architecture
//!
//! A run is a single sequential pass:
//! 1. **Indexing**: fetch each category page and collect candidate article URLs
//! 2. **Extraction**: fetch each new article and pull out its fields
//! 3. **Output**: write one JSON file per article, then the combined file
//!
//! Fetch failures, invalid pages and write errors skip the affected article;
//! only configuration and output-directory errors end the run early.

use clap::Parser;
use std::error::Error;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod crawl;
mod fetch;
mod models;
mod outputs;
mod scrapers;
mod utils;

use cli::Cli;
use config::ScraperConfig;
use crawl::Scraper;
use fetch::HttpPageSource;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    let mut config = match &args.config {
        Some(path) => ScraperConfig::from_yaml_file(path)?,
        None => ScraperConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    init_tracing(&config);
    debug!(?args, "Parsed CLI arguments");

    run(config).await
}

/// Console logging plus an optional plain-text copy in the log file.
fn init_tracing(config: &ScraperConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let console = tfmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(UtcTime::rfc_3339());

    let mut file_error = None;
    let file_layer = config.log_file.as_ref().and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                tfmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(Mutex::new(file)),
            ),
            Err(e) => {
                file_error = Some((path.clone(), e));
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();

    if let Some((path, e)) = file_error {
        warn!(path = %path.display(), error = %e, "Could not open log file; logging to console only");
    }
}

#[instrument(level = "info", skip_all)]
async fn run(config: ScraperConfig) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();
    info!(base_url = %config.base_url, "news_scraper starting up");

    ensure_writable_dir(&config.data_dir).await?;
    if let Some(parent) = config.combined_output.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_writable_dir(parent).await?;
        }
    }

    let source = HttpPageSource::new(&config)?;
    let mut scraper = Scraper::new(&config, source);
    let summary = scraper.scrape_all().await;

    for category in &summary.categories {
        info!(category_url = %category.category_url, saved = category.saved, "Category summary");
    }

    let elapsed = start_time.elapsed();
    info!(
        total_articles = summary.total_saved,
        urls_attempted = summary.urls_attempted,
        combined_output = %scraper.store().combined_output().display(),
        secs = elapsed.as_secs(),
        "Execution complete"
    );
    Ok(())
}
