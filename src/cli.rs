//! Command-line interface definitions.
//!
//! Settings come from an optional YAML config file; the flags below override
//! individual values from it.

use crate::config::ScraperConfig;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the news scraper.
///
/// # Examples
///
/// ```sh
/// # Scrape with the built-in defaults
/// news_scraper
///
/// # Use a config file, but only scrape two categories
/// news_scraper -c scraper.yaml --category https://www.welt.de/politik/ --category https://www.welt.de/sport/
///
/// # Quick test run
/// news_scraper -n 3 -d /tmp/articles -o /tmp/articles/all.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "SCRAPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for per-article JSON files
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Path of the combined JSON output
    #[arg(short = 'o', long)]
    pub combined_output: Option<PathBuf>,

    /// Maximum articles to extract per category
    #[arg(short = 'n', long)]
    pub max_articles: Option<usize>,

    /// Category page to scrape (repeatable; replaces configured categories)
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Seconds to wait between article requests
    #[arg(long)]
    pub delay: Option<f64>,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Apply command-line overrides on top of `config`.
    pub fn apply(&self, config: &mut ScraperConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(path) = &self.combined_output {
            config.combined_output = path.clone();
        }
        if let Some(max) = self.max_articles {
            config.max_articles_per_category = max;
        }
        if !self.categories.is_empty() {
            config.category_urls = self.categories.clone();
        }
        if let Some(delay) = self.delay {
            config.request_delay_secs = delay;
        }
        if let Some(path) = &self.log_file {
            config.log_file = Some(path.clone());
        }
    }
}
