//! Scraper configuration.
//!
//! A [`ScraperConfig`] is a plain value handed to the scraper at construction
//! time. It can be loaded from a YAML file; every key is optional and falls
//! back to the defaults below, which target the Welt.de section pages.
//!
//! ```yaml
//! base_url: https://www.welt.de
//! category_urls:
//!   - https://www.welt.de/politik/
//! request_delay_secs: 2.0
//! max_articles_per_category: 50
//! data_dir: data
//! combined_output: data/all_articles.json
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

/// Errors raised while loading or validating configuration. These are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid base_url {0:?}")]
    InvalidBaseUrl(String),

    #[error("no category_urls configured")]
    NoCategories,

    #[error("article_filename_format must contain an {{id}} placeholder, got {0:?}")]
    FilenameFormat(String),

    #[error("request_timeout_secs must be a finite number greater than zero, got {0}")]
    InvalidTimeout(f64),

    #[error("request_delay_secs must be a finite number of at least zero, got {0}")]
    InvalidDelay(f64),
}

/// Runtime settings for a scraping pass.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScraperConfig {
    /// Only links starting with this prefix are followed.
    pub base_url: String,
    /// Category listing pages, visited in order.
    pub category_urls: Vec<String>,
    /// Path fragments that mark a link as belonging to a content section.
    pub section_patterns: Vec<String>,
    /// Pause between article fetches. Retries wait twice this long.
    pub request_delay_secs: f64,
    pub request_timeout_secs: f64,
    /// Additional attempts after the first failed fetch.
    pub max_retries: u32,
    pub max_articles_per_category: usize,
    pub user_agent: String,
    /// Extra request headers sent with every fetch.
    pub headers: BTreeMap<String, String>,
    /// Directory receiving one JSON file per article.
    pub data_dir: PathBuf,
    /// Filename template with `{date}` and `{id}` placeholders.
    pub article_filename_format: String,
    /// Path of the combined JSON array written at the end of a run.
    pub combined_output: PathBuf,
    pub log_level: String,
    /// Log file receiving a copy of the console log. `None` disables it.
    pub log_file: Option<PathBuf>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        let base_url = "https://www.welt.de".to_string();
        let category_urls = ["politik/", "wirtschaft/", "sport/", "kultur/", "wissenschaft/", ""]
            .iter()
            .map(|section| format!("{base_url}/{section}"))
            .collect();
        let section_patterns = [
            "/article/",
            "/politik/",
            "/wirtschaft/",
            "/sport/",
            "/kultur/",
            "/wissenschaft/",
        ]
        .iter()
        .map(|p| p.to_string())
        .collect();

        let mut headers = BTreeMap::new();
        headers.insert(
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        );
        headers.insert(
            "Accept-Language".to_string(),
            "de-DE,de;q=0.9,en;q=0.8".to_string(),
        );

        Self {
            base_url,
            category_urls,
            section_patterns,
            request_delay_secs: 2.0,
            request_timeout_secs: 10.0,
            max_retries: 3,
            max_articles_per_category: 50,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers,
            data_dir: PathBuf::from("data"),
            article_filename_format: "{date}_{id}.json".to_string(),
            combined_output: PathBuf::from("data/all_articles.json"),
            log_level: "info".to_string(),
            log_file: Some(PathBuf::from("scraper.log")),
        }
    }
}

impl ScraperConfig {
    /// Load a config from a YAML file. Missing keys take their defaults.
    ///
    /// The result is not validated; call [`ScraperConfig::validate`] after
    /// applying any overrides.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not a valid config document,
    /// including unknown keys.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not a map.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Check the invariants the scraper relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.base_url).is_err() {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.category_urls.is_empty() {
            return Err(ConfigError::NoCategories);
        }
        if !self.article_filename_format.contains("{id}") {
            return Err(ConfigError::FilenameFormat(
                self.article_filename_format.clone(),
            ));
        }
        if !(self.request_timeout_secs.is_finite() && self.request_timeout_secs > 0.0) {
            return Err(ConfigError::InvalidTimeout(self.request_timeout_secs));
        }
        if !(self.request_delay_secs.is_finite() && self.request_delay_secs >= 0.0) {
            return Err(ConfigError::InvalidDelay(self.request_delay_secs));
        }
        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs_f64(self.request_delay_secs.max(0.0))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_secs.max(0.0))
    }
}
