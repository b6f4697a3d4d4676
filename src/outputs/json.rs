//! JSON persistence for scraped articles.
//!
//! # Output Structure
//!
//! ```text
//! data/
//! ├── 2024-01-15_3f2a9c0d1b7e.json   # one file per article
//! ├── unknown_91c4e07a55d2.json      # article without a date
//! └── all_articles.json              # combined array, rewritten each run
//! ```
//!
//! Filenames come from the configured template (`{date}_{id}.json` by
//! default). `{id}` is the first 12 hex digits of the MD5 digest of the
//! article URL; `{date}` is the first ten characters of the article date, or
//! `unknown`.

use crate::config::ScraperConfig;
use crate::models::Article;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{error, info, instrument};

const ID_LEN: usize = 12;
const UNKNOWN_DATE: &str = "unknown";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Stable identifier for an article URL.
pub fn article_id(url: &str) -> String {
    let digest = format!("{:x}", md5::compute(url.as_bytes()));
    digest[..ID_LEN].to_string()
}

/// Date component used in article filenames.
fn date_prefix(article: &Article) -> String {
    match &article.date {
        Some(date) => date.prefix().replace(['/', '\\'], "-"),
        None => UNKNOWN_DATE.to_string(),
    }
}

/// Writes articles to the data directory and remembers the ones it saved.
#[derive(Debug)]
pub struct ArticleStore {
    data_dir: PathBuf,
    filename_format: String,
    combined_output: PathBuf,
    saved: Vec<Article>,
}

impl ArticleStore {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        filename_format: impl Into<String>,
        combined_output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            filename_format: filename_format.into(),
            combined_output: combined_output.into(),
            saved: Vec::new(),
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(
            config.data_dir.clone(),
            config.article_filename_format.clone(),
            config.combined_output.clone(),
        )
    }

    /// Path the given article would be written to.
    pub fn article_path(&self, article: &Article) -> PathBuf {
        let filename = self
            .filename_format
            .replace("{date}", &date_prefix(article))
            .replace("{id}", &article_id(&article.url));
        self.data_dir.join(filename)
    }

    /// Write one article to its own file.
    ///
    /// # Arguments
    ///
    /// * `article` - the extracted article; kept for the combined output only
    ///   if its file was written
    ///
    /// # Returns
    ///
    /// The path written, or `None` when serialization or the write failed.
    /// Failures are logged, not returned.
    #[instrument(level = "info", skip_all, fields(url = %article.url))]
    pub async fn save(&mut self, article: Article) -> Option<PathBuf> {
        let path = self.article_path(&article);
        match write_pretty(&path, &article).await {
            Ok(()) => {
                info!(path = %path.display(), "Saved article");
                self.saved.push(article);
                Some(path)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Error saving article");
                None
            }
        }
    }

    /// Overwrite the combined output with every article saved so far.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the combined file cannot be written.
    #[instrument(level = "info", skip_all, fields(path = %self.combined_output.display()))]
    pub async fn save_all(&self) -> Result<(), StoreError> {
        write_pretty(&self.combined_output, &self.saved).await?;
        info!(count = self.saved.len(), "Saved combined articles");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.saved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }

    pub fn combined_output(&self) -> &Path {
        &self.combined_output
    }
}

/// Pretty-printed JSON, UTF-8, non-ASCII written literally.
async fn write_pretty<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).await.map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
