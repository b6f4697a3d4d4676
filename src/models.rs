//! Data models for scraped articles.
//!
//! - [`Article`]: one extracted article page, persisted as its own JSON file
//!   and as an element of the combined output.
//! - [`ArticleDate`]: the publication date, parsed with or without an offset,
//!   or kept verbatim.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A publication date as found on the page.
///
/// Every variant serializes as a plain JSON string: the parsed form as
/// RFC 3339, the naive form as ISO 8601 without an offset, the raw form
/// exactly as it appeared in the markup.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ArticleDate {
    Parsed(DateTime<FixedOffset>),
    /// The page gave no offset; none is invented.
    Naive(NaiveDateTime),
    Raw(String),
}

impl ArticleDate {
    /// The first ten characters of the serialized date, `YYYY-MM-DD` for
    /// parsed dates.
    pub fn prefix(&self) -> String {
        self.to_string().chars().take(10).collect()
    }
}

impl fmt::Display for ArticleDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArticleDate::Parsed(dt) => write!(f, "{}", dt.to_rfc3339()),
            ArticleDate::Naive(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            ArticleDate::Raw(raw) => f.write_str(raw),
        }
    }
}

/// A scraped news article.
///
/// Only constructed with a non-empty `title` and `text`; pages missing
/// either are rejected during extraction.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Article {
    /// Absolute article URL. Unique within a run.
    pub url: String,
    /// When the page was extracted.
    pub scraped_at: DateTime<Local>,
    pub title: String,
    /// Body paragraphs separated by a blank line.
    pub text: String,
    pub date: Option<ArticleDate>,
    pub author: Option<String>,
    /// Section from page metadata, or the first URL path segment.
    pub category: Option<String>,
}
