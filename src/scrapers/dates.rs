//! Permissive publication date parsing.
//!
//! Dates come from `<meta>` tags and `<time>` elements in whatever shape the
//! publisher chose. We try RFC 3339 and RFC 2822 first, then a handful of
//! common ISO-like and German forms. Values without an offset stay naive
//! and date-only values become midnight. If nothing matches the raw string
//! is kept.

use crate::models::ArticleDate;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S %z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y, %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d", "%B %d, %Y", "%d %B %Y"];

/// Parse a date string found in page markup.
///
/// # Returns
///
/// [`ArticleDate::Parsed`] when the value carries an offset,
/// [`ArticleDate::Naive`] when it does not, and [`ArticleDate::Raw`] holding
/// `raw` unchanged when no known format matches. Never fails.
pub fn parse_date(raw: &str) -> ArticleDate {
    let s = raw.trim();
    if s.is_empty() {
        return ArticleDate::Raw(raw.to_string());
    }
    if let Some(dt) = parse_with_offset(s) {
        return ArticleDate::Parsed(dt);
    }
    match parse_naive(s) {
        Some(dt) => ArticleDate::Naive(dt),
        None => ArticleDate::Raw(raw.to_string()),
    }
}

fn parse_with_offset(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt);
    }
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
