//! Article page extraction.
//!
//! Each field is looked up through an ordered cascade of strategies (see
//! [`first_non_empty`]):
//!
//! | Field | Lookups, in order |
//! |-------|-------------------|
//! | title | `<h1>`, `<title>` |
//! | author | `meta[name=author]`, `<span>` with a class containing "author", `a[rel=author]` |
//! | date | `meta[property=article:published_time]`, `meta[name=date]`, `<time>` |
//! | category | `meta[property=article:section]`, `meta[name=category]`, first URL path segment |
//!
//! The body is every non-empty `<p>` inside the content container (an
//! `<article>`, else the first `<div>` whose class mentions article,
//! content, body or text), joined with blank lines.
//!
//! A page without a title or without body text yields no article.

use super::dates::parse_date;
use super::fallback::first_non_empty;
use crate::fetch::{FetchError, PageSource};
use crate::models::Article;
use crate::utils::truncate_for_log;
use chrono::Local;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{info, instrument, warn};
use url::Url;

const CONTAINER_CLASS_TERMS: &[&str] = &["article", "content", "body", "text"];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static H1: Lazy<Selector> = Lazy::new(|| selector("h1"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static META_AUTHOR: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="author"]"#));
static CLASSED_SPAN: Lazy<Selector> = Lazy::new(|| selector("span[class]"));
static CLASSED_DIV: Lazy<Selector> = Lazy::new(|| selector("div[class]"));
static REL_AUTHOR: Lazy<Selector> = Lazy::new(|| selector(r#"a[rel~="author"]"#));
static META_PUBLISHED: Lazy<Selector> =
    Lazy::new(|| selector(r#"meta[property="article:published_time"]"#));
static META_DATE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="date"]"#));
static TIME: Lazy<Selector> = Lazy::new(|| selector("time"));
static META_SECTION: Lazy<Selector> =
    Lazy::new(|| selector(r#"meta[property="article:section"]"#));
static META_CATEGORY: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="category"]"#));
static ARTICLE: Lazy<Selector> = Lazy::new(|| selector("article"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| selector("p"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Why an article page produced no record.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("missing title")]
    MissingTitle,

    #[error("missing body text")]
    MissingText,
}

impl ExtractError {
    /// True when the page was fetched but failed validation.
    pub fn is_validation(&self) -> bool {
        !matches!(self, ExtractError::Fetch(_))
    }
}

/// Fetch `url` and extract an [`Article`] from it.
///
/// # Arguments
///
/// * `fetcher` - Source of the page markup, normally a retrying HTTP fetcher
/// * `url` - Absolute article URL; stored verbatim in the record
///
/// # Returns
///
/// The extracted article, or an [`ExtractError`] telling a failed fetch
/// apart from a page that lacked a title or body text.
#[instrument(level = "info", skip(fetcher))]
pub async fn extract_article<F: PageSource>(
    fetcher: &F,
    url: &str,
) -> Result<Article, ExtractError> {
    let html = fetcher.fetch(url).await?;
    let result = parse_article(&html, url);
    match &result {
        Ok(article) => info!(
            title = %truncate_for_log(&article.title, 50),
            "Successfully extracted"
        ),
        Err(e) => warn!(%url, reason = %e, "Missing essential data"),
    }
    result
}

/// Extract an [`Article`] from already-fetched page markup.
///
/// Each optional field falls back independently; only a missing title or
/// missing body text rejects the page.
///
/// # Errors
///
/// [`ExtractError::MissingTitle`] or [`ExtractError::MissingText`].
pub fn parse_article(html: &str, url: &str) -> Result<Article, ExtractError> {
    let document = Html::parse_document(html);

    let title = first_non_empty(&document, &[h1_text, title_text]).unwrap_or_default();
    let text = body_text(&document);

    if title.is_empty() {
        return Err(ExtractError::MissingTitle);
    }
    if text.is_empty() {
        return Err(ExtractError::MissingText);
    }

    let author = first_non_empty(&document, &[meta_author, author_class_text, rel_author_text]);
    let date = first_non_empty(&document, &[meta_published_time, meta_date, time_element])
        .map(|raw| parse_date(&raw));
    let category = first_non_empty(&document, &[meta_section, meta_category])
        .or_else(|| category_from_url(url));

    Ok(Article {
        url: url.to_string(),
        scraped_at: Local::now(),
        title,
        text,
        date,
        author,
        category,
    })
}

/// Visible text of an element with whitespace runs collapsed.
fn normalized_text(element: ElementRef<'_>) -> String {
    let joined: String = element.text().collect();
    WHITESPACE.replace_all(joined.trim(), " ").into_owned()
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(normalized_text)
        .find(|t| !t.is_empty())
}

fn first_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
}

fn h1_text(document: &Html) -> Option<String> {
    document.select(&H1).next().map(normalized_text)
}

fn title_text(document: &Html) -> Option<String> {
    document.select(&TITLE).next().map(normalized_text)
}

fn meta_author(document: &Html) -> Option<String> {
    first_content(document, &META_AUTHOR)
}

fn author_class_text(document: &Html) -> Option<String> {
    let element = document.select(&CLASSED_SPAN).find(|el| {
        el.value()
            .classes()
            .any(|class| class.to_lowercase().contains("author"))
    })?;
    Some(normalized_text(element))
}

fn rel_author_text(document: &Html) -> Option<String> {
    first_text(document, &REL_AUTHOR)
}

fn meta_published_time(document: &Html) -> Option<String> {
    first_content(document, &META_PUBLISHED)
}

fn meta_date(document: &Html) -> Option<String> {
    first_content(document, &META_DATE)
}

fn time_element(document: &Html) -> Option<String> {
    let time = document.select(&TIME).next()?;
    [time.value().attr("datetime"), time.value().attr("content")]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| Some(normalized_text(time)))
}

fn meta_section(document: &Html) -> Option<String> {
    first_content(document, &META_SECTION)
}

fn meta_category(document: &Html) -> Option<String> {
    first_content(document, &META_CATEGORY)
}

fn category_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn content_container(document: &Html) -> Option<ElementRef<'_>> {
    document.select(&ARTICLE).next().or_else(|| {
        document.select(&CLASSED_DIV).find(|el| {
            let class = el.value().attr("class").unwrap_or_default().to_lowercase();
            CONTAINER_CLASS_TERMS.iter().any(|term| class.contains(term))
        })
    })
}

fn body_text(document: &Html) -> String {
    let Some(container) = content_container(document) else {
        return String::new();
    };
    container
        .select(&PARAGRAPH)
        .map(normalized_text)
        .filter(|p| !p.is_empty())
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleDate;
    use std::collections::HashMap;

    const URL: &str = "https://www.welt.de/politik/article1/Titel.html";

    #[test]
    fn test_minimal_article() {
        let html = "<html><body><h1>Title</h1><article><p>Hello</p><p>World</p></article></body></html>";
        let article = parse_article(html, URL).unwrap();
        assert_eq!(article.title, "Title");
        assert_eq!(article.text, "Hello\n\nWorld");
        assert_eq!(article.url, URL);
        assert_eq!(article.author, None);
        assert_eq!(article.date, None);
        assert_eq!(article.category.as_deref(), Some("politik"));
    }

    #[test]
    fn test_heading_without_paragraphs_is_rejected() {
        let html = "<h1>Title</h1><article><div>No paragraphs here</div></article>";
        assert!(matches!(
            parse_article(html, URL),
            Err(ExtractError::MissingText)
        ));
    }

    #[test]
    fn test_missing_title_is_rejected() {
        let html = "<article><p>Body only</p></article>";
        let err = parse_article(html, URL).unwrap_err();
        assert!(matches!(err, ExtractError::MissingTitle));
        assert!(err.is_validation());
    }

    #[test]
    fn test_title_falls_back_to_title_element() {
        let html = "<html><head><title> Seitentitel | WELT </title></head><body><h1>  </h1><article><p>x</p></article></body></html>";
        let article = parse_article(html, URL).unwrap();
        assert_eq!(article.title, "Seitentitel | WELT");
    }

    #[test]
    fn test_full_metadata() {
        let html = r#"<html><head>
            <meta name="author" content="Anna Beispiel">
            <meta property="article:published_time" content="2024-01-15T10:30:00+01:00">
            <meta property="article:section" content="Politik">
            </head><body>
            <h1>Koalition
               einigt sich</h1>
            <span class="Author-Name">Someone Else</span>
            <article>
              <p>  Erster <b>Absatz</b>. </p>
              <p>   </p>
              <p>Zweiter Absatz.</p>
            </article>
            </body></html>"#;
        let article = parse_article(html, URL).unwrap();
        assert_eq!(article.title, "Koalition einigt sich");
        assert_eq!(article.author.as_deref(), Some("Anna Beispiel"));
        assert_eq!(article.category.as_deref(), Some("Politik"));
        assert_eq!(article.text, "Erster Absatz.\n\nZweiter Absatz.");
        assert_eq!(article.date.unwrap().prefix(), "2024-01-15");
    }

    #[test]
    fn test_author_cascade() {
        let by_class = r#"<h1>T</h1><span class="c-Author__Name">Max Muster</span><article><p>x</p></article>"#;
        assert_eq!(
            parse_article(by_class, URL).unwrap().author.as_deref(),
            Some("Max Muster")
        );

        let by_rel = r#"<h1>T</h1><a rel="author" href="/autor/x/">Erika Muster</a><article><p>x</p></article>"#;
        assert_eq!(
            parse_article(by_rel, URL).unwrap().author.as_deref(),
            Some("Erika Muster")
        );

        let empty_meta = r#"<meta name="author" content=""><h1>T</h1><a rel="author">Erika</a><article><p>x</p></article>"#;
        assert_eq!(
            parse_article(empty_meta, URL).unwrap().author.as_deref(),
            Some("Erika")
        );
    }

    #[test]
    fn test_date_cascade_and_raw_fallback() {
        let cases: HashMap<&str, &str> = HashMap::from([
            (
                r#"<meta name="date" content="2024-02-01"><h1>T</h1><article><p>x</p></article>"#,
                "2024-02-01",
            ),
            (
                r#"<h1>T</h1><time datetime="2024-03-05T08:00:00Z">5. März</time><article><p>x</p></article>"#,
                "2024-03-05",
            ),
        ]);
        for (html, prefix) in cases {
            let article = parse_article(html, URL).unwrap();
            assert_eq!(article.date.unwrap().prefix(), prefix);
        }

        let raw = r#"<h1>T</h1><time>vor 2 Stunden</time><article><p>x</p></article>"#;
        assert_eq!(
            parse_article(raw, URL).unwrap().date,
            Some(ArticleDate::Raw("vor 2 Stunden".to_string()))
        );
    }

    #[test]
    fn test_category_meta_beats_url() {
        let html = r#"<meta name="category" content="Wirtschaft"><h1>T</h1><article><p>x</p></article>"#;
        assert_eq!(
            parse_article(html, URL).unwrap().category.as_deref(),
            Some("Wirtschaft")
        );
        assert_eq!(
            parse_article("<h1>T</h1><article><p>x</p></article>", "https://www.welt.de/")
                .unwrap()
                .category,
            None
        );
    }

    #[test]
    fn test_container_by_class_when_no_article_element() {
        let html = r#"<h1>T</h1>
            <p>outside</p>
            <div class="c-Story__Body"><p>inside one</p><p>inside two</p></div>"#;
        let article = parse_article(html, URL).unwrap();
        assert_eq!(article.text, "inside one\n\ninside two");
    }

    #[test]
    fn test_author_box_div_is_not_an_author() {
        let html = r#"<h1>T</h1>
            <div class="article-author-box"><img src="a.jpg"><p>Über die Autorin: lange Biografie</p></div>
            <a rel="author" href="/autor/erika/">Erika Muster</a>
            <article><p>x</p></article>"#;
        assert_eq!(
            parse_article(html, URL).unwrap().author.as_deref(),
            Some("Erika Muster")
        );
    }

    #[test]
    fn test_classed_span_before_body_div_is_skipped() {
        let html = r#"<h1>T</h1><span class="subtext">Kurz</span><div class="article-body"><p>Hello</p></div>"#;
        assert_eq!(parse_article(html, URL).unwrap().text, "Hello");
    }

    #[test]
    fn test_body_class_does_not_swallow_page() {
        let html = r#"<html><body class="page-body">
            <nav><p>Menu</p></nav>
            <h1>T</h1>
            <div class="article-text"><p>Hello</p></div>
            </body></html>"#;
        assert_eq!(parse_article(html, URL).unwrap().text, "Hello");
    }

    #[test]
    fn test_no_container_means_no_text() {
        let html = "<h1>T</h1><p>loose paragraph</p>";
        assert!(matches!(
            parse_article(html, URL),
            Err(ExtractError::MissingText)
        ));
    }

    struct Pages(HashMap<String, String>);

    impl PageSource for Pages {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.0
                .get(url)
                .cloned()
                .ok_or(FetchError::Status(reqwest::StatusCode::NOT_FOUND))
        }
    }

    #[tokio::test]
    async fn test_extract_article_distinguishes_fetch_failure() {
        let pages = Pages(HashMap::from([(
            URL.to_string(),
            "<h1>T</h1><article><p>x</p></article>".to_string(),
        )]));

        assert!(extract_article(&pages, URL).await.is_ok());

        let err = extract_article(&pages, "https://www.welt.de/politik/article2/Fehlt.html")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Fetch(_)));
        assert!(!err.is_validation());
    }
}
