//! Page parsing for the publisher's site.
//!
//! Scraping follows the same two-phase pattern for every category:
//!
//! 1. **Indexing**: find candidate article URLs on a category page ([`links`])
//! 2. **Extraction**: fetch each article and pull out its fields ([`article`])
//!
//! Supporting modules:
//! - [`fallback`]: first-non-empty cascade used for every field lookup
//! - [`dates`]: permissive date parsing that keeps unparseable input verbatim

pub mod article;
pub mod dates;
pub mod fallback;
pub mod links;
