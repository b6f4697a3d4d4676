//! Output generation for scraped articles.
//!
//! - [`json`]: per-article JSON files plus the combined array for the run
//!
//! Output files are written only from here; nothing reads them back. Files
//! left by earlier runs are never consulted for deduplication.

pub mod json;
