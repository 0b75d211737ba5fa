//! # seo-baseline
//!
//! Collects the page URLs of a site from its sitemap and keeps a SQLite
//! baseline of each page's title, meta description and first `h1`, so later
//! captures can be checked for drift.
//!
//! ```rust,no_run
//! use seo_baseline::{fetch_all_page_urls, SeoStore};
//!
//! # async fn run() -> seo_baseline::Result<()> {
//! let store = SeoStore::open("seo.db")?;
//! let client = reqwest::Client::new();
//! let urls = fetch_all_page_urls(&client, "https://example.com/sitemap.xml").await?;
//! let baseline = store.baseline_data()?;
//! println!("{} pages, {} in baseline", urls.len(), baseline.len());
//! # Ok(())
//! # }
//! ```

mod diff;
mod sitemap;
mod store;

pub use diff::{compare, compare_all, DriftReport, FieldDrift, SeoField};
pub use sitemap::{fetch_all_page_urls, parse_sitemap, Sitemap, MAX_DEPTH};
pub use store::{init_db, SeoStore};

use serde::{Deserialize, Serialize};

/// Result type for seo-baseline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from sitemap fetching and the baseline store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid sitemap {url}: {reason}")]
    Sitemap { url: String, reason: String },
}

/// SEO fields of one page, keyed by URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub h1: String,
}
