//! Sitemap discovery: `<sitemapindex>` files are followed, `<urlset>` files
//! contribute page URLs.

use std::collections::HashSet;

use regex::Regex;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Nesting limit for sitemap indexes.
pub const MAX_DEPTH: usize = 5;

/// A parsed sitemap document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sitemap {
    /// Locations of child sitemaps.
    Index(Vec<String>),
    /// Page locations.
    UrlSet(Vec<String>),
}

const LOC_PATTERN: &str = r"(?s)<loc>\s*(.*?)\s*</loc>";

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Text of a `<loc>`: CDATA is taken verbatim, anything else is unescaped.
fn loc_text(raw: &str) -> String {
    let raw = raw.trim();
    match raw
        .strip_prefix("<![CDATA[")
        .and_then(|r| r.strip_suffix("]]>"))
    {
        Some(cdata) => cdata.trim().to_string(),
        None => unescape(raw),
    }
}

/// Parse a sitemap document. `url` is only used in errors.
pub fn parse_sitemap(url: &str, xml: &str) -> Result<Sitemap> {
    let invalid = |reason: String| Error::Sitemap {
        url: url.to_string(),
        reason,
    };
    let re = Regex::new(LOC_PATTERN).map_err(|e| invalid(e.to_string()))?;
    let locs = || {
        re.captures_iter(xml)
            .map(|c| loc_text(&c[1]))
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
    };
    if xml.contains("<sitemapindex") {
        Ok(Sitemap::Index(locs()))
    } else if xml.contains("<urlset") {
        Ok(Sitemap::UrlSet(locs()))
    } else {
        Err(invalid("neither <sitemapindex> nor <urlset>".into()))
    }
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<String> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(resp.text().await?)
}

/// Every page URL reachable from `sitemap_url`, first occurrence order, without
/// duplicates. Indexes nested deeper than [`MAX_DEPTH`] are skipped.
pub async fn fetch_all_page_urls(client: &reqwest::Client, sitemap_url: &str) -> Result<Vec<String>> {
    let mut pages = Vec::new();
    let mut seen_pages = HashSet::new();
    let mut seen_maps = HashSet::new();
    // LIFO with reversed children keeps document order
    let mut stack = vec![(sitemap_url.to_string(), 0usize)];

    while let Some((url, depth)) = stack.pop() {
        if !seen_maps.insert(url.clone()) {
            continue;
        }
        if depth > MAX_DEPTH {
            warn!("sitemap nesting too deep, skipping {}", url);
            continue;
        }
        debug!("fetching sitemap {}", url);
        match parse_sitemap(&url, &fetch(client, &url).await?)? {
            Sitemap::Index(children) => {
                stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
            }
            Sitemap::UrlSet(locs) => {
                for loc in locs {
                    if seen_pages.insert(loc.clone()) {
                        pages.push(loc);
                    }
                }
            }
        }
    }
    Ok(pages)
}
