//! SEO capture through the [`Driver`], checked against a `seo-baseline` store.

use seo_baseline::{compare_all, DriftReport, SeoRecord, SeoStore};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::driver::Driver;
use crate::locator::Locator;
use crate::Result;

pub const SITEMAP_PATH: &str = "/sitemap.xml";

/// Page URLs listed by the site's sitemap.
pub async fn sitemap_urls(config: &Config) -> Result<Vec<String>> {
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()?;
    let root = config.navigable(&config.url(SITEMAP_PATH))?;
    let urls = seo_baseline::fetch_all_page_urls(&client, &root).await?;
    info!("sitemap lists {} page(s)", urls.len());
    Ok(urls)
}

async fn first_text<D: Driver>(driver: &D, selector: &str) -> Result<String> {
    let found = driver.query(&Locator::css(selector)).await?;
    Ok(found.into_iter().next().map(|e| e.text).unwrap_or_default())
}

/// Title, meta description and first `h1` of `url`. Missing elements read as
/// empty strings.
pub async fn capture<D: Driver>(driver: &D, config: &Config, url: &str) -> Result<SeoRecord> {
    driver.goto(&config.navigable(url)?).await?;

    let title = first_text(driver, "title").await?;
    let description = driver
        .query(&Locator::css(r#"meta[name="description"]"#))
        .await?
        .into_iter()
        .next()
        .and_then(|m| m.attribute("content").map(str::to_string))
        .unwrap_or_default();
    let h1 = first_text(driver, "h1").await?;

    debug!("captured {} (title {:?})", url, title);
    Ok(SeoRecord {
        url: url.to_string(),
        title,
        description,
        h1,
    })
}

/// Capture each of `urls`; pages that fail are logged and skipped.
pub async fn capture_all<D: Driver>(
    driver: &D,
    config: &Config,
    urls: &[String],
) -> Vec<SeoRecord> {
    let mut records = Vec::with_capacity(urls.len());
    for url in urls {
        match capture(driver, config, url).await {
            Ok(record) => records.push(record),
            Err(e) => warn!("Failed to capture {}: {}", url, e),
        }
    }
    records
}

/// Replace the baseline rows of every captured page. Returns the number stored.
pub async fn refresh_baseline<D: Driver>(
    driver: &D,
    config: &Config,
    store: &SeoStore,
    urls: &[String],
) -> Result<usize> {
    let records = capture_all(driver, config, urls).await;
    for record in &records {
        store.upsert(record)?;
    }
    info!("baseline refreshed: {}/{} page(s)", records.len(), urls.len());
    Ok(records.len())
}

/// Capture `urls` and report drift against the stored baseline.
pub async fn compare_baseline<D: Driver>(
    driver: &D,
    config: &Config,
    store: &SeoStore,
    urls: &[String],
) -> Result<DriftReport> {
    let baseline = store.baseline_data()?;
    let captured = capture_all(driver, config, urls).await;
    let report = compare_all(&baseline, &captured);
    for drift in &report.drifts {
        warn!("SEO drift: {}", drift);
    }
    Ok(report)
}
