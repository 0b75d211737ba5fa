//! The pricing redirect matrix and the flows each case runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::sleep;
use tracing::info;
use url::Url;

use crate::config::Config;
use crate::driver::Driver;
use crate::pages::{HomePage, PricingPage, RegistrationForm, RegistrationPage};
use crate::wait::{self, UrlPattern};
use crate::{Error, Result, Step, StepExt};

/// Where a CTA is expected to land.
pub const REGISTER_PATH: &str = "/auth/register";
const REGISTER_GLOB: &str = "**/auth/register**";
/// Entry URL of the registration smoke case.
pub const REGISTER_ENTRY: &str = "/auth/register?plan=1&product=FREE";
pub const THANKYOU_PATH: &str = "/thankyou";
pub const DASHBOARD_PATH: &str = "/account/dashboard";
/// Case id of the registration smoke case.
pub const REGISTRATION_CASE: &str = "test_user_can_register";

/// One pricing card and the codes its CTA must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScenarioRow {
    /// Tab label as rendered, possibly with trailing whitespace.
    pub tab: &'static str,
    /// Card title.
    pub item: &'static str,
    /// CTA label.
    pub button: &'static str,
    pub plan: &'static str,
    pub product: &'static str,
}

impl ScenarioRow {
    pub const fn new(
        tab: &'static str,
        item: &'static str,
        button: &'static str,
        plan: &'static str,
        product: &'static str,
    ) -> Self {
        Self {
            tab,
            item,
            button,
            plan,
            product,
        }
    }
}

#[rustfmt::skip]
pub const PRICING_CASES: &[ScenarioRow] = &[
    // dating
    ScenarioRow::new("DATING/ALTERNATIVE ",    "FREE SCAN",       "SEARCH NOW", "1",  "FREE"),
    ScenarioRow::new("DATING/ALTERNATIVE ",    "FLEX PACKAGE",    "BUY NOW",    "5",  "DS"),
    ScenarioRow::new("DATING/ALTERNATIVE ",    "MONTHLY",         "BUY NOW",    "11", "DS"),
    ScenarioRow::new("DATING/ALTERNATIVE ",    "ULTIMATE",        "BUY NOW",    "26", "DS"),
    // social
    ScenarioRow::new("SOCIAL MEDIA & MOBILE ", "FREE SCAN",       "SEARCH NOW", "1",  "FREE"),
    ScenarioRow::new("SOCIAL MEDIA & MOBILE ", "FLEX PACKAGE",    "BUY NOW",    "5",  "SM"),
    ScenarioRow::new("SOCIAL MEDIA & MOBILE ", "MONTHLY",         "BUY NOW",    "11", "SM"),
    ScenarioRow::new("SOCIAL MEDIA & MOBILE ", "ULTIMATE",        "BUY NOW",    "26", "SM"),
    // listing locator
    ScenarioRow::new("LISTING LOCATOR",        "LISTING LOCATOR", "BUY NOW",    "8",  "LL"),
    ScenarioRow::new("LISTING LOCATOR",        "ULTIMATE",        "BUY NOW",    "26", "LL"),
    // cams
    ScenarioRow::new("LIVE ADULT STREAMS",     "XXX FLEX",        "BUY NOW",    "17", "LC"),
    ScenarioRow::new("LIVE ADULT STREAMS",     "XXX MONTHLY",     "BUY NOW",    "20", "LC"),
    ScenarioRow::new("LIVE ADULT STREAMS",     "ULTIMATE",        "BUY NOW",    "26", "LC"),
    // xxx
    ScenarioRow::new("XXX WEBSITES",           "XXX FLEX",        "BUY NOW",    "17", "XS"),
    ScenarioRow::new("XXX WEBSITES",           "XXX MONTHLY",     "BUY NOW",    "20", "XS"),
    ScenarioRow::new("XXX WEBSITES",           "ULTIMATE",        "BUY NOW",    "26", "XS"),
    // tinder
    ScenarioRow::new("TINDER BLASTER",         "TINDER BLASTER",  "BUY NOW",    "2",  "TN"),
    ScenarioRow::new("TINDER BLASTER",         "ULTIMATE",        "BUY NOW",    "26", "TN"),
];

/// Page a pricing case starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPoint {
    Home,
    PricingPage,
}

impl EntryPoint {
    pub const ALL: [EntryPoint; 2] = [EntryPoint::Home, EntryPoint::PricingPage];

    pub fn path(&self) -> &'static str {
        match self {
            EntryPoint::Home => "/",
            EntryPoint::PricingPage => "/products-services/",
        }
    }

    /// Name of the parametrized test this entry point belongs to.
    pub fn test_name(&self) -> &'static str {
        match self {
            EntryPoint::Home => "test_pricing_redirect_home_page",
            EntryPoint::PricingPage => "test_pricing_redirect_pricing_page",
        }
    }
}

/// One row through one entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioCase<'a> {
    pub entry: EntryPoint,
    pub row: &'a ScenarioRow,
}

impl ScenarioCase<'_> {
    /// Stable identifier: test name plus the full row.
    pub fn id(&self) -> String {
        let r = self.row;
        format!(
            "{}[{}-{}-{}-{}-{}]",
            self.entry.test_name(),
            r.tab.trim(),
            r.item,
            r.button,
            r.plan,
            r.product
        )
    }

    pub fn start_url(&self, config: &Config) -> String {
        config.url(self.entry.path())
    }
}

/// Every row through every entry point, grouped by entry point.
pub fn matrix(rows: &[ScenarioRow]) -> Vec<ScenarioCase<'_>> {
    EntryPoint::ALL
        .iter()
        .flat_map(|&entry| rows.iter().map(move |row| ScenarioCase { entry, row }))
        .collect()
}

/// The URL observed after a CTA click, with its query pairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationOutcome {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl NavigationOutcome {
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| Error::AssertionFailed(format!("unparseable url '{}': {}", url, e)))?;
        Ok(Self {
            url: url.to_string(),
            query: parsed.query_pairs().into_owned().collect(),
        })
    }

    /// First value of query parameter `key`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// At `<base>/auth/register` (same origin, optional trailing `/`) with
    /// exactly the expected codes.
    pub fn assert_redirect(&self, base_url: &str, plan: &str, product: &str) -> Result<()> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("base url '{}': {}", base_url, e)))?;
        let actual = Url::parse(&self.url)
            .map_err(|e| Error::AssertionFailed(format!("unparseable url '{}': {}", self.url, e)))?;
        let expected_path = format!("{}{}", base.path().trim_end_matches('/'), REGISTER_PATH);
        let path = actual.path();
        if actual.origin() != base.origin() || path.strip_suffix('/').unwrap_or(path) != expected_path {
            return Err(Error::AssertionFailed(format!(
                "expected {}{}, got {}",
                base_url.trim_end_matches('/'),
                REGISTER_PATH,
                self.url
            )));
        }
        for (key, expected) in [("plan", plan), ("product", product)] {
            match self.param(key) {
                Some(v) if v == expected => {}
                Some(v) => {
                    return Err(Error::AssertionFailed(format!(
                        "{}={} in {}, expected {}",
                        key, v, self.url, expected
                    )))
                }
                None => {
                    return Err(Error::AssertionFailed(format!(
                        "{} missing from {}, expected {}",
                        key, self.url, expected
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Open the row's plan from the entry page and check the register redirect.
pub async fn run_pricing_case<D: Driver>(
    driver: &D,
    config: &Config,
    case: &ScenarioCase<'_>,
) -> Result<NavigationOutcome> {
    let row = case.row;
    let start = config.navigable(&case.start_url(config))?;
    driver.goto(&start).await.at_step(Step::Navigate)?;

    let policy = config.timeouts.expect();
    match case.entry {
        EntryPoint::Home => {
            HomePage::new(driver, policy)
                .open_plan(row.tab, row.item, row.button)
                .await?
        }
        EntryPoint::PricingPage => {
            PricingPage::new(driver, policy)
                .open_plan(row.tab, row.item, row.button)
                .await?
        }
    }

    let pattern = UrlPattern::glob(REGISTER_GLOB)?;
    let url = wait::for_url(driver, &pattern, &config.timeouts.navigation())
        .await
        .at_step(Step::UrlWait)?;
    info!("redirected to {}", url);

    let outcome = NavigationOutcome::parse(&url).at_step(Step::UrlAssertion)?;
    outcome
        .assert_redirect(&config.base_url, row.plan, row.product)
        .at_step(Step::UrlAssertion)?;

    let settle = config.timeouts.settle();
    if !settle.is_zero() {
        sleep(settle).await;
    }
    Ok(outcome)
}

/// Register a fresh account and follow the post-signup redirects.
pub async fn run_registration<D: Driver>(
    driver: &D,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<()> {
    let form = RegistrationForm::for_user(&config.user, now)?;
    let start = config.navigable(&config.url(REGISTER_ENTRY))?;
    driver.goto(&start).await.at_step(Step::Navigate)?;

    RegistrationPage::new(driver, &config.timeouts)
        .register(&form)
        .await?;

    let nav = config.timeouts.navigation();
    for path in [THANKYOU_PATH, DASHBOARD_PATH] {
        let expected = UrlPattern::exact(config.url(path));
        wait::for_url(driver, &expected, &nav)
            .await
            .at_step(Step::UrlWait)?;
        info!("reached {}", path);
    }
    Ok(())
}
