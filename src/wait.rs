//! Bounded polling waits.
//!
//! Every suspension point in a flow goes through [`poll_until`]: probe the live
//! page, sleep `poll_interval`, give up at `timeout`. No fixed sleeps.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use regex::Regex;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::driver::{Driver, ElementState};
use crate::locator::Locator;
use crate::{Error, Result};

/// Default budget for element expectations.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
/// Default delay between probes.
pub const DEFAULT_POLL_MS: u64 = 100;

/// Timeout budget for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitPolicy {
    pub fn new(timeout_ms: u64, poll_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(poll_ms.max(1)),
        }
    }

    /// Same poll interval, different budget.
    pub fn with_timeout(&self, timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: self.poll_interval,
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS, DEFAULT_POLL_MS)
    }
}

/// What a wait was waiting on. Carried by [`Error::Timeout`].
#[derive(Debug, Clone, PartialEq)]
pub enum WaitCondition {
    Actionable(String),
    Visible(String),
    Attribute {
        target: String,
        name: String,
        value: String,
    },
    Enabled(String),
    Url(String),
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitCondition::Actionable(t) => write!(f, "{} to be actionable", t),
            WaitCondition::Visible(t) => write!(f, "{} to be visible", t),
            WaitCondition::Attribute {
                target,
                name,
                value,
            } => write!(f, "{} to have {}=\"{}\"", target, name, value),
            WaitCondition::Enabled(t) => write!(f, "{} to be enabled", t),
            WaitCondition::Url(p) => write!(f, "url to match '{}'", p),
        }
    }
}

/// Outcome of a single probe.
pub enum Probe<T> {
    /// Condition holds.
    Ready(T),
    /// Not yet; a timeout reports the wait condition.
    Pending,
    /// Not yet; if still failing at the deadline, this error is reported instead.
    Failing(Error),
}

/// Probe until ready or `policy.timeout` elapses. Errors returned by the probe
/// itself abort immediately.
pub async fn poll_until<T, F, Fut>(
    condition: WaitCondition,
    policy: &WaitPolicy,
    mut probe: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>>>,
{
    let start = Instant::now();
    loop {
        let failing = match probe().await? {
            Probe::Ready(value) => return Ok(value),
            Probe::Pending => None,
            Probe::Failing(e) => Some(e),
        };
        let elapsed = start.elapsed();
        if elapsed >= policy.timeout {
            debug!("wait expired: {}", condition);
            return Err(failing.unwrap_or(Error::Timeout {
                condition,
                after_ms: policy.timeout_ms(),
            }));
        }
        sleep(policy.poll_interval.min(policy.timeout - elapsed)).await;
    }
}

/// Exactly one match, or the reason why not.
fn single(locator: &Locator, mut found: Vec<ElementState>) -> Result<ElementState> {
    match found.len() {
        0 => Err(Error::NotFound(locator.to_string())),
        1 => Ok(found.remove(0)),
        count => Err(Error::Ambiguous {
            target: locator.to_string(),
            count,
        }),
    }
}

/// Wait until `locator` resolves to one visible, enabled element. Several matches
/// fail at once with [`Error::Ambiguous`].
pub async fn for_actionable<D: Driver>(
    driver: &D,
    locator: &Locator,
    policy: &WaitPolicy,
) -> Result<()> {
    let condition = WaitCondition::Actionable(locator.to_string());
    poll_until(condition, policy, || async move {
        let el = match single(locator, driver.query(locator).await?) {
            Ok(el) => el,
            // more than one match will not resolve itself
            Err(e @ Error::Ambiguous { .. }) => return Err(e),
            Err(e) => return Ok(Probe::Failing(e)),
        };
        if el.is_actionable() {
            return Ok(Probe::Ready(()));
        }
        let reason = if !el.visible { "not visible" } else { "disabled" };
        Ok(Probe::Failing(Error::NotInteractable {
            target: locator.to_string(),
            reason: reason.into(),
        }))
    })
    .await
}

/// Wait until `locator` resolves to one visible element.
pub async fn for_visible<D: Driver>(
    driver: &D,
    locator: &Locator,
    policy: &WaitPolicy,
) -> Result<ElementState> {
    let condition = WaitCondition::Visible(locator.to_string());
    poll_until(condition, policy, || async move {
        let found = driver.query(locator).await?;
        if found.len() > 1 {
            return Ok(Probe::Failing(Error::Ambiguous {
                target: locator.to_string(),
                count: found.len(),
            }));
        }
        Ok(match found.into_iter().next() {
            Some(el) if el.visible => Probe::Ready(el),
            _ => Probe::Pending,
        })
    })
    .await
}

/// Wait until the single element matched by `locator` has `name="value"`.
pub async fn for_attribute<D: Driver>(
    driver: &D,
    locator: &Locator,
    name: &str,
    value: &str,
    policy: &WaitPolicy,
) -> Result<()> {
    let condition = WaitCondition::Attribute {
        target: locator.to_string(),
        name: name.into(),
        value: value.into(),
    };
    poll_until(condition, policy, || async move {
        let found = driver.query(locator).await?;
        if found.len() > 1 {
            return Ok(Probe::Failing(Error::Ambiguous {
                target: locator.to_string(),
                count: found.len(),
            }));
        }
        Ok(match found.first() {
            Some(el) if el.attribute(name) == Some(value) => Probe::Ready(()),
            _ => Probe::Pending,
        })
    })
    .await
}

/// Wait until the single element matched by `locator` is enabled.
pub async fn for_enabled<D: Driver>(
    driver: &D,
    locator: &Locator,
    policy: &WaitPolicy,
) -> Result<()> {
    let condition = WaitCondition::Enabled(locator.to_string());
    poll_until(condition, policy, || async move {
        let found = driver.query(locator).await?;
        if found.len() > 1 {
            return Ok(Probe::Failing(Error::Ambiguous {
                target: locator.to_string(),
                count: found.len(),
            }));
        }
        Ok(match found.first() {
            Some(el) if el.enabled => Probe::Ready(()),
            _ => Probe::Pending,
        })
    })
    .await
}

/// Wait until the page URL matches `pattern`; returns the matching URL.
pub async fn for_url<D: Driver>(
    driver: &D,
    pattern: &UrlPattern,
    policy: &WaitPolicy,
) -> Result<String> {
    let condition = WaitCondition::Url(pattern.to_string());
    poll_until(condition, policy, || async move {
        let url = driver.current_url().await?;
        Ok(if pattern.matches(&url) {
            Probe::Ready(url)
        } else {
            Probe::Pending
        })
    })
    .await
}

/// A URL expectation: exact string, or a glob where `**` spans `/` and `*`
/// does not.
#[derive(Debug, Clone)]
pub enum UrlPattern {
    Exact(String),
    Glob { source: String, regex: Regex },
}

impl UrlPattern {
    pub fn exact(url: impl Into<String>) -> Self {
        UrlPattern::Exact(url.into())
    }

    pub fn glob(pattern: &str) -> Result<Self> {
        let mut re = String::from("^");
        let mut rest = pattern;
        while !rest.is_empty() {
            if let Some(r) = rest.strip_prefix("**") {
                re.push_str(".*");
                rest = r;
            } else if let Some(r) = rest.strip_prefix('*') {
                re.push_str("[^/]*");
                rest = r;
            } else {
                let end = rest.find('*').unwrap_or(rest.len());
                re.push_str(&regex::escape(&rest[..end]));
                rest = &rest[end..];
            }
        }
        re.push('$');
        let regex = Regex::new(&re)
            .map_err(|e| Error::Config(format!("invalid url glob '{}': {}", pattern, e)))?;
        Ok(UrlPattern::Glob {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, url: &str) -> bool {
        match self {
            UrlPattern::Exact(expected) => url == expected,
            UrlPattern::Glob { regex, .. } => regex.is_match(url),
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlPattern::Exact(u) => f.write_str(u),
            UrlPattern::Glob { source, .. } => f.write_str(source),
        }
    }
}
