//! Lazy element locators and the single `act` dispatch.
//!
//! A [`Locator`] describes *how* to find elements (a chain of CSS scoping,
//! filters, role lookups and frame hops), never a fixed result. The same chain
//! is evaluated by the browser-side resolver and by the test DOM.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::driver::Driver;
use crate::wait::{self, WaitPolicy};
use crate::Result;

/// One step of a locator chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocatorStep {
    /// Descendants of the current scope matching a CSS selector.
    Css { selector: String },
    /// Keep only rendered elements.
    Visible,
    /// Keep elements whose text contains `text` (normalized, case-insensitive).
    HasText { text: String },
    /// Keep elements that contain at least one match of the nested chain.
    Has { steps: Vec<LocatorStep> },
    /// Descendants with an ARIA role and, optionally, an accessible name.
    Role { role: String, name: Option<String> },
    /// Keep the n-th match only.
    Nth { index: usize },
    /// Continue inside the document of the first matching iframe.
    Frame { selector: String },
}

impl fmt::Display for LocatorStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorStep::Css { selector } => write!(f, "css={}", selector),
            LocatorStep::Visible => f.write_str("visible"),
            LocatorStep::HasText { text } => write!(f, "text={:?}", text.trim()),
            LocatorStep::Has { steps } => {
                f.write_str("has(")?;
                write_chain(f, steps)?;
                f.write_str(")")
            }
            LocatorStep::Role { role, name: None } => write!(f, "role={}", role),
            LocatorStep::Role {
                role,
                name: Some(n),
            } => write!(f, "role={}[name={:?}]", role, n),
            LocatorStep::Nth { index } => write!(f, "nth={}", index),
            LocatorStep::Frame { selector } => write!(f, "frame={}", selector),
        }
    }
}

fn write_chain(f: &mut fmt::Formatter<'_>, steps: &[LocatorStep]) -> fmt::Result {
    for (i, step) in steps.iter().enumerate() {
        if i > 0 {
            f.write_str(" >> ")?;
        }
        write!(f, "{}", step)?;
    }
    Ok(())
}

/// A lazy, composable element reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Locator {
    steps: Vec<LocatorStep>,
}

impl Locator {
    /// Elements matching `selector` anywhere in the page document.
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            steps: vec![LocatorStep::Css {
                selector: selector.into(),
            }],
        }
    }

    /// Start inside the first iframe matching `selector`.
    pub fn frame(selector: impl Into<String>) -> Self {
        Self {
            steps: vec![LocatorStep::Frame {
                selector: selector.into(),
            }],
        }
    }

    /// Elements with ARIA `role` anywhere in the page document.
    pub fn role(role: impl Into<String>, name: Option<&str>) -> Self {
        Self::default().get_by_role(role, name)
    }

    fn with(&self, step: LocatorStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    /// Descendants of this locator's matches.
    pub fn locator(&self, selector: impl Into<String>) -> Self {
        self.with(LocatorStep::Css {
            selector: selector.into(),
        })
    }

    /// Only rendered matches.
    pub fn visible(&self) -> Self {
        self.with(LocatorStep::Visible)
    }

    /// Only matches whose text contains `text`.
    pub fn has_text(&self, text: impl Into<String>) -> Self {
        self.with(LocatorStep::HasText { text: text.into() })
    }

    /// Only matches containing an element matched by `inner`, resolved relative
    /// to each candidate.
    pub fn filter_has(&self, inner: &Locator) -> Self {
        self.with(LocatorStep::Has {
            steps: inner.steps.clone(),
        })
    }

    /// Descendants with ARIA `role` whose accessible name contains `name`.
    pub fn get_by_role(&self, role: impl Into<String>, name: Option<&str>) -> Self {
        self.with(LocatorStep::Role {
            role: role.into(),
            name: name.map(str::to_string),
        })
    }

    /// The `index`-th match.
    pub fn nth(&self, index: usize) -> Self {
        self.with(LocatorStep::Nth { index })
    }

    pub fn first(&self) -> Self {
        self.nth(0)
    }

    /// Continue inside the first iframe under this locator's matches.
    pub fn frame_locator(&self, selector: impl Into<String>) -> Self {
        self.with(LocatorStep::Frame {
            selector: selector.into(),
        })
    }

    pub fn steps(&self) -> &[LocatorStep] {
        &self.steps
    }

    /// JSON form consumed by the browser-side resolver.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.steps)?)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_chain(f, &self.steps)
    }
}

/// Collapse runs of whitespace and trim.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text filter semantics shared by `HasText` and role names: normalized,
/// case-insensitive containment.
pub fn text_matches(haystack: &str, needle: &str) -> bool {
    let needle = normalize_text(needle).to_lowercase();
    normalize_text(haystack).to_lowercase().contains(&needle)
}

/// What to act on: a raw selector resolved against the page, or a locator that
/// is already scoped.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Raw(String),
    Resolved(Locator),
}

impl Target {
    /// The locator this target stands for.
    pub fn resolve(&self) -> Cow<'_, Locator> {
        match self {
            Target::Raw(selector) => Cow::Owned(Locator::css(selector.as_str())),
            Target::Resolved(locator) => Cow::Borrowed(locator),
        }
    }
}

impl From<&str> for Target {
    fn from(s: &str) -> Self {
        Target::Raw(s.to_string())
    }
}

impl From<String> for Target {
    fn from(s: String) -> Self {
        Target::Raw(s)
    }
}

impl From<Locator> for Target {
    fn from(l: Locator) -> Self {
        Target::Resolved(l)
    }
}

impl From<&Locator> for Target {
    fn from(l: &Locator) -> Self {
        Target::Resolved(l.clone())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Raw(s) => write!(f, "selector '{}'", s),
            Target::Resolved(l) => write!(f, "{}", l),
        }
    }
}

/// A user interaction.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    Click,
    Fill(&'a str),
}

/// Wait until `target` resolves to exactly one visible, enabled element, then
/// perform `op` on it.
pub async fn act<D: Driver>(
    driver: &D,
    target: &Target,
    op: Operation<'_>,
    policy: &WaitPolicy,
) -> Result<()> {
    let locator = target.resolve();
    wait::for_actionable(driver, &locator, policy).await?;
    match op {
        Operation::Click => {
            debug!("click: {}", locator);
            driver.click(&locator).await
        }
        Operation::Fill(value) => {
            debug!("fill: {} ({} chars)", locator, value.len());
            driver.fill(&locator, value).await
        }
    }
}
