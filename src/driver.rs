//! The browser automation boundary.
//!
//! Everything above this trait (locators, waits, page objects) is written against
//! [`Driver`]; `eoka::Page` implements it in `browser.rs`.

use std::collections::HashMap;

use serde::Deserialize;

use crate::locator::Locator;
use crate::Result;

/// Snapshot of one element matched by a [`Locator`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ElementState {
    /// Rendered text, whitespace-normalized.
    pub text: String,
    /// Has a non-empty box and is not `visibility: hidden` / `display: none`.
    pub visible: bool,
    /// Not `disabled` and not `aria-disabled="true"`.
    pub enabled: bool,
    /// All DOM attributes of the element.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl ElementState {
    /// Attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// Visible and enabled.
    pub fn is_actionable(&self) -> bool {
        self.visible && self.enabled
    }
}

/// Capability set the suite needs from a browser page.
///
/// Locators are lazy: every call re-resolves against the live document.
/// `click` and `fill` act on the single element the locator currently matches;
/// callers go through [`crate::act`] which waits for that to hold.
#[allow(async_fn_in_trait)]
pub trait Driver {
    /// Navigate the page to `url`.
    async fn goto(&self, url: &str) -> Result<()>;

    /// The URL currently shown by the page.
    async fn current_url(&self) -> Result<String>;

    /// Resolve `locator` and snapshot every match, in document order.
    async fn query(&self, locator: &Locator) -> Result<Vec<ElementState>>;

    /// Click the element `locator` resolves to.
    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Replace the value of the input `locator` resolves to.
    async fn fill(&self, locator: &Locator, value: &str) -> Result<()>;

    /// PNG screenshot of the page.
    async fn screenshot(&self) -> Result<Vec<u8>>;
}
