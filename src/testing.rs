//! In-memory DOM implementing [`Driver`], for page-object tests without Chrome.
//!
//! Supports the selector subset the page objects use: compound selectors
//! (`tag.class#id[attr="v"]`) joined by descendant combinators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::driver::{Driver, ElementState};
use crate::locator::{normalize_text, text_matches, Locator, LocatorStep};
use crate::scenario::ScenarioRow;
use crate::{Error, Result};

pub(crate) type Handler = Arc<dyn Fn(&mut Dom) + Send + Sync>;

/// Element builder.
pub(crate) struct El {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    visible: bool,
    enabled: bool,
    children: Vec<El>,
    frame: Option<Vec<El>>,
    on_click: Option<Handler>,
}

pub(crate) fn el(tag: &str) -> El {
    El {
        tag: tag.to_string(),
        attrs: Vec::new(),
        text: String::new(),
        visible: true,
        enabled: true,
        children: Vec::new(),
        frame: None,
        on_click: None,
    }
}

impl El {
    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn class(mut self, class: &str) -> Self {
        if let Some((_, v)) = self.attrs.iter_mut().find(|(k, _)| k == "class") {
            v.push(' ');
            v.push_str(class);
            return self;
        }
        self.attrs.push(("class".into(), class.into()));
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn child(mut self, child: El) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = El>) -> Self {
        self.children.extend(children);
        self
    }

    /// Make this element an iframe hosting `body`.
    pub fn frame(mut self, body: Vec<El>) -> Self {
        self.frame = Some(body);
        self
    }

    pub fn on_click(mut self, f: impl Fn(&mut Dom) + Send + Sync + 'static) -> Self {
        self.on_click = Some(Arc::new(f));
        self
    }
}

struct Node {
    tag: String,
    attrs: HashMap<String, String>,
    text: String,
    visible: bool,
    enabled: bool,
    parent: Option<usize>,
    children: Vec<usize>,
    /// For iframes: the hosted document node.
    frame: Option<usize>,
    /// For documents inside a frame: the iframe node.
    host: Option<usize>,
    on_click: Option<Handler>,
}

const DOCUMENT: &str = "#document";

pub(crate) struct Dom {
    nodes: Vec<Node>,
    url: String,
    redirects: HashMap<String, String>,
    visited: Vec<String>,
}

impl Dom {
    fn new(url: &str, body: Vec<El>) -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            url: url.to_string(),
            redirects: HashMap::new(),
            visited: Vec::new(),
        };
        let root = dom.document(None);
        for child in body {
            dom.insert(child, root);
        }
        dom
    }

    fn document(&mut self, host: Option<usize>) -> usize {
        self.nodes.push(Node {
            tag: DOCUMENT.into(),
            attrs: HashMap::new(),
            text: String::new(),
            visible: true,
            enabled: true,
            parent: None,
            children: Vec::new(),
            frame: None,
            host,
            on_click: None,
        });
        self.nodes.len() - 1
    }

    fn insert(&mut self, el: El, parent: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            tag: el.tag,
            attrs: el.attrs.into_iter().collect(),
            text: el.text,
            visible: el.visible,
            enabled: el.enabled,
            parent: Some(parent),
            children: Vec::new(),
            frame: None,
            host: None,
            on_click: el.on_click,
        });
        self.nodes[parent].children.push(id);
        for child in el.children {
            self.insert(child, id);
        }
        if let Some(body) = el.frame {
            let doc = self.document(Some(id));
            for child in body {
                self.insert(child, doc);
            }
            self.nodes[id].frame = Some(doc);
        }
        id
    }

    // ---------------------------------------------------------------------
    // Mutation helpers for click handlers
    // ---------------------------------------------------------------------

    /// Elements in the main document matching `selector`.
    pub fn select(&self, selector: &str) -> Vec<usize> {
        let chain = parse_selector(selector);
        self.descendants(0)
            .into_iter()
            .filter(|&n| self.matches_chain(n, &chain))
            .collect()
    }

    /// Element with `id` in any document.
    pub fn find_id(&self, id: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.attrs.get("id").map(|s| s.as_str()) == Some(id))
    }

    pub fn set_visible(&mut self, node: usize, visible: bool) {
        self.nodes[node].visible = visible;
    }

    pub fn set_enabled(&mut self, node: usize, enabled: bool) {
        self.nodes[node].enabled = enabled;
    }

    pub fn set_attr(&mut self, node: usize, name: &str, value: &str) {
        self.nodes[node].attrs.insert(name.into(), value.into());
    }

    pub fn navigate(&mut self, url: &str) {
        self.url = url.to_string();
    }

    /// The next URL read after `from` is observed reports `to`.
    pub fn redirect(&mut self, from: &str, to: &str) {
        self.redirects.insert(from.into(), to.into());
    }

    // ---------------------------------------------------------------------
    // Resolution
    // ---------------------------------------------------------------------

    fn descendants(&self, node: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[node].children.iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n].children.iter().rev());
        }
        out
    }

    fn is_visible(&self, node: usize) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            let node = &self.nodes[n];
            if !node.visible {
                return false;
            }
            cur = node.parent.or(node.host);
        }
        true
    }

    fn text_of(&self, node: usize) -> String {
        let mut parts = vec![self.nodes[node].text.clone()];
        for child in &self.nodes[node].children {
            parts.push(self.text_of(*child));
        }
        normalize_text(&parts.join(" "))
    }

    fn role_of(&self, node: usize) -> Option<String> {
        let n = &self.nodes[node];
        if let Some(role) = n.attrs.get("role") {
            return Some(role.clone());
        }
        let input_type = n.attrs.get("type").map(|s| s.as_str());
        match (n.tag.as_str(), input_type) {
            ("button", _) => Some("button".into()),
            ("input", Some("button" | "submit")) => Some("button".into()),
            ("input", Some("checkbox")) => Some("checkbox".into()),
            ("a", _) if n.attrs.contains_key("href") => Some("link".into()),
            ("h1" | "h2" | "h3" | "h4" | "h5" | "h6", _) => Some("heading".into()),
            _ => None,
        }
    }

    fn name_of(&self, node: usize) -> String {
        self.nodes[node]
            .attrs
            .get("aria-label")
            .cloned()
            .unwrap_or_else(|| self.text_of(node))
    }

    fn matches_compound(&self, node: usize, c: &Compound) -> bool {
        let n = &self.nodes[node];
        if n.tag == DOCUMENT {
            return false;
        }
        if c.tag.as_deref().is_some_and(|t| t != n.tag) {
            return false;
        }
        if c.id.is_some() && n.attrs.get("id") != c.id.as_ref() {
            return false;
        }
        let classes: Vec<&str> = n
            .attrs
            .get("class")
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default();
        if !c.classes.iter().all(|cl| classes.contains(&cl.as_str())) {
            return false;
        }
        c.attrs.iter().all(|(k, v)| match v {
            Some(v) => n.attrs.get(k) == Some(v),
            None => n.attrs.contains_key(k),
        })
    }

    fn matches_chain(&self, node: usize, chain: &[Compound]) -> bool {
        let Some((last, mut rest)) = chain.split_last() else {
            return false;
        };
        if !self.matches_compound(node, last) {
            return false;
        }
        let mut cur = self.nodes[node].parent;
        while let Some((compound, before)) = rest.split_last() {
            loop {
                let Some(p) = cur else {
                    return false;
                };
                cur = self.nodes[p].parent;
                if self.matches_compound(p, compound) {
                    break;
                }
            }
            rest = before;
        }
        true
    }

    fn resolve(&self, steps: &[LocatorStep], scopes: Vec<usize>) -> Vec<usize> {
        let mut current = scopes;
        for step in steps {
            current = match step {
                LocatorStep::Css { selector } => {
                    let chain = parse_selector(selector);
                    let mut out = Vec::new();
                    for scope in &current {
                        for n in self.descendants(*scope) {
                            if self.matches_chain(n, &chain) && !out.contains(&n) {
                                out.push(n);
                            }
                        }
                    }
                    out
                }
                LocatorStep::Visible => current
                    .into_iter()
                    .filter(|&n| self.is_visible(n))
                    .collect(),
                LocatorStep::HasText { text } => current
                    .into_iter()
                    .filter(|&n| text_matches(&self.text_of(n), text))
                    .collect(),
                LocatorStep::Has { steps } => current
                    .into_iter()
                    .filter(|&n| !self.resolve(steps, vec![n]).is_empty())
                    .collect(),
                LocatorStep::Role { role, name } => {
                    let mut out = Vec::new();
                    for scope in &current {
                        for n in self.descendants(*scope) {
                            let role_ok = self.role_of(n).as_deref() == Some(role.as_str());
                            let name_ok = name
                                .as_deref()
                                .map_or(true, |name| text_matches(&self.name_of(n), name));
                            if role_ok && name_ok && !out.contains(&n) {
                                out.push(n);
                            }
                        }
                    }
                    out
                }
                LocatorStep::Nth { index } => current.get(*index).copied().into_iter().collect(),
                LocatorStep::Frame { selector } => {
                    let chain = parse_selector(selector);
                    current
                        .iter()
                        .filter_map(|scope| {
                            self.descendants(*scope)
                                .into_iter()
                                .find(|&n| self.matches_chain(n, &chain))
                                .and_then(|n| self.nodes[n].frame)
                        })
                        .collect()
                }
            };
        }
        current
    }

    fn state(&self, node: usize) -> ElementState {
        let n = &self.nodes[node];
        ElementState {
            text: self.text_of(node),
            visible: self.is_visible(node),
            enabled: n.enabled && n.attrs.get("aria-disabled").map(|s| s.as_str()) != Some("true"),
            attributes: n.attrs.clone(),
        }
    }

    fn single(&self, locator: &Locator) -> Result<usize> {
        let found = self.resolve(locator.steps(), vec![0]);
        match found.len() {
            0 => Err(Error::NotFound(locator.to_string())),
            1 => Ok(found[0]),
            count => Err(Error::Ambiguous {
                target: locator.to_string(),
                count,
            }),
        }
    }
}

#[derive(Debug, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

/// Split on whitespace outside `[...]`.
fn parse_selector(selector: &str) -> Vec<Compound> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    for ch in selector.chars() {
        match ch {
            '[' => depth += 1,
            ']' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    parts.push(parse_compound(&current));
                    current.clear();
                }
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.is_empty() {
        parts.push(parse_compound(&current));
    }
    parts
}

fn parse_compound(s: &str) -> Compound {
    let mut c = Compound::default();
    let mut rest = s;
    let ident_end = |r: &str| r.find(['.', '#', '[']).unwrap_or(r.len());

    let end = ident_end(rest);
    if end > 0 {
        c.tag = Some(rest[..end].to_string());
    }
    rest = &rest[end..];

    while !rest.is_empty() {
        if let Some(r) = rest.strip_prefix('.') {
            let end = ident_end(r);
            c.classes.push(r[..end].to_string());
            rest = &r[end..];
        } else if let Some(r) = rest.strip_prefix('#') {
            let end = ident_end(r);
            c.id = Some(r[..end].to_string());
            rest = &r[end..];
        } else if let Some(r) = rest.strip_prefix('[') {
            let end = r.find(']').unwrap_or(r.len());
            let body = &r[..end];
            match body.split_once('=') {
                Some((k, v)) => c
                    .attrs
                    .push((k.to_string(), Some(v.trim_matches(['"', '\'']).to_string()))),
                None => c.attrs.push((body.to_string(), None)),
            }
            rest = r.get(end + 1..).unwrap_or("");
        } else {
            break;
        }
    }
    c
}

const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

/// [`Driver`] over an in-memory [`Dom`].
pub(crate) struct FakeDriver {
    dom: Mutex<Dom>,
}

impl FakeDriver {
    pub fn new(url: &str, body: Vec<El>) -> Self {
        Self {
            dom: Mutex::new(Dom::new(url, body)),
        }
    }

    pub fn with_dom<R>(&self, f: impl FnOnce(&mut Dom) -> R) -> R {
        f(&mut self.dom.lock().unwrap())
    }

    /// URLs passed to `goto`, in order.
    pub fn visited(&self) -> Vec<String> {
        self.dom.lock().unwrap().visited.clone()
    }

    /// Current URL without consuming a pending redirect.
    pub fn peek_url(&self) -> String {
        self.dom.lock().unwrap().url.clone()
    }

    /// Number of visible elements matching `locator`.
    pub fn visible_count(&self, locator: &Locator) -> usize {
        let dom = self.dom.lock().unwrap();
        dom.resolve(locator.steps(), vec![0])
            .into_iter()
            .filter(|&n| dom.is_visible(n))
            .count()
    }
}

impl Driver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut dom = self.dom.lock().unwrap();
        dom.visited.push(url.to_string());
        dom.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let mut dom = self.dom.lock().unwrap();
        let url = dom.url.clone();
        if let Some(next) = dom.redirects.remove(&url) {
            dom.url = next;
        }
        Ok(url)
    }

    async fn query(&self, locator: &Locator) -> Result<Vec<ElementState>> {
        let dom = self.dom.lock().unwrap();
        Ok(dom
            .resolve(locator.steps(), vec![0])
            .into_iter()
            .map(|n| dom.state(n))
            .collect())
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let mut dom = self.dom.lock().unwrap();
        let node = dom.single(locator)?;
        if !dom.is_visible(node) {
            return Err(Error::NotInteractable {
                target: locator.to_string(),
                reason: "not visible".into(),
            });
        }
        // a disabled control swallows the click, as in a browser
        if !dom.nodes[node].enabled {
            return Ok(());
        }
        if let Some(handler) = dom.nodes[node].on_click.clone() {
            handler(&mut dom);
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        let mut dom = self.dom.lock().unwrap();
        let node = dom.single(locator)?;
        dom.set_attr(node, "value", value);
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(FAKE_PNG.to_vec())
    }
}

// -------------------------------------------------------------------------
// Fixtures
// -------------------------------------------------------------------------

/// The pricing block as the site renders it: one tab and one panel per tab
/// label in `rows`, the first panel visible. CTA buttons redirect to the
/// register page with `product` before `plan`.
pub(crate) fn pricing_fixture(base: &str, rows: &[ScenarioRow]) -> FakeDriver {
    let mut tabs: Vec<(&str, Vec<&ScenarioRow>)> = Vec::new();
    for row in rows {
        let label = row.tab.trim();
        match tabs.iter_mut().find(|(t, _)| *t == label) {
            Some((_, cards)) => cards.push(row),
            None => tabs.push((label, vec![row])),
        }
    }

    let tab_els = tabs.iter().enumerate().map(|(i, (label, _))| {
        el("div")
            .class("tab")
            .child(el("h3").text(label))
            .on_click(move |dom| {
                for (j, panel) in dom.select("div.item-tab").into_iter().enumerate() {
                    dom.set_visible(panel, j == i);
                }
            })
    });

    let panel_els = tabs.iter().enumerate().map(|(i, (_, cards))| {
        let cards = cards.iter().map(|row| {
            let target = format!(
                "{}/auth/register?product={}&plan={}&ref=pricing",
                base, row.product, row.plan
            );
            el("div").class("redbox-container").children([
                el("div")
                    .class("redbox-container-head")
                    .child(el("h2").class("main-h2").text(row.item)),
                el("div").class("pricing-btn").child(
                    el("button")
                        .text(row.button)
                        .on_click(move |dom| dom.navigate(&target)),
                ),
                el("a").attr("href", "#plan").text("More About Plan"),
            ])
        });
        let panel = el("div").class("item-tab").children(cards);
        if i == 0 {
            panel
        } else {
            panel.hidden()
        }
    });

    FakeDriver::new(
        &format!("{}/", base),
        vec![el("div").class("pricing").children([
            el("div").class("tabs").children(tab_els),
            el("div").class("panels").children(panel_els),
        ])],
    )
}

/// The registration form. With `solvable`, clicking the challenge anchor checks
/// it and enables submit; otherwise the click is swallowed.
pub(crate) fn registration_fixture(base: &str, solvable: bool) -> FakeDriver {
    let thankyou = format!("{}/thankyou", base);
    let dashboard = format!("{}/account/dashboard", base);
    let input = |placeholder: &str| el("input").attr("placeholder", placeholder);

    FakeDriver::new(
        &format!("{}/auth/register?plan=1&product=FREE", base),
        vec![el("form").children([
            input("First Name"),
            input("Last Name"),
            input("Email Address"),
            input("Password"),
            input("Confirm Password"),
            el("label")
                .class("checkbox")
                .id("terms")
                .text("I accept the terms")
                .on_click(|dom| {
                    if let Some(n) = dom.find_id("terms") {
                        dom.set_attr(n, "data-checked", "true");
                    }
                }),
            el("label").class("checkbox").text("Send me offers"),
            el("iframe").attr("title", "reCAPTCHA").frame(vec![el("span")
                .id("recaptcha-anchor")
                .attr("role", "checkbox")
                .attr("aria-checked", "false")
                .on_click(move |dom| {
                    if !solvable {
                        return;
                    }
                    if let Some(n) = dom.find_id("recaptcha-anchor") {
                        dom.set_attr(n, "aria-checked", "true");
                    }
                    if let Some(n) = dom.find_id("get-started") {
                        dom.set_enabled(n, true);
                    }
                })]),
            el("button")
                .id("get-started")
                .text("Get Started")
                .disabled()
                .on_click(move |dom| {
                    dom.navigate(&thankyou);
                    dom.redirect(&thankyou, &dashboard);
                }),
        ])],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parsing() {
        let chain = parse_selector(r#"div.tabs .tab input[placeholder="First Name"]"#);
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].tag.as_deref(), Some("div"));
        assert_eq!(chain[0].classes, vec!["tabs"]);
        assert_eq!(chain[1].tag, None);
        assert_eq!(chain[2].attrs[0].1.as_deref(), Some("First Name"));
    }

    #[tokio::test]
    async fn test_scoped_css_only_matches_descendants() {
        let driver = FakeDriver::new(
            "https://shop.test/",
            vec![
                el("div").class("a").child(el("span").text("inside")),
                el("span").text("outside"),
            ],
        );
        let found = driver
            .query(&Locator::css("div.a").locator("span"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "inside");
    }

    #[tokio::test]
    async fn test_frame_hop() {
        let driver = registration_fixture("https://shop.test", true);
        let anchor = Locator::frame(r#"iframe[title="reCAPTCHA"]"#).locator("#recaptcha-anchor");
        let found = driver.query(&anchor).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].attribute("aria-checked"), Some("false"));
        // not reachable without entering the frame
        assert!(driver
            .query(&Locator::css("#recaptcha-anchor"))
            .await
            .unwrap()
            .is_empty());
    }
}
