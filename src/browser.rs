//! [`Driver`] for `eoka::Page`: locators are resolved by an injected script at
//! action time.

use std::sync::atomic::{AtomicU64, Ordering};

use eoka::Page;
use serde::Deserialize;
use tracing::trace;

use crate::driver::{Driver, ElementState};
use crate::locator::Locator;
use crate::{Error, Result};

/// Evaluates a serialized locator chain against the live document.
///
/// Ops: `query` snapshots every match; `mark` tags a single top-document match
/// with `data-e2e-target` so CDP input can address it by selector; `click` and
/// `fill` act in-script for matches inside frames. `query` and `mark` also
/// report the first frame that was found but could not be entered.
const RESOLVE_JS: &str = r#"
((steps, op, token, value) => {
    const norm = s => (s || '').replace(/\s+/g, ' ').trim();
    const contains = (h, n) => norm(h).toLowerCase().includes(norm(n).toLowerCase());
    const uniq = a => [...new Set(a)];
    const blocked = [];

    function visible(el) {
        if (!el.isConnected) return false;
        const r = el.getBoundingClientRect();
        const s = el.ownerDocument.defaultView.getComputedStyle(el);
        if (r.width === 0 && r.height === 0) return false;
        if (s.visibility === 'hidden' || s.display === 'none') return false;
        const host = el.ownerDocument.defaultView.frameElement;
        return host ? visible(host) : true;
    }

    function role(el) {
        const explicit = el.getAttribute('role');
        if (explicit) return explicit;
        const tag = el.tagName.toLowerCase();
        const type = (el.getAttribute('type') || '').toLowerCase();
        if (tag === 'button') return 'button';
        if (tag === 'input' && (type === 'button' || type === 'submit')) return 'button';
        if (tag === 'input' && type === 'checkbox') return 'checkbox';
        if (tag === 'a' && el.hasAttribute('href')) return 'link';
        if (/^h[1-6]$/.test(tag)) return 'heading';
        return null;
    }

    const name = el => el.getAttribute('aria-label') || el.innerText || el.textContent || el.value || '';

    function resolve(steps, scopes) {
        let cur = scopes;
        for (const s of steps) {
            switch (s.kind) {
                case 'css':
                    cur = uniq(cur.flatMap(sc => [...sc.querySelectorAll(s.selector)]));
                    break;
                case 'visible':
                    cur = cur.filter(visible);
                    break;
                case 'has_text':
                    cur = cur.filter(e => contains(e.innerText ?? e.textContent, s.text));
                    break;
                case 'has':
                    cur = cur.filter(e => resolve(s.steps, [e]).length > 0);
                    break;
                case 'role':
                    cur = uniq(cur.flatMap(sc => [...sc.querySelectorAll('*')].filter(e =>
                        role(e) === s.role && (s.name == null || contains(name(e), s.name)))));
                    break;
                case 'nth':
                    cur = cur[s.index] ? [cur[s.index]] : [];
                    break;
                case 'frame':
                    cur = cur.flatMap(sc => {
                        const f = sc.querySelector(s.selector);
                        if (!f) return [];
                        let doc = null;
                        try {
                            doc = f.contentDocument;
                        } catch (_) {}
                        if (!doc) {
                            blocked.push(s.selector);
                            return [];
                        }
                        return [doc];
                    });
                    break;
            }
        }
        return cur;
    }

    const found = resolve(steps, [document]);
    const attrs = el => Object.fromEntries([...el.attributes].map(a => [a.name, a.value]));

    switch (op) {
        case 'query':
            return {
                found: found.map(el => ({
                    text: norm(el.innerText ?? el.textContent),
                    visible: visible(el),
                    enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
                    attributes: attrs(el),
                })),
                blocked: blocked[0] ?? null,
            };
        case 'mark': {
            if (found.length !== 1) return { count: found.length, top: false, blocked: blocked[0] ?? null };
            const top = found[0].ownerDocument === document;
            if (top) found[0].setAttribute('data-e2e-target', token);
            return { count: 1, top, blocked: null };
        }
        case 'click':
            if (found.length === 1) found[0].click();
            return found.length;
        case 'fill':
            if (found.length === 1) {
                const el = found[0];
                el.focus();
                el.value = value;
                el.dispatchEvent(new Event('input', { bubbles: true }));
                el.dispatchEvent(new Event('change', { bubbles: true }));
            }
            return found.length;
    }
    return null;
})
"#;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Deserialize)]
struct Snapshot {
    found: Vec<ElementState>,
    blocked: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Marked {
    count: usize,
    top: bool,
    blocked: Option<String>,
}

/// No match because a frame on the path is cross-origin. Waiting will not
/// change that, so it is raised instead of read as "not rendered yet".
fn check_frames(locator: &Locator, count: usize, blocked: Option<&str>) -> Result<()> {
    match blocked {
        Some(frame) if count == 0 => Err(Error::NotInteractable {
            target: locator.to_string(),
            reason: format!("cross-origin frame {}", frame),
        }),
        _ => Ok(()),
    }
}

fn script(locator: &Locator, op: &str, token: &str, value: &str) -> Result<String> {
    Ok(format!(
        "{}({},{},{},{})",
        RESOLVE_JS,
        locator.to_json()?,
        serde_json::to_string(op)?,
        serde_json::to_string(token)?,
        serde_json::to_string(value)?
    ))
}

fn exactly_one(locator: &Locator, count: usize) -> Result<()> {
    match count {
        1 => Ok(()),
        0 => Err(Error::NotFound(locator.to_string())),
        count => Err(Error::Ambiguous {
            target: locator.to_string(),
            count,
        }),
    }
}

/// How an action reaches its element.
enum Handle {
    /// Top-document element, addressable by this selector.
    Selector(String),
    /// Element inside a frame; act in-script.
    InFrame,
}

async fn mark(page: &Page, locator: &Locator) -> Result<Handle> {
    let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed).to_string();
    let marked: Marked = page.evaluate(&script(locator, "mark", &token, "")?).await?;
    check_frames(locator, marked.count, marked.blocked.as_deref())?;
    exactly_one(locator, marked.count)?;
    Ok(if marked.top {
        Handle::Selector(format!("[data-e2e-target=\"{}\"]", token))
    } else {
        Handle::InFrame
    })
}

async fn unmark(page: &Page, selector: &str) {
    let js = format!(
        "document.querySelector({})?.removeAttribute('data-e2e-target')",
        serde_json::to_string(selector).unwrap_or_default()
    );
    // the click may have navigated away
    let _ = page.execute(&js).await;
}

/// Basic-auth credentials embedded by `Config::navigable` stay out of
/// assertions.
fn without_credentials(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut u) if !u.username().is_empty() || u.password().is_some() => {
            let _ = u.set_username("");
            let _ = u.set_password(None);
            u.into()
        }
        _ => raw.to_string(),
    }
}

impl Driver for Page {
    async fn goto(&self, url: &str) -> Result<()> {
        Page::goto(self, url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(without_credentials(&Page::url(self).await?))
    }

    async fn query(&self, locator: &Locator) -> Result<Vec<ElementState>> {
        let snap: Snapshot = self.evaluate(&script(locator, "query", "", "")?).await?;
        trace!("query {} -> {} match(es)", locator, snap.found.len());
        check_frames(locator, snap.found.len(), snap.blocked.as_deref())?;
        Ok(snap.found)
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        match mark(self, locator).await? {
            Handle::Selector(sel) => {
                Page::click(self, &sel).await?;
                unmark(self, &sel).await;
            }
            Handle::InFrame => {
                let count: usize = self.evaluate(&script(locator, "click", "", "")?).await?;
                exactly_one(locator, count)?;
            }
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        match mark(self, locator).await? {
            Handle::Selector(sel) => {
                Page::fill(self, &sel, value).await?;
                unmark(self, &sel).await;
            }
            Handle::InFrame => {
                let count: usize = self.evaluate(&script(locator, "fill", "", value)?).await?;
                exactly_one(locator, count)?;
            }
        }
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(Page::screenshot(self).await?)
    }
}
