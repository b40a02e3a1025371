use kuchiki::NodeRef;

use crate::cookies::{CookiePolicy, CookieStore};
use crate::counter::Counter;
use crate::dom::{DomError, Document};
use crate::storage::Storage;

/// Click behaviors a page can attach to an element.
#[derive(Clone)]
pub enum Listener {
    ThemeToggle,
    Counter(Counter),
}

/// A loaded page: the document, the host capabilities it may touch, and the
/// click listeners installed by page script.
pub struct Page<S, C> {
    document: Document,
    storage: S,
    cookies: C,
    cookie_policy: CookiePolicy,
    listeners: Vec<(NodeRef, Listener)>,
}

impl<S: Storage, C: CookieStore> Page<S, C> {
    pub fn new(document: Document, storage: S, cookies: C) -> Self {
        Self {
            document,
            storage,
            cookies,
            cookie_policy: CookiePolicy::default(),
            listeners: Vec::new(),
        }
    }

    pub fn with_cookie_policy(mut self, policy: CookiePolicy) -> Self {
        self.cookie_policy = policy;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn cookies(&self) -> &C {
        &self.cookies
    }

    pub fn add_listener(&mut self, target: NodeRef, listener: Listener) {
        self.listeners.push((target, listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Dispatches a click on `target`, bubbling through its ancestors.
    /// Returns how many listeners ran.
    pub fn click(&mut self, target: &NodeRef) -> anyhow::Result<usize> {
        let mut ran = 0;
        for node in target.inclusive_ancestors() {
            for (bound, listener) in &self.listeners {
                if *bound != node {
                    continue;
                }
                match listener {
                    Listener::ThemeToggle => {
                        crate::theme::toggle(&self.document, &mut self.storage)?;
                    }
                    Listener::Counter(counter) => {
                        counter.increment(&mut self.cookies, &self.cookie_policy)?;
                    }
                }
                ran += 1;
            }
        }
        Ok(ran)
    }

    /// Clicks the first element matching `selector`.
    pub fn click_selector(&mut self, selector: &str) -> anyhow::Result<usize> {
        let target = self.document.first(selector)?;
        self.click(&target)
    }

    pub fn into_parts(self) -> (Document, S, C) {
        (self.document, self.storage, self.cookies)
    }
}

/// Runs the page scripts: theme toggles are optional, the counter is not.
pub fn boot<S: Storage, C: CookieStore>(page: &mut Page<S, C>) -> Result<(), DomError> {
    let toggles = crate::theme::install(page)?;
    crate::counter::install(page)?;
    tracing::debug!(toggles, listeners = page.listener_count(), "page booted");
    Ok(())
}
