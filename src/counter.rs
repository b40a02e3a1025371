use std::fmt;

use kuchiki::NodeRef;

use crate::cookies::{CookiePolicy, CookieStore};
use crate::dom::{self, DomError, Document};
use crate::page::{Listener, Page};
use crate::storage::Storage;

pub const DISPLAY_ID: &str = "count";
pub const BUTTON_ID: &str = "counter";
pub const COOKIE_NAME: &str = "Count-State";

/// The displayed counter value as page script sees it after integer parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountValue {
    Number(i64),
    NotANumber,
}

impl CountValue {
    /// Lenient integer parse: leading whitespace, an optional sign, then as
    /// many base-10 digits as are present. Trailing garbage is ignored.
    pub fn parse(text: &str) -> Self {
        let s = text.trim_start();
        let (negative, rest) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let digits = &rest[..digits_end];
        if digits.is_empty() {
            return CountValue::NotANumber;
        }
        match digits.parse::<i64>() {
            Ok(n) if negative => CountValue::Number(-n),
            Ok(n) => CountValue::Number(n),
            Err(_) => CountValue::NotANumber,
        }
    }

    pub fn next(self) -> Self {
        match self {
            CountValue::Number(n) => n
                .checked_add(1)
                .map(CountValue::Number)
                .unwrap_or(CountValue::NotANumber),
            CountValue::NotANumber => CountValue::NotANumber,
        }
    }
}

impl fmt::Display for CountValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountValue::Number(n) => write!(f, "{n}"),
            CountValue::NotANumber => f.write_str("NaN"),
        }
    }
}

/// The `#count` display and its `#counter` button.
#[derive(Clone)]
pub struct Counter {
    display: NodeRef,
    button: NodeRef,
}

impl Counter {
    pub fn mount(document: &Document) -> Result<Self, DomError> {
        Ok(Self {
            display: document.by_id(DISPLAY_ID)?,
            button: document.by_id(BUTTON_ID)?,
        })
    }

    pub fn button(&self) -> &NodeRef {
        &self.button
    }

    pub fn current(&self) -> CountValue {
        CountValue::parse(&dom::text(&self.display))
    }

    /// One click: display `N` becomes `N+1` and the cookie follows it.
    pub fn increment(
        &self,
        cookies: &mut impl CookieStore,
        policy: &CookiePolicy,
    ) -> anyhow::Result<CountValue> {
        let next = self.current().next();
        let text = next.to_string();
        // Cookie first: a failed write leaves display and cookie in agreement.
        cookies.set(policy.build(COOKIE_NAME, &text))?;
        dom::set_text(&self.display, &text);
        tracing::debug!(count = %next, "counter incremented");
        Ok(next)
    }
}

/// Wires the counter button. Missing elements abort installation.
pub fn install<S: Storage, C: CookieStore>(page: &mut Page<S, C>) -> Result<(), DomError> {
    let counter = Counter::mount(page.document())?;
    let button = counter.button().clone();
    page.add_listener(button, Listener::Counter(counter));
    Ok(())
}
