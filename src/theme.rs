use crate::cookies::CookieStore;
use crate::dom::{ClassList, DomError, Document};
use crate::page::{Listener, Page};
use crate::storage::Storage;

pub const TOGGLE_SELECTOR: &str = "[data-theme-toggle]";
pub const DARK_CLASS: &str = "dark";
pub const STORAGE_KEY: &str = "theme";

/// Binds the toggle to every marked element. Zero matches is fine.
pub fn install<S: Storage, C: CookieStore>(page: &mut Page<S, C>) -> Result<usize, DomError> {
    let toggles = page.document().select_all(TOGGLE_SELECTOR)?;
    let count = toggles.len();
    for el in toggles {
        page.add_listener(el, Listener::ThemeToggle);
    }
    Ok(count)
}

/// Flips the root `dark` class and mirrors it into storage.
pub fn toggle(document: &Document, storage: &mut impl Storage) -> anyhow::Result<bool> {
    let root = document.root()?;
    let is_dark = ClassList::of(&root).toggle(DARK_CLASS);
    if is_dark {
        storage.set_item(STORAGE_KEY, DARK_CLASS)?;
    } else {
        storage.remove_item(STORAGE_KEY)?;
    }
    tracing::debug!(is_dark, "theme toggled");
    Ok(is_dark)
}

/// Load-time counterpart of [`toggle`]: applies a persisted dark theme to a
/// freshly loaded document, as the page's head script does before paint.
/// Only ever adds the class; a server-rendered `dark` stays put.
pub fn restore(document: &Document, storage: &impl Storage) -> Result<bool, DomError> {
    let root = document.root()?;
    let classes = ClassList::of(&root);
    let stored = storage.get_item(STORAGE_KEY).as_deref() == Some(DARK_CLASS);
    if stored && !classes.contains(DARK_CLASS) {
        classes.toggle(DARK_CLASS);
    }
    Ok(stored)
}

pub fn is_dark(document: &Document) -> bool {
    document
        .root()
        .map(|root| ClassList::of(&root).contains(DARK_CLASS))
        .unwrap_or(false)
}
