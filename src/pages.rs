use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::vite::Vite;

pub const MAIN_ENTRY: &str = "app/main.ts";
pub const INDEX_ENTRY: &str = "app/pages/index.ts";

/// Applies the persisted theme before first paint.
const THEME_RESTORE_JS: &str = r#"if (localStorage.getItem("theme") === "dark") document.documentElement.classList.add("dark")"#;

pub struct IndexPage<'a> {
    pub title: &'a str,
    pub name: &'a str,
    pub count: i64,
}

pub struct ProfilePage<'a> {
    pub title: &'a str,
    pub name: &'a str,
}

fn layout(vite: &Vite, title: &str, page_entries: &[&str], content: Markup) -> anyhow::Result<String> {
    let mut entries = vec![MAIN_ENTRY];
    entries.extend_from_slice(page_entries);
    let tags = vite.tags(&entries)?;

    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                script { (PreEscaped(THEME_RESTORE_JS)) }
                (vite.react_refresh())
                (tags)
            }
            body {
                header class="topbar" {
                    a href="/" class="brand" { "tmpl" }
                    button type="button" data-theme-toggle aria-label="Toggle theme" { "Theme" }
                }
                main { (content) }
            }
        }
    };
    Ok(markup.into_string())
}

pub fn render_index(vite: &Vite, page: &IndexPage<'_>) -> anyhow::Result<String> {
    let greeting = if page.name.is_empty() {
        "stranger"
    } else {
        page.name
    };
    let content = html! {
        h1 { "Hello, " (greeting) "!" }
        p {
            "You clicked "
            span id="count" { (page.count) }
            " times."
        }
        button type="button" id="counter" { "Increment" }
        p { a href="/profile" { "Edit profile" } }
    };
    layout(vite, page.title, &[INDEX_ENTRY], content)
}

pub fn render_profile(vite: &Vite, page: &ProfilePage<'_>) -> anyhow::Result<String> {
    let content = html! {
        h1 { "Profile" }
        form method="post" action="/profile" {
            label {
                "Name "
                input id="name" name="name" type="text" value=(page.name);
            }
            button type="submit" { "Save" }
        }
        p { a href="/" { "Back" } }
    };
    layout(vite, page.title, &[], content)
}
