pub mod build_config;
mod cli;
pub mod cookies;
pub mod counter;
pub mod dom;
pub mod entries;
pub mod page;
pub mod pages;
pub mod server;
pub mod storage;
pub mod theme;
pub mod vite;

use std::path::Path;

use anyhow::Context as _;
use serde::Serialize;

use build_config::BuildConfig;
use cookies::{CookiePolicy, MemoryCookieStore};
use dom::Document;
use page::Page;
use storage::{MemoryStorage, Storage as _};
use vite::Vite;

pub use cli::{
    Args as CliArgs, Command, ConfigArgs, ConfigFormat, PageKind, RenderArgs, ServeArgs,
    SimulateArgs, ViteArgs,
};

pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    match args.command {
        Command::Config(args) => run_config(&args),
        Command::Render(args) => run_render(&args),
        Command::Simulate(args) => run_simulate(&args),
        Command::Serve(args) => run_serve(&args).await,
    }
}

fn run_config(args: &ConfigArgs) -> anyhow::Result<()> {
    let config = BuildConfig::evaluate_with(&args.root, &args.pattern)?;
    let text = match args.format {
        ConfigFormat::Json => config.to_json()?,
        ConfigFormat::Module => config.to_module()?,
    };
    emit(args.out.as_deref(), &text)
}

fn run_render(args: &RenderArgs) -> anyhow::Result<()> {
    let vite = Vite::new(args.vite.to_config())?;
    let html = match args.page {
        PageKind::Index => pages::render_index(
            &vite,
            &pages::IndexPage {
                title: "Welcome",
                name: &args.name,
                count: args.count,
            },
        )?,
        PageKind::Profile => pages::render_profile(
            &vite,
            &pages::ProfilePage {
                title: "Profile",
                name: &args.name,
            },
        )?,
    };
    emit(args.out.as_deref(), &html)
}

#[derive(Debug, Serialize)]
pub struct ClickReport {
    pub selector: String,
    pub listeners: usize,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub html: String,
    pub storage: std::collections::BTreeMap<String, String>,
    pub cookies: std::collections::BTreeMap<String, String>,
    pub set_cookie: Vec<String>,
    pub clicks: Vec<ClickReport>,
}

/// Loads a page, restores the stored theme, boots its scripts and replays
/// the clicks in order.
pub fn simulate(
    html: &str,
    clicks: &[String],
    stored_theme: Option<&str>,
    policy: CookiePolicy,
) -> anyhow::Result<SimulationReport> {
    let document = Document::parse(html);
    let mut storage = MemoryStorage::new();
    if let Some(theme_value) = stored_theme {
        storage.set_item(theme::STORAGE_KEY, theme_value)?;
    }
    theme::restore(&document, &storage)?;

    let mut page = Page::new(document, storage, MemoryCookieStore::new()).with_cookie_policy(policy);
    page::boot(&mut page).context("boot page scripts")?;

    let mut reports = Vec::with_capacity(clicks.len());
    for selector in clicks {
        let listeners = page
            .click_selector(selector)
            .with_context(|| format!("click {selector}"))?;
        reports.push(ClickReport {
            selector: selector.clone(),
            listeners,
        });
    }

    let (document, storage, cookies) = page.into_parts();
    Ok(SimulationReport {
        html: document.to_html()?,
        storage: storage.entries().clone(),
        cookies: cookies.values(),
        set_cookie: cookies.set_cookie_headers(),
        clicks: reports,
    })
}

fn run_simulate(args: &SimulateArgs) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(&args.html)
        .with_context(|| format!("read {}", args.html.display()))?;
    let policy = CookiePolicy {
        max_age: args.cookie_max_age.map(time::Duration::seconds),
        ..CookiePolicy::default()
    };
    let report = simulate(&html, &args.clicks, args.stored_theme.as_deref(), policy)?;
    let json = serde_json::to_string_pretty(&report).context("serialize report")?;
    emit(args.out.as_deref(), &json)
}

async fn run_serve(args: &ServeArgs) -> anyhow::Result<()> {
    let config = args.vite.to_config();
    let vite = match Vite::new(config.clone()) {
        Ok(vite) => vite,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "vite manifest unavailable; serving without it");
            Vite::without_manifest(config)
        }
    };
    server::serve(args.addr, vite).await
}

fn emit(out: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("create {}", parent.display()))?;
                }
            }
            std::fs::write(path, text).with_context(|| format!("write {}", path.display()))
        }
        None => {
            println!("{text}");
            Ok(())
        }
    }
}
