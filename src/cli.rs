use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

use crate::entries;
use crate::vite::{self, ViteConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    /// The configuration object as JSON.
    Json,
    /// A `vite.config.js` module.
    Module,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PageKind {
    Index,
    Profile,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the bundler configuration with discovered entry points.
    Config(ConfigArgs),
    /// Render a page to HTML.
    Render(RenderArgs),
    /// Load an HTML page, run its scripts and replay clicks.
    Simulate(SimulateArgs),
    /// Serve the example application.
    Serve(ServeArgs),
}

#[derive(Debug, ClapArgs)]
pub struct ConfigArgs {
    /// Project root the entry glob is evaluated against.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Entry point glob, relative to `--root`.
    #[arg(long, default_value = entries::DEFAULT_PATTERN)]
    pub pattern: String,

    /// Output form of the configuration.
    #[arg(long, value_enum, default_value = "json")]
    pub format: ConfigFormat,

    /// Write here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct ViteArgs {
    /// Use the bundler's dev server instead of built assets.
    #[arg(long)]
    pub dev: bool,

    /// Dev server port (`server.port`).
    #[arg(long, default_value_t = vite::DEFAULT_PORT)]
    pub vite_port: u16,

    /// Build output directory (`build.outDir`).
    #[arg(long, default_value = "dist")]
    pub out_dir: PathBuf,

    /// Public base path (`base`).
    #[arg(long, default_value = "/")]
    pub base: String,
}

impl ViteArgs {
    pub fn to_config(&self) -> ViteConfig {
        ViteConfig {
            dev: self.dev,
            port: self.vite_port,
            output: self.out_dir.clone(),
            base: self.base.clone(),
        }
    }
}

#[derive(Debug, ClapArgs)]
pub struct RenderArgs {
    /// Which page to render.
    #[arg(long, value_enum, default_value = "index")]
    pub page: PageKind,

    /// Counter value shown on the index page.
    #[arg(long, default_value_t = 0)]
    pub count: i64,

    /// Name greeted on the page; empty greets "stranger".
    #[arg(long, default_value = "")]
    pub name: String,

    #[command(flatten)]
    pub vite: ViteArgs,

    /// Write here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, ClapArgs)]
pub struct SimulateArgs {
    /// HTML document to load.
    #[arg(long)]
    pub html: PathBuf,

    /// CSS selector to click, in order. Repeatable.
    #[arg(long = "click")]
    pub clicks: Vec<String>,

    /// Value of the persisted `theme` entry when the page loads.
    #[arg(long)]
    pub stored_theme: Option<String>,

    /// `Max-Age` for cookies written by the page. Session cookie if omitted.
    #[arg(long)]
    pub cookie_max_age: Option<i64>,

    /// Write the JSON report here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, ClapArgs)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: SocketAddr,

    #[command(flatten)]
    pub vite: ViteArgs,
}
