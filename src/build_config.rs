use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context as _;
use serde::Serialize;

use crate::entries;

/// A bundler plugin: the package it comes from and the factory it exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plugin {
    pub name: String,
    pub package: String,
}

impl Plugin {
    pub fn tailwindcss() -> Self {
        Self {
            name: "tailwindcss".to_string(),
            package: "@tailwindcss/vite".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupOptions {
    pub input: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    pub manifest: bool,
    pub rollup_options: RollupOptions,
}

/// The configuration object handed to the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfig {
    pub plugins: Vec<Plugin>,
    pub build: BuildOptions,
}

impl BuildConfig {
    /// Evaluates the default configuration against `root`.
    pub fn evaluate(root: &Path) -> anyhow::Result<Self> {
        Self::evaluate_with(root, entries::DEFAULT_PATTERN)
    }

    pub fn evaluate_with(root: &Path, pattern: &str) -> anyhow::Result<Self> {
        let input = entries::discover(root, pattern)?;
        Ok(Self {
            plugins: vec![Plugin::tailwindcss()],
            build: BuildOptions {
                manifest: true,
                rollup_options: RollupOptions {
                    input: input.into_iter().collect(),
                },
            },
        })
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("serialize build config")
    }

    /// Renders the configuration as a `vite.config.js` module.
    pub fn to_module(&self) -> anyhow::Result<String> {
        let mut out = String::new();
        writeln!(out, "import {{ defineConfig }} from \"vite\";")?;
        for plugin in &self.plugins {
            writeln!(
                out,
                "import {} from {};",
                plugin.name,
                serde_json::to_string(&plugin.package)?
            )?;
        }
        let plugins: Vec<String> = self
            .plugins
            .iter()
            .map(|p| format!("{}()", p.name))
            .collect();
        let input = serde_json::to_string_pretty(&self.build.rollup_options.input)
            .context("serialize entry points")?
            .replace('\n', "\n      ");

        writeln!(out)?;
        writeln!(out, "export default defineConfig({{")?;
        writeln!(out, "  plugins: [{}],", plugins.join(", "))?;
        writeln!(out, "  build: {{")?;
        writeln!(out, "    manifest: {},", self.build.manifest)?;
        writeln!(out, "    rollupOptions: {{")?;
        writeln!(out, "      input: {input},")?;
        writeln!(out, "    }},")?;
        writeln!(out, "  }},")?;
        writeln!(out, "}});")?;
        Ok(out)
    }
}
