//! Backend integration with the bundler: reads its build manifest and emits
//! the `<script>`/`<link>` tags a page needs, or points at the dev server.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use anyhow::{Context as _, anyhow};
use maud::{Markup, PreEscaped, html};
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 5173;
pub const MANIFEST_PATH: &str = ".vite/manifest.json";

#[derive(Debug, Clone)]
pub struct ViteConfig {
    /// The dev server is running; assets come from it instead of `output`.
    pub dev: bool,
    pub port: u16,
    /// Build output directory (`build.outDir`).
    pub output: PathBuf,
    /// Public base path. Always starts with `/` once normalized.
    pub base: String,
}

impl Default for ViteConfig {
    fn default() -> Self {
        Self {
            dev: false,
            port: DEFAULT_PORT,
            output: PathBuf::from("dist"),
            base: "/".to_string(),
        }
    }
}

pub type Manifest = BTreeMap<String, ManifestChunk>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestChunk {
    pub src: Option<String>,
    pub file: String,
    pub css: Vec<String>,
    pub assets: Vec<String>,
    pub is_entry: bool,
    pub name: Option<String>,
    pub is_dynamic_entry: bool,
    pub imports: Vec<String>,
    pub dynamic_imports: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Vite {
    config: ViteConfig,
    manifest: Manifest,
}

impl Vite {
    /// Loads the build manifest unless running against the dev server.
    pub fn new(config: ViteConfig) -> anyhow::Result<Self> {
        let config = normalize(config);
        let manifest = if config.dev {
            Manifest::new()
        } else {
            let path = config.output.join(MANIFEST_PATH);
            let bytes =
                std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
            serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?
        };
        Ok(Self { config, manifest })
    }

    pub fn without_manifest(config: ViteConfig) -> Self {
        Self {
            config: normalize(config),
            manifest: Manifest::new(),
        }
    }

    pub fn with_manifest(config: ViteConfig, manifest: Manifest) -> Self {
        Self {
            config: normalize(config),
            manifest,
        }
    }

    pub fn config(&self) -> &ViteConfig {
        &self.config
    }

    pub fn dev_origin(&self) -> String {
        format!("http://localhost:{}", self.config.port)
    }

    pub fn dev_url(&self, path: &str) -> String {
        let base = format!("{}{}", self.dev_origin(), self.config.base);
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Absolute path of a file in the public directory.
    pub fn public_path(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Absolute path of a built input. In dev the name is returned untouched.
    pub fn asset_path(&self, name: &str) -> anyhow::Result<String> {
        if self.config.dev {
            return Ok(name.to_string());
        }
        let chunk = self
            .manifest
            .get(name)
            .ok_or_else(|| anyhow!("asset {name:?} does not exist in vite manifest"))?;
        Ok(self.public_path(&chunk.file))
    }

    /// Head tags for the given entry points.
    pub fn tags(&self, inputs: &[&str]) -> anyhow::Result<Markup> {
        if self.config.dev {
            let client = self.dev_url("@vite/client");
            let mut scripts = Vec::with_capacity(inputs.len());
            for input in inputs {
                scripts.push(self.dev_url(&self.asset_path(input)?));
            }
            return Ok(html! {
                script type="module" src=(client) {}
                @for src in &scripts {
                    script type="module" src=(src) {}
                }
            });
        }

        let mut entries = Vec::with_capacity(inputs.len());
        for input in inputs {
            let chunk = self
                .manifest
                .get(*input)
                .filter(|c| c.is_entry)
                .ok_or_else(|| anyhow!("entry point {input:?} does not exist in vite manifest"))?;
            entries.push((chunk, imported_chunks(&self.manifest, chunk)));
        }

        Ok(html! {
            @for (chunk, imports) in &entries {
                @for css in &chunk.css {
                    link rel="stylesheet" href=(self.public_path(css));
                }
                @for imported in imports {
                    @for css in &imported.css {
                        link rel="stylesheet" href=(self.public_path(css));
                    }
                }
                script type="module" src=(self.public_path(&chunk.file)) {}
                @for imported in imports {
                    link rel="modulepreload" href=(self.public_path(&imported.file));
                }
            }
        })
    }

    /// Preamble required by the React fast-refresh plugin. Empty outside dev.
    pub fn react_refresh(&self) -> Markup {
        if !self.config.dev {
            return html! {};
        }
        let script = format!(
            r#"
  import RefreshRuntime from '{}'
  RefreshRuntime.injectIntoGlobalHook(window)
  window.$RefreshReg$ = () => {{}}
  window.$RefreshSig$ = () => (type) => type
  window.__vite_plugin_react_preamble_installed__ = true
"#,
            self.dev_url("@react-refresh")
        );
        html! {
            script type="module" { (PreEscaped(script)) }
        }
    }
}

fn normalize(mut config: ViteConfig) -> ViteConfig {
    if !config.base.starts_with('/') {
        config.base = format!("/{}", config.base);
    }
    config
}

/// Chunks statically imported by `chunk`, depth first, each listed once and
/// after its own imports.
fn imported_chunks<'m>(manifest: &'m Manifest, chunk: &ManifestChunk) -> Vec<&'m ManifestChunk> {
    fn visit<'m>(
        manifest: &'m Manifest,
        chunk: &ManifestChunk,
        seen: &mut HashSet<&'m str>,
        out: &mut Vec<&'m ManifestChunk>,
    ) {
        for name in &chunk.imports {
            let Some((key, imported)) = manifest.get_key_value(name.as_str()) else {
                continue;
            };
            if !seen.insert(key.as_str()) {
                continue;
            }
            visit(manifest, imported, seen, out);
            out.push(imported);
        }
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    visit(manifest, chunk, &mut seen, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> Manifest {
        serde_json::from_str(
            r#"{
  "app/main.ts": {
    "file": "assets/main-4f2a.js",
    "src": "app/main.ts",
    "isEntry": true,
    "css": ["assets/main-9c1d.css"],
    "imports": ["_shared-aa11.js"]
  },
  "app/pages/index.ts": {
    "file": "assets/index-77bb.js",
    "src": "app/pages/index.ts",
    "isEntry": true,
    "imports": ["_shared-aa11.js", "_util-cc22.js"]
  },
  "_shared-aa11.js": {
    "file": "assets/shared-aa11.js",
    "css": ["assets/shared-0e0e.css"],
    "imports": ["_util-cc22.js"]
  },
  "_util-cc22.js": {
    "file": "assets/util-cc22.js"
  }
}"#,
        )
        .unwrap()
    }

    fn prod() -> Vite {
        Vite::with_manifest(ViteConfig::default(), manifest())
    }

    fn dev() -> Vite {
        Vite::without_manifest(ViteConfig {
            dev: true,
            ..ViteConfig::default()
        })
    }

    #[test]
    fn base_is_normalized_with_leading_slash() {
        let vite = Vite::without_manifest(ViteConfig {
            base: "static/".to_string(),
            ..ViteConfig::default()
        });
        assert_eq!(vite.config().base, "/static/");
        assert_eq!(vite.public_path("/logo.png"), "/static/logo.png");
    }

    #[test]
    fn imports_are_depth_first_and_deduplicated() {
        let manifest = manifest();
        let entry = &manifest["app/pages/index.ts"];
        let files: Vec<_> = imported_chunks(&manifest, entry)
            .iter()
            .map(|c| c.file.as_str())
            .collect();
        assert_eq!(files, ["assets/util-cc22.js", "assets/shared-aa11.js"]);
    }

    #[test]
    fn production_tags_order_css_script_preload() {
        let tags = prod().tags(&["app/main.ts"]).unwrap().into_string();
        let order = [
            r#"<link rel="stylesheet" href="/assets/main-9c1d.css">"#,
            r#"<link rel="stylesheet" href="/assets/shared-0e0e.css">"#,
            r#"<script type="module" src="/assets/main-4f2a.js"></script>"#,
            r#"<link rel="modulepreload" href="/assets/util-cc22.js">"#,
            r#"<link rel="modulepreload" href="/assets/shared-aa11.js">"#,
        ];
        let mut last = 0;
        for tag in order {
            let pos = tags[last..]
                .find(tag)
                .unwrap_or_else(|| panic!("{tag} missing or out of order in {tags}"));
            last += pos + tag.len();
        }
    }

    #[test]
    fn non_entry_chunks_are_rejected() {
        let err = prod().tags(&["_util-cc22.js"]).unwrap_err();
        assert!(err.to_string().contains("_util-cc22.js"));
        assert!(prod().tags(&["app/missing.ts"]).is_err());
    }

    #[test]
    fn dev_tags_point_at_dev_server() {
        let tags = dev().tags(&["app/main.ts"]).unwrap().into_string();
        assert_eq!(
            tags,
            concat!(
                r#"<script type="module" src="http://localhost:5173/@vite/client"></script>"#,
                r#"<script type="module" src="http://localhost:5173/app/main.ts"></script>"#
            )
        );
    }

    #[test]
    fn asset_paths() {
        assert_eq!(
            prod().asset_path("app/main.ts").unwrap(),
            "/assets/main-4f2a.js"
        );
        assert!(prod().asset_path("nope.ts").is_err());
        assert_eq!(dev().asset_path("nope.ts").unwrap(), "nope.ts");
    }

    #[test]
    fn react_refresh_only_in_dev() {
        assert_eq!(prod().react_refresh().into_string(), "");
        assert!(
            dev()
                .react_refresh()
                .into_string()
                .contains("http://localhost:5173/@react-refresh")
        );
    }

    #[test]
    fn missing_manifest_fails_in_production() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Vite::new(ViteConfig {
            output: tmp.path().to_path_buf(),
            ..ViteConfig::default()
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("manifest.json"));

        assert!(
            Vite::new(ViteConfig {
                dev: true,
                output: tmp.path().to_path_buf(),
                ..ViteConfig::default()
            })
            .is_ok()
        );
    }
}
