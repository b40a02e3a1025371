use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use regex::Regex;

pub const DEFAULT_PATTERN: &str = "./app/**/*.{ts,css}";

/// A compiled file glob. Matching is done on `/`-separated paths relative to
/// the scan root.
#[derive(Debug, Clone)]
pub struct Glob {
    base: String,
    regex: Regex,
    allow_hidden: bool,
}

impl Glob {
    pub fn new(pattern: &str) -> anyhow::Result<Self> {
        let normalized = pattern.trim_start_matches("./");
        if normalized.is_empty() {
            anyhow::bail!("empty glob pattern");
        }
        let source = translate(normalized).with_context(|| format!("compile glob {pattern}"))?;
        let regex = Regex::new(&format!("^{source}$"))
            .with_context(|| format!("compile glob {pattern}"))?;
        Ok(Self {
            base: literal_base(normalized),
            regex,
            allow_hidden: normalized.split('/').any(|seg| seg.starts_with('.')),
        })
    }

    pub fn is_match(&self, relative: &str) -> bool {
        self.regex.is_match(relative)
    }

    /// Walks `root` once and returns every matching file, sorted.
    pub fn expand(&self, root: &Path) -> anyhow::Result<BTreeSet<String>> {
        let start = if self.base.is_empty() {
            root.to_path_buf()
        } else {
            root.join(&self.base)
        };
        let mut found = BTreeSet::new();
        if !start.is_dir() {
            tracing::debug!(start = %start.display(), "glob base does not exist");
            return Ok(found);
        }
        self.walk(root, &start, &mut found)?;
        Ok(found)
    }

    fn walk(&self, root: &Path, dir: &Path, found: &mut BTreeSet<String>) -> anyhow::Result<()> {
        let mut entries = std::fs::read_dir(dir)
            .with_context(|| format!("read dir {}", dir.display()))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("read dir {}", dir.display()))?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let name = entry.file_name();
            if !self.allow_hidden && name.to_string_lossy().starts_with('.') {
                continue;
            }
            let path: PathBuf = entry.path();
            let file_type = entry
                .file_type()
                .with_context(|| format!("stat {}", path.display()))?;
            if file_type.is_dir() {
                self.walk(root, &path, found)?;
            } else if file_type.is_file() {
                let Some(relative) = relative_slash_path(root, &path) else {
                    continue;
                };
                if self.is_match(&relative) {
                    found.insert(relative);
                }
            }
        }
        Ok(())
    }
}

/// Expands `pattern` against `root`.
pub fn discover(root: &Path, pattern: &str) -> anyhow::Result<BTreeSet<String>> {
    let glob = Glob::new(pattern)?;
    let entries = glob.expand(root)?;
    tracing::info!(pattern, count = entries.len(), "discovered entry points");
    Ok(entries)
}

fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Leading path segments free of glob syntax; the walk starts there.
fn literal_base(pattern: &str) -> String {
    let segments: Vec<&str> = pattern.split('/').collect();
    let mut base = Vec::new();
    // The last segment names files, never a directory to descend from.
    for seg in &segments[..segments.len().saturating_sub(1)] {
        if seg.contains(['*', '?', '[', '{']) {
            break;
        }
        base.push(*seg);
    }
    base.join("/")
}

fn translate(pattern: &str) -> anyhow::Result<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut brace_depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' if chars.get(i + 1) == Some(&'*') => {
                let at_segment_start = i == 0 || chars[i - 1] == '/';
                if at_segment_start && chars.get(i + 2) == Some(&'/') {
                    // `**/` also matches zero directories.
                    out.push_str("(?:[^/]*/)*");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .map(|p| p + i + 1);
                let Some(close) = close else {
                    anyhow::bail!("unterminated character class");
                };
                let mut class: String = chars[i + 1..close].iter().collect();
                if let Some(rest) = class.strip_prefix('!') {
                    class = format!("^{rest}");
                }
                out.push('[');
                out.push_str(&class.replace('\\', "\\\\"));
                out.push(']');
                i = close + 1;
                continue;
            }
            '{' => {
                brace_depth += 1;
                out.push_str("(?:");
            }
            ',' if brace_depth > 0 => out.push('|'),
            '}' if brace_depth > 0 => {
                brace_depth -= 1;
                out.push(')');
            }
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    if brace_depth != 0 {
        anyhow::bail!("unbalanced braces");
    }
    Ok(out)
}
