//! Multi-File Merger.
//!
//! A generation is either one component or a bundle of named files. Either
//! way the sandbox compiles a single source string, so this module resolves
//! an entry file, qualifies dependency files, and concatenates dependency
//! bodies ahead of the entry body — layout-named files first, stable order
//! otherwise. Dependency default exports are neutralized during
//! concatenation; only the entry's default export survives to claim the
//! mount binding assigned downstream.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entry-file resolution priority. First existing key wins.
const ENTRY_PRIORITY: [&str; 9] = [
    "src/App.tsx",
    "src/App.jsx",
    "App.tsx",
    "App.jsx",
    "app/page.tsx",
    "src/app/page.tsx",
    "page.tsx",
    "src/index.tsx",
    "index.tsx",
];

/// Input to the preview pipeline: one code string, or a path → source map.
/// The map is ordered so merging is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceBundle {
    Single(String),
    Files(BTreeMap<String, String>),
}

/// Result of merging: the compilable source plus the resolved entry's path.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSource {
    pub code: String,
    pub entry_path: String,
}

/// What the merged content turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// Component source, ready for normalization and assembly.
    Component(MergedSource),
    /// JSON/config text with no UI fingerprint; rendered as plain monospace
    /// content instead of being compiled.
    Json(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// MERGING
// ═══════════════════════════════════════════════════════════════════════════════

/// Merge a bundle into one compilable source string.
pub fn merge(bundle: &SourceBundle) -> MergeOutcome {
    let files = match bundle {
        SourceBundle::Files(map) => map.clone(),
        SourceBundle::Single(code) => {
            if let Some(parsed) = split_inline_markers(code) {
                parsed
            } else {
                if is_non_ui_content(code) {
                    return MergeOutcome::Json(code.clone());
                }
                return MergeOutcome::Component(MergedSource {
                    code: code.clone(),
                    entry_path: "App.tsx".to_string(),
                });
            }
        }
    };

    let entry_path = resolve_entry(&files);
    let entry_body = files.get(&entry_path).cloned().unwrap_or_default();
    if files.len() == 1 && is_non_ui_content(&entry_body) {
        return MergeOutcome::Json(entry_body);
    }

    let mut deps: Vec<(&String, &String)> = files
        .iter()
        .filter(|(path, body)| *path != &entry_path && is_dependency_file(path, body))
        .collect();
    // Stable sort: layout-named files float to the front; ties keep the
    // bundle's map order, the only file order an ordered-map bundle carries.
    deps.sort_by_key(|(path, _)| !is_layout_file(path));

    let mut code = String::new();
    for (index, (_, body)) in deps.iter().enumerate() {
        let body = neutralize_default_exports(body, index);
        code.push_str(body.trim_end());
        code.push_str("\n\n");
    }
    code.push_str(&entry_body);

    MergeOutcome::Component(MergedSource { code, entry_path })
}

/// Resolve the entry file: fixed priority paths, then the app/home default
/// export heuristic, then the first file in map order.
pub fn resolve_entry(files: &BTreeMap<String, String>) -> String {
    lazy_static! {
        static ref APP_EXPORT_RE: Regex = Regex::new(
            r"export\s+default\s+(?:function\s+)?(?:App|Home|Page|Main)\b"
        )
        .unwrap();
    }
    for candidate in ENTRY_PRIORITY {
        if files.contains_key(candidate) {
            return candidate.to_string();
        }
    }
    for (path, body) in files {
        if APP_EXPORT_RE.is_match(body) {
            return path.clone();
        }
    }
    files.keys().next().cloned().unwrap_or_default()
}

/// Rewrite a dependency body so its default export cannot claim the mount
/// binding downstream: named declarations keep their own name, identifier
/// re-export lines are dropped, anonymous expressions get parked on a
/// per-file binding that the component detector ignores.
fn neutralize_default_exports(body: &str, ordinal: usize) -> String {
    lazy_static! {
        static ref DEFAULT_DECL_RE: Regex = Regex::new(
            r"export\s+default\s+(async\s+function|function|class)(\s+[A-Za-z_$][\w$]*)"
        )
        .unwrap();
        static ref DEFAULT_IDENT_RE: Regex =
            Regex::new(r"(?m)^\s*export\s+default\s+[A-Za-z_$][\w$]*\s*;?\s*$").unwrap();
        static ref DEFAULT_EXPR_RE: Regex = Regex::new(r"export\s+default\s+").unwrap();
    }
    let out = DEFAULT_DECL_RE.replace_all(body, "${1}${2}");
    let out = DEFAULT_IDENT_RE.replace_all(&out, "");
    DEFAULT_EXPR_RE
        .replace_all(&out, format!("const __DepDefault{}__ = ", ordinal).as_str())
        .into_owned()
}

fn is_layout_file(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.contains("layout")
}

/// A dependency file is a component file: `.tsx`/`.jsx`, not framework
/// plumbing, and actually declaring something.
fn is_dependency_file(path: &str, body: &str) -> bool {
    lazy_static! {
        static ref DECL_MARKER_RE: Regex =
            Regex::new(r"\b(?:export|function|const)\b").unwrap();
    }
    let lower = path.to_lowercase();
    if !lower.ends_with(".tsx") && !lower.ends_with(".jsx") {
        return false;
    }
    let stem = lower.rsplit('/').next().unwrap_or(&lower);
    let is_framework = stem.starts_with("main.")
        || stem.starts_with("index.")
        || stem.starts_with("_app.")
        || stem.starts_with("_document.")
        || lower.contains("router");
    !is_framework && DECL_MARKER_RE.is_match(body)
}

// ═══════════════════════════════════════════════════════════════════════════════
// INLINE FILE MARKERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Some generations concatenate files into one string separated by
/// `// src/components/Card.tsx` marker comments. Split those back into a
/// synthetic file map. Returns `None` when fewer than two markers exist.
pub fn split_inline_markers(code: &str) -> Option<BTreeMap<String, String>> {
    lazy_static! {
        static ref MARKER_RE: Regex =
            Regex::new(r"(?m)^\s*//\s*([\w./ -]+\.(?:tsx|jsx|ts|js|css))\s*$").unwrap();
    }
    let markers: Vec<_> = MARKER_RE.captures_iter(code).collect();
    if markers.len() < 2 {
        return None;
    }

    let mut files = BTreeMap::new();
    let positions: Vec<(String, usize, usize)> = markers
        .iter()
        .map(|caps| {
            let whole = caps.get(0).expect("marker match");
            let path = caps.get(1).expect("marker path").as_str().trim().to_string();
            (path, whole.start(), whole.end())
        })
        .collect();
    for (i, (path, _, body_start)) in positions.iter().enumerate() {
        let body_end = positions
            .get(i + 1)
            .map(|(_, next_start, _)| *next_start)
            .unwrap_or(code.len());
        files.insert(path.clone(), code[*body_start..body_end].trim().to_string());
    }
    Some(files)
}

// ═══════════════════════════════════════════════════════════════════════════════
// NON-UI CONTENT DETECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// JSON/config payloads sometimes come back where a component was expected.
/// After stripping comments, content that opens with `{`/`[` and carries no
/// React/JSX fingerprint must not be fed to the compiler.
pub fn is_non_ui_content(code: &str) -> bool {
    lazy_static! {
        static ref LINE_COMMENT_RE: Regex = Regex::new(r"(?m)^\s*//.*$").unwrap();
        static ref BLOCK_COMMENT_RE: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();
        static ref FINGERPRINT_RE: Regex = Regex::new(
            r"</|/>|\breturn\s*<|\bfunction\b|=>|\buseState\b|\buseEffect\b|\bexport\b|\bimport\b"
        )
        .unwrap();
    }
    let stripped = LINE_COMMENT_RE.replace_all(code, "");
    let stripped = BLOCK_COMMENT_RE.replace_all(&stripped, "");
    let trimmed = stripped.trim();
    (trimmed.starts_with('{') || trimmed.starts_with('[')) && !FINGERPRINT_RE.is_match(trimmed)
}
