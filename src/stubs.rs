//! Import Resolver / Stub Generator.
//!
//! After normalization every import is gone, but the symbols those imports
//! bound are still referenced. This module scans the *pre-normalization*
//! merged source for imported symbols, classifies each one, and synthesizes a
//! runtime stand-in for anything the sandbox's preloaded globals and CDN
//! stubs do not already satisfy.
//!
//! Stub resolution is an explicit registry — symbol name in, factory result
//! out — consulted exactly once per document assembly. A name the user's own
//! code declares is never shadowed.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::icons;

/// Symbols the React UMD global provides; imports of these need no stub.
const REACT_GLOBALS: [&str; 14] = [
    "React",
    "useState",
    "useEffect",
    "useRef",
    "useMemo",
    "useCallback",
    "useContext",
    "useReducer",
    "useLayoutEffect",
    "useId",
    "createContext",
    "Fragment",
    "memo",
    "forwardRef",
];

/// Symbols the assembler's CDN stub scripts define at window scope.
const CDN_PROVIDED: [&str; 18] = [
    "clsx",
    "cn",
    "axios",
    "io",
    "useForm",
    "Controller",
    "FormProvider",
    "Link",
    "NavLink",
    "Navigate",
    "Outlet",
    "Route",
    "Routes",
    "BrowserRouter",
    "useNavigate",
    "useParams",
    "useLocation",
    "useSearchParams",
];

/// Animation primitives stubbed by the assembler's motion shim.
const ANIMATION_PRIMITIVES: [&str; 3] = ["motion", "AnimatePresence", "LazyMotion"];

// ═══════════════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Classification of one imported symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    FrameworkHook,
    Icon,
    RouterPrimitive,
    AnimationPrimitive,
    Unresolved,
}

/// A named identifier imported from a non-framework module. `local` is the
/// binding name in scope (the alias, for `{ X as Y }`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedSymbol {
    pub local: String,
    pub module: String,
}

/// One synthesized runtime stand-in.
#[derive(Debug, Clone, PartialEq)]
pub struct Stub {
    pub name: String,
    pub kind: SymbolKind,
    pub js: String,
}

/// Everything the document assembler injects ahead of user code: per-symbol
/// stubs plus the common-identifier safety net.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StubPlan {
    pub stubs: Vec<Stub>,
    pub predeclared: Vec<(String, String)>,
}

impl StubPlan {
    /// Render the plan as one deterministic script block.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, default) in &self.predeclared {
            out.push_str(&format!("var {} = {};\n", name, default));
        }
        for stub in &self.stubs {
            out.push_str(&stub.js);
            out.push('\n');
        }
        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IMPORT SCANNING
// ═══════════════════════════════════════════════════════════════════════════════

/// Scan import declarations and return every locally bound symbol. Runs on
/// the merged source before the normalizer removes the imports.
pub fn scan_imports(source: &str) -> Vec<ImportedSymbol> {
    lazy_static! {
        static ref IMPORT_RE: Regex = Regex::new(
            r#"import\s+(?:type\s+)?([^;'"]+?)\s*from\s*['"]([^'"]+)['"]"#
        )
        .unwrap();
        static ref NAMESPACE_RE: Regex =
            Regex::new(r"^\*\s*as\s+([A-Za-z_$][\w$]*)$").unwrap();
    }
    let mut symbols = Vec::new();
    for caps in IMPORT_RE.captures_iter(source) {
        let clause = caps.get(1).map_or("", |m| m.as_str()).trim();
        let module = caps.get(2).map_or("", |m| m.as_str()).to_string();

        if let Some(ns) = NAMESPACE_RE.captures(clause) {
            symbols.push(ImportedSymbol {
                local: ns[1].to_string(),
                module,
            });
            continue;
        }

        // `Default, { A, B as C }` — default part before any brace group.
        let (default_part, named_part) = match clause.find('{') {
            Some(open) => {
                let close = clause.rfind('}').unwrap_or(clause.len());
                (&clause[..open], &clause[open + 1..close.min(clause.len())])
            }
            None => (clause, ""),
        };
        let default_name = default_part.trim().trim_end_matches(',').trim();
        if !default_name.is_empty() {
            symbols.push(ImportedSymbol {
                local: default_name.to_string(),
                module: module.clone(),
            });
        }
        for spec in named_part.split(',') {
            let spec = spec.trim();
            if spec.is_empty() {
                continue;
            }
            // `Orig as Alias` binds the alias.
            let local = spec
                .split_once(" as ")
                .map(|(_, alias)| alias.trim())
                .unwrap_or(spec);
            symbols.push(ImportedSymbol {
                local: local.to_string(),
                module: module.clone(),
            });
        }
    }
    symbols
}

/// Names the source itself declares: never shadow these with stubs.
pub fn scan_declared_names(source: &str) -> HashSet<String> {
    lazy_static! {
        static ref DECL_RE: Regex = Regex::new(
            r"\b(?:function|const|let|var|class)\s+([A-Za-z_$][\w$]*)"
        )
        .unwrap();
    }
    DECL_RE
        .captures_iter(source)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Classify an imported symbol. Module identity wins over name shape.
pub fn classify(symbol: &ImportedSymbol) -> SymbolKind {
    let module = symbol.module.as_str();
    let name = symbol.local.as_str();
    if module == "react" || module.starts_with("react/") {
        return SymbolKind::FrameworkHook;
    }
    if module.contains("router") {
        return SymbolKind::RouterPrimitive;
    }
    if module.contains("framer-motion") || ANIMATION_PRIMITIVES.contains(&name) {
        return SymbolKind::AnimationPrimitive;
    }
    if icons::is_icon(name) {
        return SymbolKind::Icon;
    }
    SymbolKind::Unresolved
}

fn is_hook_name(name: &str) -> bool {
    name.starts_with("use")
        && name
            .chars()
            .nth(3)
            .map(|c| c.is_ascii_uppercase())
            .unwrap_or(false)
}

// ═══════════════════════════════════════════════════════════════════════════════
// STUB FACTORIES
// ═══════════════════════════════════════════════════════════════════════════════

fn icon_stub(name: &str, path: &str) -> Stub {
    // Faithful outline rendering; size/className/style/onClick forwarded.
    let js = format!(
        "const {name} = (props) => React.createElement('svg', {{ width: (props && props.size) || 24, height: (props && props.size) || 24, viewBox: '0 0 24 24', fill: 'none', stroke: 'currentColor', strokeWidth: 2, strokeLinecap: 'round', strokeLinejoin: 'round', className: props && props.className, style: props && props.style, onClick: props && props.onClick }}, React.createElement('path', {{ d: '{path}' }}));",
        name = name,
        path = path
    );
    Stub {
        name: name.to_string(),
        kind: SymbolKind::Icon,
        js,
    }
}

fn hook_stub(name: &str) -> Stub {
    let js = format!(
        "const {name} = (initial) => [typeof initial === 'undefined' ? null : initial, () => {{}}];",
        name = name
    );
    Stub {
        name: name.to_string(),
        kind: SymbolKind::Unresolved,
        js,
    }
}

fn container_stub(name: &str) -> Stub {
    let js = format!(
        "const {name} = ({{ children, ...props }}) => React.createElement('div', props, children);",
        name = name
    );
    Stub {
        name: name.to_string(),
        kind: SymbolKind::Unresolved,
        js,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SAFETY NET
// ═══════════════════════════════════════════════════════════════════════════════

/// Identifiers malformed generations most often reference without declaring,
/// with deterministic defaults. Pre-declared only when referenced and not
/// declared by the source itself.
const COMMON_DEFAULTS: &[(&str, &str)] = &[
    ("title", "\"Sample Title\""),
    ("subtitle", "\"Sample subtitle\""),
    ("description", "\"Sample description text.\""),
    ("label", "\"Label\""),
    ("name", "\"Sample Name\""),
    ("price", "19.99"),
    ("count", "0"),
    ("index", "0"),
    ("item", "{ id: 1, name: \"Item\", price: 9.99 }"),
    ("items", "[]"),
    ("data", "[]"),
    ("products", "[]"),
    ("image", "\"https://placehold.co/400x300\""),
    ("imageUrl", "\"https://placehold.co/400x300\""),
    ("isActive", "false"),
    ("isOpen", "false"),
    ("isLoading", "false"),
];

// ═══════════════════════════════════════════════════════════════════════════════
// PLANNING
// ═══════════════════════════════════════════════════════════════════════════════

/// Build the stub plan for a merged source: icon stubs for allow-listed
/// names, generic stubs for unresolved symbols, and the safety-net
/// declarations — all skipping names the source declares itself.
pub fn plan_stubs(merged_source: &str) -> StubPlan {
    let declared = scan_declared_names(merged_source);
    let imports = scan_imports(merged_source);

    let mut plan = StubPlan::default();
    let mut emitted: HashSet<String> = HashSet::new();

    for symbol in &imports {
        if declared.contains(&symbol.local) || emitted.contains(&symbol.local) {
            continue;
        }
        let kind = classify(symbol);
        let stub = match kind {
            // Satisfied by preloaded globals or the assembler's CDN shims.
            SymbolKind::FrameworkHook
            | SymbolKind::RouterPrimitive
            | SymbolKind::AnimationPrimitive => continue,
            SymbolKind::Icon => {
                let path = icons::icon_path(&symbol.local).unwrap_or_default();
                icon_stub(&symbol.local, path)
            }
            SymbolKind::Unresolved => {
                if REACT_GLOBALS.contains(&symbol.local.as_str())
                    || CDN_PROVIDED.contains(&symbol.local.as_str())
                {
                    continue;
                }
                if is_hook_name(&symbol.local) {
                    hook_stub(&symbol.local)
                } else {
                    container_stub(&symbol.local)
                }
            }
        };
        emitted.insert(symbol.local.clone());
        plan.stubs.push(stub);
    }

    lazy_static! {
        static ref DEFAULT_REFERENCE_RES: Vec<Regex> = COMMON_DEFAULTS
            .iter()
            .map(|(name, _)| Regex::new(&format!(r"\b{}\b", regex::escape(name))).unwrap())
            .collect();
    }
    for ((name, default), reference_re) in COMMON_DEFAULTS.iter().zip(DEFAULT_REFERENCE_RES.iter())
    {
        if declared.contains(*name) || emitted.contains(*name) {
            continue;
        }
        if reference_re.is_match(merged_source) {
            plan.predeclared.push((name.to_string(), default.to_string()));
        }
    }

    plan
}
