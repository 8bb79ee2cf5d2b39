//! Source Normalizer for the RyzeCanvas preview pipeline.
//!
//! AI generations arrive as TypeScript/JSX. The sandbox evaluator only
//! understands plain JSX, so every type-only construct has to be stripped
//! before the document is assembled. Stripping runs as sequential pattern
//! passes over the raw text; pass order matters because later passes assume
//! earlier ones already removed syntactic noise:
//!
//! 1. import declarations (re-satisfied later by stubs/globals)
//! 2. export rewriting (`export default` → plain decl or `__DefaultExport__`)
//! 3. interface / type-alias blocks (balanced-brace removal)
//! 4. annotations, generics, assertions, `readonly`, non-null `!`
//! 5. `enum` → plain const object
//! 6. `"use client"` / `"use server"` directive lines
//!
//! This stage never fails: anything it cannot confidently strip is left in
//! place for the aggressive second pass that runs before the fallback
//! compile attempt.

use lazy_static::lazy_static;
use regex::Regex;

/// Binding name given to a default-exported bare expression so the document
/// assembler's resolution chain can find it.
pub const DEFAULT_EXPORT_BINDING: &str = "__DefaultExport__";

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Run the full normalization pipeline. Infallible by contract.
pub fn normalize(source: &str) -> String {
    let out = strip_imports(source);
    let out = rewrite_exports(&out);
    let out = remove_interfaces(&out);
    let out = remove_type_aliases(&out);
    let out = rewrite_enums(&out);
    let out = strip_annotations(&out);
    strip_directives(&out)
}

/// Second-pass stripper for the fallback compile attempt. Harsher than the
/// primary pipeline: anything that still looks like a type annotation goes,
/// even at the cost of occasionally clipping a runtime-harmless token.
pub fn aggressive_strip(source: &str) -> String {
    lazy_static! {
        // `): Foo is Bar {`  /  `): asserts x is Foo {`
        static ref IS_PREDICATE_RE: Regex =
            Regex::new(r"\)\s*:\s*(?:asserts\s+)?[A-Za-z_$][\w$]*\s+is\s+[^={]+(\{|=>)").unwrap();
        // Any residual return annotation up to the body/arrow
        static ref RETURN_ANNOTATION_RE: Regex =
            Regex::new(r"\)\s*:\s*[^={;()]+(\{|=>)").unwrap();
        // Residual `ident<...>(` call/declaration generics, one nesting level
        static ref CALL_GENERIC_RE: Regex =
            Regex::new(r"([A-Za-z_$][\w$]*)\s*<(?:[^<>]|<[^<>]*>)*>\s*\(").unwrap();
        // Residual `x as Foo` / `x satisfies Foo`
        static ref ASSERTION_RE: Regex = Regex::new(
            r"\s+(?:as|satisfies)\s+(?:const\b|\{[^{}]*\}|[A-Za-z_$][\w$.]*(?:<[^<>]*>)?(?:\[\])*)"
        )
        .unwrap();
        // Residual `: Foo` after an identifier, inside parens or declarations
        static ref BARE_ANNOTATION_RE: Regex = Regex::new(
            r"([A-Za-z_$][\w$]*\s*\??)\s*:\s*(?:\{[^{}]*\}|\[[^\[\]]*\]|[A-Za-z_$][\w$.]*(?:<[^<>]*>)?(?:\[\])*)(\s*[,)=;])"
        )
        .unwrap();
    }
    let mut out = IS_PREDICATE_RE.replace_all(source, ") $1").into_owned();
    out = RETURN_ANNOTATION_RE.replace_all(&out, ") $1").into_owned();
    out = CALL_GENERIC_RE.replace_all(&out, "$1(").into_owned();
    out = ASSERTION_RE.replace_all(&out, "").into_owned();
    for _ in 0..8 {
        let next = BARE_ANNOTATION_RE.replace_all(&out, "$1$2").into_owned();
        if next == out {
            break;
        }
        out = next;
    }
    strip_optional_markers(&out)
}

// ═══════════════════════════════════════════════════════════════════════════════
// PASS 1: IMPORTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Remove every import declaration: default, named (single- or multi-line),
/// namespace, type-only, and bare side-effect imports.
pub fn strip_imports(source: &str) -> String {
    lazy_static! {
        static ref IMPORT_RE: Regex = Regex::new(
            r#"import\s+(?:type\s+)?(?:[A-Za-z_$][\w$]*\s*,\s*)?(?:\{[^}]*\}|\*\s*as\s+[A-Za-z_$][\w$]*|[A-Za-z_$][\w$]*)\s*from\s*['"][^'"]+['"]\s*;?"#
        )
        .unwrap();
        static ref SIDE_EFFECT_RE: Regex =
            Regex::new(r#"(?m)^\s*import\s*['"][^'"]+['"]\s*;?\s*$"#).unwrap();
    }
    let out = IMPORT_RE.replace_all(source, "");
    SIDE_EFFECT_RE.replace_all(&out, "").into_owned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// PASS 2: EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Rewrite export syntax into plain declarations.
///
/// `export default function App()` keeps its declaration name;
/// `export default <expr>` becomes `const __DefaultExport__ = <expr>;` so the
/// resolution chain has a stable binding to mount.
pub fn rewrite_exports(source: &str) -> String {
    lazy_static! {
        static ref DEFAULT_DECL_RE: Regex =
            Regex::new(r"export\s+default\s+(async\s+function|function|class)(\s+[A-Za-z_$][\w$]*)")
                .unwrap();
        static ref DEFAULT_EXPR_RE: Regex = Regex::new(r"export\s+default\s+").unwrap();
        static ref RE_EXPORT_RE: Regex = Regex::new(
            r#"(?m)^\s*export\s*\{[^}]*\}\s*(?:from\s*['"][^'"]+['"]\s*)?;?\s*$"#
        )
        .unwrap();
        static ref NAMED_EXPORT_RE: Regex =
            Regex::new(r"(?m)^(\s*)export\s+(async\s+function|function|class|const|let|var|interface|type|enum)\b")
                .unwrap();
    }
    // Named default declarations first; everything else that follows
    // `export default` is expression-shaped and gets the binding rewrite.
    let out = DEFAULT_DECL_RE.replace_all(source, "$1$2");
    let out = DEFAULT_EXPR_RE.replace_all(&out, format!("const {} = ", DEFAULT_EXPORT_BINDING));
    let out = RE_EXPORT_RE.replace_all(&out, "");
    NAMED_EXPORT_RE.replace_all(&out, "${1}${2}").into_owned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// PASS 3: INTERFACES AND TYPE ALIASES
// ═══════════════════════════════════════════════════════════════════════════════

/// Remove `interface X { ... }` blocks, including `extends` clauses and
/// nested object-type braces, via balanced-brace scanning.
pub fn remove_interfaces(source: &str) -> String {
    lazy_static! {
        static ref INTERFACE_RE: Regex =
            Regex::new(r"(?m)^\s*interface\s+[A-Za-z_$][\w$]*").unwrap();
    }
    remove_braced_statements(source, &INTERFACE_RE)
}

/// Remove `type X = ...;` aliases. Object-shaped aliases are consumed with
/// brace matching; simple aliases end at the first top-level `;` or newline.
pub fn remove_type_aliases(source: &str) -> String {
    lazy_static! {
        static ref TYPE_ALIAS_RE: Regex =
            Regex::new(r"(?m)^\s*type\s+[A-Za-z_$][\w$]*\s*(?:<[^<>]*>)?\s*=").unwrap();
    }
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(m) = TYPE_ALIAS_RE.find(rest) {
        out.push_str(&rest[..m.start()]);
        let after = &rest[m.end()..];
        let consumed = consume_type_expression(after);
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}

/// Scan past a type expression: balanced braces/brackets/parens, stopping at
/// a top-level `;` or at a newline that does not continue a union.
fn consume_type_expression(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut depth: i32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'[' | b'(' | b'<' => depth += 1,
            b'}' | b']' | b')' | b'>' => depth = depth.saturating_sub(1),
            b';' if depth == 0 => return i + 1,
            b'\n' if depth == 0 => {
                // Union/intersection members may continue on the next line.
                let tail = text[i..].trim_start();
                if !tail.starts_with('|') && !tail.starts_with('&') {
                    return i;
                }
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Shared removal for statements of the form `keyword Name ... { ... }`.
fn remove_braced_statements(source: &str, head_re: &Regex) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(m) = head_re.find(rest) {
        out.push_str(&rest[..m.start()]);
        let after = &rest[m.end()..];
        match after.find('{').and_then(|open| {
            find_balanced_brace(after, open).map(|close| (open, close))
        }) {
            Some((_, close)) => {
                rest = &after[close + 1..];
            }
            None => {
                // Unbalanced block: leave it for the aggressive pass.
                out.push_str(&rest[m.start()..m.end()]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Index of the `}` balancing the `{` at `open`, string-literal aware.
pub fn find_balanced_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open)? != &b'{' {
        return None;
    }
    let mut depth = 1;
    let mut i = open + 1;
    let mut in_string = false;
    let mut quote = 0u8;
    while i < bytes.len() && depth > 0 {
        let c = bytes[i];
        if i > 0 && bytes[i - 1] == b'\\' {
            i += 1;
            continue;
        }
        if !in_string && (c == b'"' || c == b'\'' || c == b'`') {
            in_string = true;
            quote = c;
        } else if in_string && c == quote {
            in_string = false;
        } else if !in_string {
            if c == b'{' {
                depth += 1;
            } else if c == b'}' {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// PASS 4: ANNOTATIONS, GENERICS, ASSERTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Type-expression shape shared by the annotation strippers: inline object,
/// tuple, or a (possibly generic/array/unioned) named type.
const TYPE_PATTERN: &str = r"(?:\{[^{}]*\}|\[[^\[\]]*\]|[A-Za-z_$][\w$.]*(?:<(?:[^<>]|<[^<>]*>)*>)?(?:\[\])*(?:\s*\|\s*(?:null|undefined|[A-Za-z_$][\w$.]*(?:\[\])*))*)";

/// Strip the annotation syntax the primary compile cannot digest. Each
/// rewrite is intentionally narrow; residue is the fallback pass's job.
pub fn strip_annotations(source: &str) -> String {
    lazy_static! {
        // Hook-call generics: `useState<Item[]>(` → `useState(`
        static ref HOOK_GENERIC_RE: Regex = Regex::new(
            r"\b(useState|useRef|useReducer|useMemo|useCallback|useContext|createContext)\s*<(?:[^<>]|<[^<>]*>)*>\s*\("
        )
        .unwrap();
        // Function declaration generics: `function f<T, U>(` → `function f(`
        static ref FN_GENERIC_RE: Regex = Regex::new(
            r"\b((?:async\s+)?function\s+[A-Za-z_$][\w$]*)\s*<(?:[^<>]|<[^<>]*>)*>\s*\("
        )
        .unwrap();
        // Object-shaped return annotations: `): { ok: boolean } {`
        static ref OBJECT_RETURN_RE: Regex =
            Regex::new(r"\)\s*:\s*\{[^{}]*\}\s*(\{|=>)").unwrap();
        // Plain return annotations: `): JSX.Element {`, `): string[] =>`
        static ref RETURN_RE: Regex = Regex::new(
            r"\)\s*:\s*[A-Za-z_$][\w$.]*(?:<(?:[^<>]|<[^<>]*>)*>)?(?:\[\])*(?:\s*\|\s*[A-Za-z_$][\w$.]*(?:\[\])*)*\s*(\{|=>)"
        )
        .unwrap();
        // Declaration annotations: `const items: Item[] =` — unambiguous, a
        // `const`/`let`/`var` head never starts an object member or ternary.
        static ref DECL_ANNOTATION_RE: Regex = Regex::new(&format!(
            r"((?:\bconst|\blet|\bvar)\s+[A-Za-z_$][\w$]*)\s*:\s*{}",
            TYPE_PATTERN
        ))
        .unwrap();
        // `expr as Foo` / `expr satisfies Foo`
        static ref ASSERTION_RE: Regex = Regex::new(
            r"\s+(?:as|satisfies)\s+(?:const\b|\{[^{}]*\}|[A-Za-z_$][\w$.]*(?:<[^<>]*>)?(?:\[\])*)"
        )
        .unwrap();
        // Non-null assertions: `user!.name`, `ref.current!)` — `!=`/`!==` are
        // untouched because `=` is outside the trailing class.
        static ref NON_NULL_RE: Regex =
            Regex::new(r"([A-Za-z0-9_$\)\]])!([\.\),;\[\s])").unwrap();
        static ref READONLY_RE: Regex = Regex::new(r"\breadonly\s+").unwrap();
    }
    let mut out = HOOK_GENERIC_RE.replace_all(source, "$1(").into_owned();
    out = FN_GENERIC_RE.replace_all(&out, "$1(").into_owned();
    out = OBJECT_RETURN_RE.replace_all(&out, ") $1").into_owned();
    out = RETURN_RE.replace_all(&out, ") $1").into_owned();
    out = strip_destructure_annotations(&out);
    // Parameter lists chain annotations (`(a: X, b: Y)`), so iterate to a
    // fixpoint; the bound keeps malformed input from spinning.
    for _ in 0..8 {
        let next = strip_param_annotations(&out);
        if next == out {
            break;
        }
        out = next;
    }
    out = DECL_ANNOTATION_RE.replace_all(&out, "$1").into_owned();
    out = ASSERTION_RE.replace_all(&out, "").into_owned();
    out = NON_NULL_RE.replace_all(&out, "$1$2").into_owned();
    out = READONLY_RE.replace_all(&out, "").into_owned();
    strip_optional_markers(&out)
}

/// `}: Props)` / `]: Pair)` after a destructuring pattern. The annotation is
/// only stripped when the pattern sits in a parameter position, i.e. its
/// opener is introduced by `(` or `,`. A `}`/`]` closing a ternary consequent
/// or an index expression keeps its colon.
fn strip_destructure_annotations(source: &str) -> String {
    lazy_static! {
        static ref DESTRUCTURE_RE: Regex = Regex::new(
            r"([}\]])\s*:\s*[A-Za-z_$][\w$.]*(?:<(?:[^<>]|<[^<>]*>)*>)?(?:\[\])*"
        )
        .unwrap();
    }
    let mut out = String::with_capacity(source.len());
    let mut last = 0;
    for caps in DESTRUCTURE_RE.captures_iter(source) {
        let whole = caps.get(0).expect("whole match");
        let closer = caps.get(1).expect("closing bracket");
        let in_params = match open_bracket_stack(source, whole.start()).last() {
            Some(&(open, at))
                if (open == b'{' && closer.as_str() == "}")
                    || (open == b'[' && closer.as_str() == "]") =>
            {
                matches!(last_meaningful_byte(source, at), Some(b'(') | Some(b','))
            }
            _ => false,
        };
        out.push_str(&source[last..whole.start()]);
        if in_params {
            out.push_str(closer.as_str());
        } else {
            out.push_str(whole.as_str());
        }
        last = whole.end();
    }
    out.push_str(&source[last..]);
    out
}

/// `(count: number` / `, items: Item[]`. The comma form is only rewritten
/// when the innermost enclosing bracket is a parenthesis; the same shape
/// inside `{`/`[` is an object or array member and runtime-meaningful.
fn strip_param_annotations(source: &str) -> String {
    lazy_static! {
        static ref PARAM_ANNOTATION_RE: Regex = Regex::new(&format!(
            r"([(,]\s*[A-Za-z_$][\w$]*)\s*\??\s*:\s*{}",
            TYPE_PATTERN
        ))
        .unwrap();
    }
    let mut out = String::with_capacity(source.len());
    let mut last = 0;
    for caps in PARAM_ANNOTATION_RE.captures_iter(source) {
        let whole = caps.get(0).expect("whole match");
        let kept = caps.get(1).expect("delimiter and name");
        let in_params = source.as_bytes()[whole.start()] == b'('
            || innermost_open_bracket(source, whole.start()) == Some(b'(');
        out.push_str(&source[last..whole.start()]);
        if in_params {
            out.push_str(kept.as_str());
        } else {
            out.push_str(whole.as_str());
        }
        last = whole.end();
    }
    out.push_str(&source[last..]);
    out
}

/// Stack of unclosed brackets (byte, offset) before `stop`, string-literal
/// aware so brackets inside quotes and template literals do not count.
fn open_bracket_stack(text: &str, stop: usize) -> Vec<(u8, usize)> {
    let bytes = text.as_bytes();
    let mut stack: Vec<(u8, usize)> = Vec::new();
    let mut in_string = false;
    let mut quote = 0u8;
    let mut i = 0;
    while i < stop.min(bytes.len()) {
        let c = bytes[i];
        if in_string {
            if c == b'\\' {
                i += 2;
                continue;
            }
            if c == quote {
                in_string = false;
            }
        } else {
            match c {
                b'"' | b'\'' | b'`' => {
                    in_string = true;
                    quote = c;
                }
                b'(' | b'[' | b'{' => stack.push((c, i)),
                b')' | b']' | b'}' => {
                    stack.pop();
                }
                _ => {}
            }
        }
        i += 1;
    }
    stack
}

fn innermost_open_bracket(text: &str, pos: usize) -> Option<u8> {
    open_bracket_stack(text, pos).last().map(|&(c, _)| c)
}

fn last_meaningful_byte(text: &str, before: usize) -> Option<u8> {
    text.as_bytes()[..before]
        .iter()
        .rev()
        .copied()
        .find(|b| !b.is_ascii_whitespace())
}

/// `function f(a?, b)` is not JavaScript; drop optional-parameter markers.
fn strip_optional_markers(source: &str) -> String {
    lazy_static! {
        static ref OPTIONAL_RE: Regex =
            Regex::new(r"([A-Za-z_$][\w$]*)\s*\?\s*([,)])").unwrap();
    }
    OPTIONAL_RE.replace_all(source, "$1$2").into_owned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// PASS 5: ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Rewrite `enum Color { Red = "red", Green }` into
/// `const Color = { Red: "red", Green: "Green" };`.
///
/// Explicit initializers are preserved verbatim; implicit members default to
/// their own key name as a string.
pub fn rewrite_enums(source: &str) -> String {
    lazy_static! {
        static ref ENUM_RE: Regex =
            Regex::new(r"\b(?:const\s+)?enum\s+([A-Za-z_$][\w$]*)\s*").unwrap();
    }
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(caps) = ENUM_RE.captures(rest) {
        let m = caps.get(0).expect("whole match");
        let name = caps.get(1).expect("enum name").as_str();
        let after = &rest[m.end()..];
        let Some(close) = after.starts_with('{').then_some(0).and_then(|open| {
            find_balanced_brace(after, open)
        }) else {
            // Not an enum body; emit as-is and move past the keyword.
            out.push_str(&rest[..m.end()]);
            rest = after;
            continue;
        };
        out.push_str(&rest[..m.start()]);
        out.push_str(&render_enum_object(name, &after[1..close]));
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

fn render_enum_object(name: &str, body: &str) -> String {
    let mut members = Vec::new();
    for raw in body.split(',') {
        let member = raw.trim().trim_end_matches(';');
        if member.is_empty() {
            continue;
        }
        match member.split_once('=') {
            Some((key, value)) => {
                members.push(format!("{}: {}", key.trim(), value.trim()));
            }
            None => {
                members.push(format!("{}: \"{}\"", member, member));
            }
        }
    }
    format!("const {} = {{ {} }};", name, members.join(", "))
}

// ═══════════════════════════════════════════════════════════════════════════════
// PASS 6: DIRECTIVES
// ═══════════════════════════════════════════════════════════════════════════════

/// Drop `"use client"` / `"use server"` directive-only lines.
pub fn strip_directives(source: &str) -> String {
    lazy_static! {
        static ref DIRECTIVE_RE: Regex =
            Regex::new(r#"(?m)^\s*['"]use (?:client|server)['"]\s*;?\s*$"#).unwrap();
    }
    DIRECTIVE_RE.replace_all(source, "").into_owned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT NAME DETECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Statically detect the most plausible root component name: the last
/// capitalized function/const declaration wins, since dependency files are
/// concatenated ahead of the entry file.
pub fn detect_component_name(source: &str) -> Option<String> {
    lazy_static! {
        static ref COMPONENT_DECL_RE: Regex = Regex::new(
            r"(?m)^\s*(?:async\s+)?(?:function\s+([A-Z][\w$]*)\s*\(|const\s+([A-Z][\w$]*)\s*=\s*(?:\(|[A-Za-z_$][\w$]*\s*=>|async))"
        )
        .unwrap();
    }
    let mut found = None;
    for caps in COMPONENT_DECL_RE.captures_iter(source) {
        let name = caps.get(1).or_else(|| caps.get(2));
        if let Some(m) = name {
            found = Some(m.as_str().to_string());
        }
    }
    found
}
