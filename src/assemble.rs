//! Document Assembler.
//!
//! Produces the one static HTML string the sandbox executes: pinned CDN
//! runtimes, behavioral stubs for router/animation/http/socket libraries,
//! the normalized user source with its stub prelude and mount epilogue, the
//! component-resolution fallback chain, theme/keyframe CSS, and the
//! instrumentation that forwards structured errors and navigation to the
//! parent. Output is byte-identical for identical inputs; nothing in here
//! reads a clock or generates an id.
//!
//! ## Compile strategy inside the document
//!
//! The embedded bootstrap compiles the payload with the React + TypeScript
//! presets first. If that throws, it applies a harsher textual strip (the
//! JS mirror of `normalize::aggressive_strip`) and retries exactly once.
//! Both failures and mount-time exceptions surface as an in-document banner
//! *and* a structured `preview-error` message — never console output alone.

use crate::bundle::{merge, MergeOutcome, MergedSource, SourceBundle};
use crate::normalize::{detect_component_name, normalize, DEFAULT_EXPORT_BINDING};
use crate::stubs::plan_stubs;
use crate::theme::{animation_css, ThemeColors};

/// Pinned CDN runtimes. Versions are fixed so assembly stays reproducible.
const CDN_SCRIPTS: &str = concat!(
    "<script crossorigin src=\"https://unpkg.com/react@18.3.1/umd/react.production.min.js\"></script>\n",
    "<script crossorigin src=\"https://unpkg.com/react-dom@18.3.1/umd/react-dom.production.min.js\"></script>\n",
    "<script src=\"https://unpkg.com/@babel/standalone@7.24.7/babel.min.js\"></script>\n",
    "<script src=\"https://cdn.tailwindcss.com/3.4.5\"></script>\n",
);

const BASE_CSS: &str = "html, body, #root { margin: 0; min-height: 100vh; }\n\
body { font-family: ui-sans-serif, system-ui, sans-serif; }\n\
.ryze-banner { margin: 16px; padding: 12px 16px; border-radius: 8px; background: #fef2f2; color: #b91c1c; border: 1px solid #fecaca; font: 13px/1.5 ui-monospace, monospace; white-space: pre-wrap; }\n\
.ryze-placeholder { margin: 16px; padding: 12px 16px; border-radius: 8px; background: #f8fafc; color: #475569; border: 1px dashed #cbd5e1; font: 13px/1.5 ui-monospace, monospace; }\n";

/// Error/navigation instrumentation. Every cross-boundary effect goes
/// through `parent.postMessage`; the sandbox never navigates its parent.
const INSTRUMENTATION_JS: &str = r#"(function () {
  window.__ryzeReportError__ = function (message, source, line, column, stack) {
    var report = { type: 'preview-error', message: String(message || 'Unknown error') };
    if (source) report.source = String(source);
    if (typeof line === 'number') report.line = line;
    if (typeof column === 'number') report.column = column;
    if (stack) report.stack = String(stack);
    try { parent.postMessage(report, '*'); } catch (e) {}
  };
  window.__ryzeReportNavigation__ = function (path) {
    try { parent.postMessage({ type: 'preview-navigation', path: String(path) }, '*'); } catch (e) {}
  };
  window.addEventListener('error', function (event) {
    window.__ryzeReportError__(event.message, event.filename, event.lineno, event.colno, event.error && event.error.stack);
  });
  window.addEventListener('unhandledrejection', function (event) {
    var reason = event.reason || {};
    window.__ryzeReportError__(reason.message || String(event.reason), null, null, null, reason.stack);
  });
  document.addEventListener('click', function (event) {
    var anchor = event.target && event.target.closest ? event.target.closest('a') : null;
    if (!anchor) return;
    var href = anchor.getAttribute('href') || '';
    if (href.charAt(0) === '#' || href.charAt(0) === '/') {
      event.preventDefault();
      var path = href.charAt(0) === '#' ? href.slice(1) : href;
      window.location.hash = path;
      window.__ryzeReportNavigation__(path);
    }
  }, true);
})();
"#;

/// Behavioral stubs for the "CDN-provided" library surface: clsx, hash
/// router, animation shim, http/socket clients, minimal form hook. Each is
/// an explicit definition, not a property-intercepting proxy.
const RUNTIME_STUBS_JS: &str = r#"(function () {
  // clsx / cn
  function clsx() {
    var out = [];
    for (var i = 0; i < arguments.length; i++) {
      var arg = arguments[i];
      if (!arg) continue;
      if (typeof arg === 'string') { out.push(arg); }
      else if (Array.isArray(arg)) { out.push(clsx.apply(null, arg)); }
      else if (typeof arg === 'object') {
        for (var key in arg) { if (arg[key]) out.push(key); }
      }
    }
    return out.join(' ');
  }
  window.clsx = clsx;
  window.cn = clsx;

  // Hash-based router: route matching, link interception, programmatic
  // navigation, param/query placeholders.
  function currentPath() {
    var hash = window.location.hash.replace(/^#/, '');
    return hash === '' ? '/' : hash.split('?')[0];
  }
  function matchRoute(pattern, path) {
    if (pattern === '*') return {};
    var p = pattern.split('/').filter(Boolean);
    var s = path.split('/').filter(Boolean);
    if (p.length !== s.length) return null;
    var params = {};
    for (var i = 0; i < p.length; i++) {
      if (p[i].charAt(0) === ':') { params[p[i].slice(1)] = s[i]; }
      else if (p[i] !== s[i]) { return null; }
    }
    return params;
  }
  function useHashPath() {
    var state = React.useState(currentPath());
    React.useEffect(function () {
      var onChange = function () { state[1](currentPath()); };
      window.addEventListener('hashchange', onChange);
      return function () { window.removeEventListener('hashchange', onChange); };
    }, []);
    return state[0];
  }
  window.__ryzeRouteParams__ = {};
  window.BrowserRouter = function (props) { return React.createElement(React.Fragment, null, props.children); };
  window.Routes = function (props) {
    var path = useHashPath();
    var children = React.Children.toArray(props.children);
    for (var i = 0; i < children.length; i++) {
      var route = children[i];
      if (!route.props) continue;
      var params = matchRoute(route.props.path || '*', path);
      if (params) {
        window.__ryzeRouteParams__ = params;
        return route.props.element || null;
      }
    }
    return null;
  };
  window.Route = function () { return null; };
  window.Link = function (props) {
    var to = props.to || '#';
    return React.createElement('a', {
      href: '#' + to,
      className: props.className,
      style: props.style,
      onClick: function (event) {
        event.preventDefault();
        window.location.hash = to;
        window.__ryzeReportNavigation__(to);
        if (props.onClick) props.onClick(event);
      }
    }, props.children);
  };
  window.NavLink = window.Link;
  window.Navigate = function (props) {
    React.useEffect(function () { window.location.hash = props.to || '/'; }, []);
    return null;
  };
  window.Outlet = function () { return null; };
  window.useNavigate = function () {
    return function (to) {
      window.location.hash = typeof to === 'string' ? to : '/';
      window.__ryzeReportNavigation__(typeof to === 'string' ? to : '/');
    };
  };
  window.useParams = function () { return window.__ryzeRouteParams__; };
  window.useLocation = function () {
    var path = useHashPath();
    var hash = window.location.hash.replace(/^#/, '');
    var query = hash.indexOf('?') >= 0 ? hash.slice(hash.indexOf('?')) : '';
    return { pathname: path, search: query, hash: '' };
  };
  window.useSearchParams = function () {
    var loc = window.useLocation();
    return [new URLSearchParams(loc.search), function () {}];
  };

  // Animation shim: strips animation-only props, renders the host element
  // unaffected; the presence wrapper renders children unconditionally.
  var ANIMATION_PROPS = ['initial', 'animate', 'exit', 'transition', 'whileHover', 'whileTap', 'whileInView', 'variants', 'layout', 'layoutId', 'drag'];
  function makeMotion(tag) {
    return function (props) {
      var clean = {};
      for (var key in props) {
        if (key === 'children') continue;
        if (ANIMATION_PROPS.indexOf(key) >= 0) continue;
        clean[key] = props[key];
      }
      return React.createElement(tag, clean, props.children);
    };
  }
  var motionTags = ['div', 'span', 'section', 'article', 'header', 'footer', 'main', 'nav', 'aside', 'ul', 'ol', 'li', 'a', 'button', 'img', 'p', 'h1', 'h2', 'h3', 'h4', 'form', 'input', 'label', 'svg', 'path'];
  var motion = {};
  for (var t = 0; t < motionTags.length; t++) { motion[motionTags[t]] = makeMotion(motionTags[t]); }
  window.motion = motion;
  window.AnimatePresence = function (props) { return React.createElement(React.Fragment, null, props.children); };
  window.LazyMotion = window.AnimatePresence;

  // HTTP / socket clients: promise-returning no-ops so calls never throw.
  function noopResponse() { return Promise.resolve({ data: null, status: 200 }); }
  window.axios = {
    get: noopResponse, post: noopResponse, put: noopResponse,
    patch: noopResponse, delete: noopResponse, request: noopResponse,
    create: function () { return window.axios; }
  };
  window.io = function () {
    return { on: function () {}, off: function () {}, emit: function () {}, disconnect: function () {}, connect: function () {} };
  };

  // Minimal form library surface.
  window.useForm = function () {
    return {
      register: function (name) { return { name: name }; },
      handleSubmit: function (fn) { return function (event) { if (event && event.preventDefault) event.preventDefault(); return fn({}); }; },
      watch: function () { return undefined; },
      reset: function () {},
      formState: { errors: {}, isSubmitting: false }
    };
  };
  window.Controller = function (props) { return props.render ? props.render({ field: {} }) : null; };
  window.FormProvider = function (props) { return React.createElement(React.Fragment, null, props.children); };
})();
"#;

/// The in-document compile driver. `__RYZE_SOURCE__` is set just before this
/// runs. Mirrors the host-side two-pass strategy: primary presets, then one
/// aggressive textual strip + retry, then a structured failure report.
const BOOTSTRAP_JS: &str = r#"(function () {
  function aggressiveStrip(src) {
    return src
      .replace(/\)\s*:\s*(?:asserts\s+)?[A-Za-z_$][\w$]*\s+is\s+[^={]+(\{|=>)/g, ') $1')
      .replace(/\)\s*:\s*[^={;()]+(\{|=>)/g, ') $1')
      .replace(/([A-Za-z_$][\w$]*)\s*<(?:[^<>]|<[^<>]*>)*>\s*\(/g, '$1(')
      .replace(/\s+(?:as|satisfies)\s+(?:const\b|\{[^{}]*\}|[A-Za-z_$][\w$.]*(?:<[^<>]*>)?(?:\[\])*)/g, '')
      .replace(/([A-Za-z_$][\w$]*\s*\??)\s*:\s*(?:\{[^{}]*\}|\[[^\[\]]*\]|[A-Za-z_$][\w$.]*(?:<[^<>]*>)?(?:\[\])*)(\s*[,)=;])/g, '$1$2')
      .replace(/([A-Za-z_$][\w$]*)\s*\?\s*([,)])/g, '$1$2');
  }
  function showBanner(text) {
    document.getElementById('root').innerHTML =
      '<div class="ryze-banner">' + text.replace(/&/g, '&amp;').replace(/</g, '&lt;') + '</div>';
  }
  var source = window.__RYZE_SOURCE__ || '';
  var compiled = null;
  try {
    compiled = Babel.transform(source, { presets: ['react', 'typescript'], filename: 'preview.tsx' }).code;
  } catch (primaryError) {
    try {
      compiled = Babel.transform(aggressiveStrip(source), { presets: ['react', 'typescript'], filename: 'preview.tsx' }).code;
    } catch (fallbackError) {
      var message = 'Compile error: ' + (fallbackError.message || String(fallbackError));
      window.__ryzeReportError__(message, 'preview.tsx', null, null, fallbackError.stack);
      showBanner(message);
      return;
    }
  }
  try {
    (0, eval)(compiled);
  } catch (runtimeError) {
    var message = runtimeError.message || String(runtimeError);
    window.__ryzeReportError__(message, 'preview.tsx', null, null, runtimeError.stack);
    showBanner('Runtime error: ' + message);
  }
})();
"#;

// ═══════════════════════════════════════════════════════════════════════════════
// ASSEMBLY
// ═══════════════════════════════════════════════════════════════════════════════

/// Build the full preview document for a bundle. This is the whole pipeline:
/// merge, classify, normalize, stub, assemble.
pub fn build_preview_html(bundle: &SourceBundle, theme: Option<&ThemeColors>) -> String {
    match merge(bundle) {
        MergeOutcome::Json(content) => assemble_plain_document(&content),
        MergeOutcome::Component(merged) => assemble_component_document(&merged, theme),
    }
}

/// Assemble the executable document for merged component source.
pub fn assemble_component_document(merged: &MergedSource, theme: Option<&ThemeColors>) -> String {
    // Import scan runs on the pre-normalization source; normalization strips
    // the imports the scan needs.
    let plan = plan_stubs(&merged.code);
    let normalized = normalize(&merged.code);
    let detected = detect_component_name(&normalized);

    let mut payload = String::new();
    payload.push_str(&plan.render());
    payload.push_str(&normalized);
    payload.push_str("\n\n");
    payload.push_str(&mount_epilogue(detected.as_deref()));

    let theme_css = theme.map(|t| t.utility_css()).unwrap_or_default();

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\" />\n");
    html.push_str(CDN_SCRIPTS);
    html.push_str("<style>\n");
    html.push_str(BASE_CSS);
    html.push_str(&theme_css);
    html.push_str(animation_css());
    html.push_str("</style>\n</head>\n<body>\n<div id=\"root\"></div>\n");
    html.push_str("<script>\n");
    html.push_str(INSTRUMENTATION_JS);
    html.push_str("</script>\n<script>\n");
    html.push_str(RUNTIME_STUBS_JS);
    html.push_str("</script>\n<script>\n");
    html.push_str(&format!(
        "window.__RYZE_SOURCE__ = {};\n",
        embed_js_string(&payload)
    ));
    html.push_str(BOOTSTRAP_JS);
    html.push_str("</script>\n</body>\n</html>\n");
    html
}

/// Plain monospace document for non-UI (JSON/config) content.
pub fn assemble_plain_document(content: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\" />\n<style>\nbody {{ margin: 16px; font: 13px/1.6 ui-monospace, monospace; color: #1e293b; }}\npre {{ white-space: pre-wrap; word-break: break-word; }}\n</style>\n</head>\n<body>\n<pre>{}</pre>\n</body>\n</html>\n",
        escape_html(content)
    )
}

/// Mount epilogue: the component-resolution fallback chain plus the
/// mount-time try/catch, appended to the compiled payload so `const`/`let`
/// bindings stay in scope for the `typeof` probes.
fn mount_epilogue(detected: Option<&str>) -> String {
    let mut chain = format!(
        "  if (typeof {binding} !== 'undefined') {{ __RyzeRoot__ = {binding}; }}\n",
        binding = DEFAULT_EXPORT_BINDING
    );
    let mut seen = vec![DEFAULT_EXPORT_BINDING.to_string()];
    let mut candidates: Vec<&str> = Vec::new();
    if let Some(name) = detected {
        candidates.push(name);
    }
    candidates.extend(["App", "Home", "Page", "Main"]);
    for name in candidates {
        if seen.iter().any(|s| s == name) {
            continue;
        }
        seen.push(name.to_string());
        chain.push_str(&format!(
            "  else if (typeof {name} !== 'undefined') {{ __RyzeRoot__ = {name}; }}\n",
            name = name
        ));
    }

    format!(
        "(function () {{\n\
         try {{\n\
         var __RyzeRoot__ = null;\n\
         {chain}\
         if (__RyzeRoot__) {{\n\
         ReactDOM.createRoot(document.getElementById('root')).render(React.createElement(__RyzeRoot__));\n\
         }} else {{\n\
         document.getElementById('root').innerHTML = '<div class=\"ryze-placeholder\">No root component found</div>';\n\
         window.__ryzeReportError__('No root component found', 'preview.tsx');\n\
         }}\n\
         }} catch (mountError) {{\n\
         window.__ryzeReportError__(mountError.message || String(mountError), 'preview.tsx', null, null, mountError.stack);\n\
         document.getElementById('root').innerHTML = '<div class=\"ryze-banner\">Mount failed: ' + String(mountError.message || mountError).replace(/&/g, '&amp;').replace(/</g, '&lt;') + '</div>';\n\
         }}\n\
         }})();\n",
        chain = chain
    )
}

/// Embed arbitrary source as a JS string literal. JSON escaping covers
/// quotes/newlines; `</` is broken up so the literal can never close the
/// surrounding script tag.
fn embed_js_string(source: &str) -> String {
    serde_json::to_string(source)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\"', "&quot;")
        .replace('\'', "&#39;")
}
