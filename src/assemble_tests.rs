#[cfg(test)]
mod tests {
    use crate::assemble::{assemble_plain_document, build_preview_html};
    use crate::bundle::SourceBundle;
    use crate::theme::ThemeColors;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn single(source: &str) -> SourceBundle {
        SourceBundle::Single(source.to_string())
    }

    #[test]
    fn test_document_is_self_contained() {
        let html = build_preview_html(
            &single("export default function App() { return <div>hi</div>; }"),
            None,
        );
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("react@18.3.1/umd/react.production.min.js"));
        assert!(html.contains("react-dom@18.3.1"));
        assert!(html.contains("@babel/standalone@7.24.7"));
        assert!(html.contains("cdn.tailwindcss.com/3.4.5"));
        assert!(html.contains("<div id=\"root\"></div>"));
        assert!(html.contains("window.__RYZE_SOURCE__ ="));
    }

    #[test]
    fn test_assembly_is_byte_identical() {
        let bundle = single("export default function App() { return <div/>; }");
        let theme = ThemeColors::default();
        let first = build_preview_html(&bundle, Some(&theme));
        let second = build_preview_html(&bundle, Some(&theme));
        assert_eq!(first, second);
    }

    #[test]
    fn test_theme_css_present_when_supplied() {
        let bundle = single("export default function App() { return <div/>; }");
        let theme = ThemeColors::default();
        let html = build_preview_html(&bundle, Some(&theme));
        assert!(html.contains(".bg-primary { background-color: #6366f1; }"));
        assert!(html.contains(".text-surface"));

        let plain = build_preview_html(&bundle, None);
        assert!(!plain.contains(".bg-primary"));
    }

    #[test]
    fn test_animation_keyframes_always_present() {
        let html = build_preview_html(
            &single("export default function App() { return <div/>; }"),
            None,
        );
        assert!(html.contains("@keyframes fade-in"));
        assert!(html.contains(".animate-slide-up"));
    }

    #[test]
    fn test_undeclared_title_predeclared_in_payload() {
        let html = build_preview_html(
            &single("export default function Foo() { return <h1>{title}</h1>; }"),
            None,
        );
        // The safety-net declaration travels inside the embedded source
        // string, JSON-escaped.
        assert!(html.contains("var title = \\\"Sample Title\\\";"));
    }

    #[test]
    fn test_declared_title_not_predeclared() {
        let html = build_preview_html(
            &single("const title = 'Mine';\nexport default function Foo() { return <h1>{title}</h1>; }"),
            None,
        );
        assert!(!html.contains("Sample Title"));
    }

    #[test]
    fn test_bare_default_export_resolves_via_binding() {
        let html = build_preview_html(
            &single("export default class { render() { return null; } }"),
            None,
        );
        assert!(html.contains("const __DefaultExport__ = class {"));
        // The binding heads the resolution chain.
        let binding_probe = html.find("typeof __DefaultExport__ !== 'undefined'").unwrap();
        let app_probe = html.find("typeof App !== 'undefined'").unwrap();
        assert!(binding_probe < app_probe);
    }

    #[test]
    fn test_detected_name_precedes_conventional_names() {
        let html = build_preview_html(
            &single("export default function Storefront() { return <div/>; }"),
            None,
        );
        let detected = html.find("typeof Storefront !== 'undefined'").unwrap();
        let app = html.find("typeof App !== 'undefined'").unwrap();
        assert!(detected < app);
    }

    #[test]
    fn test_fallback_chain_has_no_duplicate_probe() {
        // Detected name IS "App": the conventional candidate must not be
        // probed twice.
        let html = build_preview_html(
            &single("export default function App() { return <div/>; }"),
            None,
        );
        assert_eq!(html.matches("typeof App !== 'undefined'").count(), 1);
    }

    #[test]
    fn test_placeholder_when_nothing_resolves() {
        let html = build_preview_html(&single("const helper = () => 42;"), None);
        assert!(html.contains("No root component found"));
        assert!(html.contains("ryze-placeholder"));
    }

    #[test]
    fn test_instrumentation_and_stubs_injected() {
        let html = build_preview_html(
            &single("export default function App() { return <div/>; }"),
            None,
        );
        assert!(html.contains("__ryzeReportError__"));
        assert!(html.contains("__ryzeReportNavigation__"));
        assert!(html.contains("'preview-error'"));
        assert!(html.contains("'preview-navigation'"));
        assert!(html.contains("window.BrowserRouter"));
        assert!(html.contains("window.motion"));
        assert!(html.contains("window.axios"));
        // In-document fallback compile pass.
        assert!(html.contains("aggressiveStrip"));
    }

    #[test]
    fn test_script_close_sequence_neutralized() {
        let html = build_preview_html(
            &single("export default function App() { return <div>{'</script>'}</div>; }"),
            None,
        );
        // The payload may not contain a literal close-tag sequence outside
        // the assembler's own markup.
        assert!(!html.contains("{'</script>'}"));
        assert!(html.contains("<\\/script>"));
    }

    #[test]
    fn test_json_bundle_renders_plain_document() {
        let payload = "{ \"name\": \"shop\", \"private\": true }";
        let html = build_preview_html(&single(payload), None);
        assert!(html.contains("<pre>"));
        assert!(html.contains("&quot;name&quot;"));
        assert!(!html.contains("Babel.transform"));
    }

    #[test]
    fn test_plain_document_escapes_markup() {
        let html = assemble_plain_document("<script>alert(1)</script> & \"x\"");
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; &quot;x&quot;"));
    }

    #[test]
    fn test_multi_file_bundle_assembles() {
        let mut files = BTreeMap::new();
        files.insert(
            "App.tsx".to_string(),
            "import { Card } from './components/Card';\nexport default function App() { return <Card />; }".to_string(),
        );
        files.insert(
            "components/Card.tsx".to_string(),
            "export const Card = () => <div>card</div>;".to_string(),
        );
        let html = build_preview_html(&SourceBundle::Files(files), None);
        // Both bodies present, no stub emitted for the locally declared Card.
        assert!(html.contains("card"));
        assert!(!html.contains("const Card = ({ children"));
    }

    #[test]
    fn test_dependency_default_export_cannot_claim_mount() {
        let mut files = BTreeMap::new();
        files.insert(
            "App.tsx".to_string(),
            "export default function App() { return <Card />; }".to_string(),
        );
        files.insert(
            "components/Card.tsx".to_string(),
            "const Card = () => <div>card</div>;\nexport default Card;".to_string(),
        );
        let html = build_preview_html(&SourceBundle::Files(files), None);
        // The dependency's default export must not grab the mount binding;
        // the entry component is what the fallback chain finds.
        assert!(!html.contains("__DefaultExport__ = Card"));
        assert!(html.contains("function App()"));
    }
}
