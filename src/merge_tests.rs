#[cfg(test)]
mod tests {
    use crate::bundle::{
        is_non_ui_content, merge, resolve_entry, split_inline_markers, MergeOutcome, SourceBundle,
    };
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn files(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn expect_component(outcome: MergeOutcome) -> (String, String) {
        match outcome {
            MergeOutcome::Component(merged) => (merged.code, merged.entry_path),
            MergeOutcome::Json(_) => panic!("expected component outcome"),
        }
    }

    #[test]
    fn test_single_component_passes_through() {
        let source = "export default function App() { return <div />; }";
        let (code, entry) = expect_component(merge(&SourceBundle::Single(source.to_string())));
        assert_eq!(code, source);
        assert_eq!(entry, "App.tsx");
    }

    #[test]
    fn test_entry_priority_prefers_src_app() {
        let map = files(&[
            ("index.tsx", "export default function Main() {}"),
            ("src/App.tsx", "export default function App() {}"),
            ("App.tsx", "export default function App() {}"),
        ]);
        assert_eq!(resolve_entry(&map), "src/App.tsx");
    }

    #[test]
    fn test_entry_falls_back_to_default_export_heuristic() {
        let map = files(&[
            ("components/Card.tsx", "export function Card() {}"),
            ("shop.tsx", "export default function Home() { return <div />; }"),
        ]);
        assert_eq!(resolve_entry(&map), "shop.tsx");
    }

    #[test]
    fn test_dependencies_precede_entry_layout_first() {
        let map = files(&[
            ("App.tsx", "export default function App() { return <Shell />; }"),
            ("components/Card.tsx", "export const Card = () => <div>card</div>;"),
            ("components/Layout.tsx", "export const Shell = () => <main />;"),
        ]);
        let (code, entry) = expect_component(merge(&SourceBundle::Files(map)));
        assert_eq!(entry, "App.tsx");

        let layout_at = code.find("Shell = () =>").unwrap();
        let card_at = code.find("Card = () =>").unwrap();
        let entry_at = code.find("function App()").unwrap();
        assert!(layout_at < card_at, "layout file must come first");
        assert!(card_at < entry_at, "entry body must come last");
    }

    #[test]
    fn test_framework_plumbing_files_excluded() {
        let map = files(&[
            ("App.tsx", "export default function App() { return <Card />; }"),
            ("main.tsx", "import App from './App'; createRoot(document.getElementById('root')).render(<App />);"),
            ("router.tsx", "export const routes = [];"),
            ("components/Card.tsx", "export const Card = () => <div />;"),
        ]);
        let (code, _) = expect_component(merge(&SourceBundle::Files(map)));
        assert!(!code.contains("createRoot"));
        assert!(!code.contains("routes = []"));
        assert!(code.contains("Card = () =>"));
    }

    #[test]
    fn test_non_component_extensions_excluded() {
        let map = files(&[
            ("App.tsx", "export default function App() { return <div />; }"),
            ("styles.css", ".card { color: red; }"),
            ("types.ts", "export interface Product { id: number; }"),
        ]);
        let (code, _) = expect_component(merge(&SourceBundle::Files(map)));
        assert!(!code.contains(".card"));
        assert!(!code.contains("interface Product"));
    }

    #[test]
    fn test_inline_markers_split_into_files() {
        let source = "// src/components/Card.tsx\nexport const Card = () => <div />;\n// src/App.tsx\nexport default function App() { return <Card />; }";
        let map = split_inline_markers(source).unwrap();
        assert_eq!(map.len(), 2);
        assert!(map["src/components/Card.tsx"].contains("const Card"));
        assert!(map["src/App.tsx"].contains("function App"));
    }

    #[test]
    fn test_single_marker_is_not_a_bundle() {
        let source = "// App.tsx\nexport default function App() { return <div />; }";
        assert!(split_inline_markers(source).is_none());
    }

    #[test]
    fn test_merge_routes_inline_marker_bundle() {
        let source = "// components/Layout.tsx\nexport const Shell = () => <main />;\n// App.tsx\nexport default function App() { return <Shell />; }";
        let (code, entry) = expect_component(merge(&SourceBundle::Single(source.to_string())));
        assert_eq!(entry, "App.tsx");
        assert!(code.find("Shell").unwrap() < code.find("function App").unwrap());
    }

    #[test]
    fn test_dependency_default_exports_neutralized() {
        let map = files(&[
            ("App.tsx", "export default function App() { return <Card><Badge /></Card>; }"),
            (
                "components/Badge.tsx",
                "export default function Badge() { return <em />; }",
            ),
            (
                "components/Card.tsx",
                "const Card = ({ children }) => <div>{children}</div>;\nexport default Card;",
            ),
        ]);
        let (code, _) = expect_component(merge(&SourceBundle::Files(map)));

        // Only the entry may still claim the default export.
        assert_eq!(code.matches("export default").count(), 1);
        assert!(code.contains("export default function App()"));
        assert!(code.contains("function Badge()"));
        assert!(!code.contains("export default function Badge"));
        assert!(!code.contains("export default Card"));
    }

    #[test]
    fn test_anonymous_dependency_default_export_parked() {
        let map = files(&[
            ("App.tsx", "export default function App() { return <div />; }"),
            ("components/Dot.tsx", "export default () => <i />;"),
        ]);
        let (code, _) = expect_component(merge(&SourceBundle::Files(map)));
        assert!(code.contains("const __DepDefault0__ = () => <i />;"));
        assert!(code.contains("export default function App()"));
    }

    #[test]
    fn test_json_payload_detected() {
        let payload = "{\n  \"name\": \"shop\",\n  \"dependencies\": { \"react\": \"^18\" }\n}";
        assert!(is_non_ui_content(payload));
        match merge(&SourceBundle::Single(payload.to_string())) {
            MergeOutcome::Json(text) => assert_eq!(text, payload),
            MergeOutcome::Component(_) => panic!("JSON must not be compiled"),
        }
    }

    #[test]
    fn test_object_returning_component_is_not_json() {
        // Leading comment then real component: the fingerprint check must
        // see through comments in both directions.
        let source = "// config-ish preamble\nexport default function App() { return <div />; }";
        assert!(!is_non_ui_content(source));
    }

    #[test]
    fn test_array_config_without_fingerprint_is_json() {
        assert!(is_non_ui_content("[\n  { \"id\": 1 },\n  { \"id\": 2 }\n]"));
    }

    #[test]
    fn test_merge_is_deterministic() {
        let map = files(&[
            ("App.tsx", "export default function App() { return <A /><B />; }"),
            ("a.tsx", "export const A = () => <i />;"),
            ("b.tsx", "export const B = () => <i />;"),
        ]);
        let bundle = SourceBundle::Files(map);
        let (first, _) = expect_component(merge(&bundle));
        let (second, _) = expect_component(merge(&bundle));
        assert_eq!(first, second);
        // Equal-rank dependencies keep the bundle's map order.
        assert!(first.find("const A").unwrap() < first.find("const B").unwrap());
    }
}
