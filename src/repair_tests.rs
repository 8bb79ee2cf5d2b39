#[cfg(test)]
mod tests {
    use crate::bundle::SourceBundle;
    use crate::protocol::{PreviewErrorReport, SandboxMessage};
    use crate::repair::{
        compose_fix_request, diagnose, is_actionable, Diagnosis, RepairGuard, RepairState,
        MAX_AUTO_FIX_ATTEMPTS, REPAIR_DEBOUNCE_MS,
    };
    use crate::session::PreviewSession;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn report(message: &str) -> PreviewErrorReport {
        PreviewErrorReport {
            message: message.to_string(),
            source: None,
            line: None,
            column: None,
            stack: None,
        }
    }

    fn files() -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(
            "App.tsx".to_string(),
            "function App() { return <div>{Foo}</div>; }".to_string(),
        );
        map
    }

    // ───────────────────────────────────────────────────────────────────────
    // Diagnosis
    // ───────────────────────────────────────────────────────────────────────

    #[test]
    fn test_diagnose_undefined_symbol() {
        assert_eq!(
            diagnose("Foo is not defined"),
            Some(Diagnosis::UndefinedSymbol {
                symbol: "Foo".to_string()
            })
        );
    }

    #[test]
    fn test_diagnose_syntax_and_null_access() {
        assert_eq!(
            diagnose("SyntaxError: Unexpected token (3:14)"),
            Some(Diagnosis::SyntaxError)
        );
        assert_eq!(
            diagnose("Cannot read properties of undefined (reading 'map')"),
            Some(Diagnosis::NullPropertyAccess)
        );
        assert_eq!(diagnose("something exotic went wrong"), None);
    }

    #[test]
    fn test_contentless_errors_not_actionable() {
        assert!(!is_actionable(&report("")));
        assert!(!is_actionable(&report("Script error.")));
        assert!(!is_actionable(&report("Unknown error")));
        assert!(is_actionable(&report("Foo is not defined")));
    }

    #[test]
    fn test_fix_request_carries_context_and_constraint() {
        let mut rep = report("Foo is not defined");
        rep.source = Some("preview.tsx".to_string());
        rep.line = Some(3);
        rep.column = Some(14);
        let request = compose_fix_request(&rep, &files(), 1);

        assert!(request.error_context.contains("Foo is not defined"));
        assert!(request.error_context.contains("line 3, column 14"));
        assert!(request.error_context.contains("referenced but never defined"));
        assert!(request.prompt.contains("// App.tsx"));
        assert!(request.prompt.contains("original size"));
        assert_eq!(request.attempt, 1);
    }

    // ───────────────────────────────────────────────────────────────────────
    // Guard state machine
    // ───────────────────────────────────────────────────────────────────────

    #[test]
    fn test_dispatch_after_debounce_exactly_once() {
        let mut guard = RepairGuard::new();
        guard.observe_error(&report("Foo is not defined"), 1_000);
        assert!(matches!(guard.state(), RepairState::Debouncing { .. }));

        // Before the deadline: nothing.
        assert!(guard.tick(1_000 + REPAIR_DEBOUNCE_MS - 1, false, &files()).is_none());
        // At the deadline: one dispatch, attempt 1.
        let request = guard.tick(1_000 + REPAIR_DEBOUNCE_MS, false, &files()).unwrap();
        assert_eq!(request.attempt, 1);
        assert_eq!(guard.state(), RepairState::Dispatching);
        // Subsequent ticks never re-fire.
        assert!(guard.tick(1_000 + REPAIR_DEBOUNCE_MS + 500, false, &files()).is_none());
    }

    #[test]
    fn test_errors_during_outstanding_dispatch_dropped() {
        let mut guard = RepairGuard::new();
        guard.observe_error(&report("Foo is not defined"), 0);
        guard.tick(REPAIR_DEBOUNCE_MS, false, &files()).unwrap();

        // The repair is outstanding; new reports must not queue a second one.
        guard.observe_error(&report("Bar is not defined"), REPAIR_DEBOUNCE_MS + 100);
        assert!(guard.tick(3 * REPAIR_DEBOUNCE_MS, false, &files()).is_none());
        assert_eq!(guard.attempts(), 1);
    }

    #[test]
    fn test_attempt_ceiling_holds() {
        let mut guard = RepairGuard::new();
        let mut now = 0;
        for attempt in 1..=MAX_AUTO_FIX_ATTEMPTS {
            guard.observe_error(&report("Foo is not defined"), now);
            now += REPAIR_DEBOUNCE_MS;
            let request = guard.tick(now, false, &files()).unwrap();
            assert_eq!(request.attempt, attempt);
            guard.dispatch_finished();
        }
        // Fourth error: ceiling hit, the guard never even debounces.
        guard.observe_error(&report("Foo is not defined"), now);
        assert_eq!(guard.state(), RepairState::Idle);
        assert!(guard.tick(now + 2 * REPAIR_DEBOUNCE_MS, false, &files()).is_none());
    }

    #[test]
    fn test_user_generation_resets_ceiling() {
        let mut guard = RepairGuard::new();
        for _ in 0..MAX_AUTO_FIX_ATTEMPTS {
            guard.observe_error(&report("Foo is not defined"), 0);
            guard.tick(REPAIR_DEBOUNCE_MS, false, &files()).unwrap();
            guard.dispatch_finished();
        }
        guard.reset_for_user_generation();
        assert_eq!(guard.attempts(), 0);

        guard.observe_error(&report("Foo is not defined"), 0);
        assert!(guard.tick(REPAIR_DEBOUNCE_MS, false, &files()).is_some());
    }

    #[test]
    fn test_fire_time_recheck_stands_down_for_inflight_generation() {
        let mut guard = RepairGuard::new();
        guard.observe_error(&report("Foo is not defined"), 0);
        // A user generation started while the timer ran: no dispatch, no
        // attempt consumed, and the pending report is abandoned.
        assert!(guard.tick(REPAIR_DEBOUNCE_MS, true, &files()).is_none());
        assert_eq!(guard.state(), RepairState::Idle);
        assert_eq!(guard.attempts(), 0);
        assert!(guard.tick(2 * REPAIR_DEBOUNCE_MS, false, &files()).is_none());
    }

    #[test]
    fn test_source_change_abandons_debouncing_repair() {
        let mut guard = RepairGuard::new();
        guard.observe_error(&report("Foo is not defined"), 0);
        assert!(matches!(guard.state(), RepairState::Debouncing { .. }));

        guard.source_changed();
        assert_eq!(guard.state(), RepairState::Idle);
        assert_eq!(guard.attempts(), 0);
        // Even well past the old deadline, the stale report never fires.
        assert!(guard.tick(2 * REPAIR_DEBOUNCE_MS, false, &files()).is_none());
    }

    #[test]
    fn test_source_change_leaves_outstanding_dispatch_alone() {
        let mut guard = RepairGuard::new();
        guard.observe_error(&report("Foo is not defined"), 0);
        guard.tick(REPAIR_DEBOUNCE_MS, false, &files()).unwrap();

        guard.source_changed();
        assert_eq!(guard.state(), RepairState::Dispatching);
        assert_eq!(guard.attempts(), 1);
    }

    #[test]
    fn test_unactionable_error_never_debounces() {
        let mut guard = RepairGuard::new();
        guard.observe_error(&report("Script error."), 0);
        assert_eq!(guard.state(), RepairState::Idle);
    }

    // ───────────────────────────────────────────────────────────────────────
    // Session wiring
    // ───────────────────────────────────────────────────────────────────────

    fn erroring_source() -> SourceBundle {
        SourceBundle::Single("export default function App() { return <div>{Foo}</div>; }".to_string())
    }

    #[test]
    fn test_session_rebuilds_after_quiescence() {
        let mut session = PreviewSession::new();
        session.update_source(erroring_source(), 0);
        assert!(session.tick(200).rebuilt_html.is_none());
        // Another edit restarts the window.
        session.update_source(erroring_source(), 300);
        assert!(session.tick(500).rebuilt_html.is_none());
        let outcome = session.tick(700);
        assert!(outcome.rebuilt_html.unwrap().starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_session_error_flow_produces_single_fix_request() {
        let mut session = PreviewSession::new();
        session.update_source(erroring_source(), 0);
        session.tick(500);

        session.handle_message(
            SandboxMessage::PreviewError(report("Foo is not defined")),
            1_000,
        );
        assert!(session.error().is_some());

        assert!(session.tick(1_000 + REPAIR_DEBOUNCE_MS - 1).fix_request.is_none());
        let outcome = session.tick(1_000 + REPAIR_DEBOUNCE_MS);
        let request = outcome.fix_request.unwrap();
        assert_eq!(request.attempt, 1);
        assert!(request.prompt.contains("// App.tsx"));
        // No duplicate while the dispatch is outstanding.
        assert!(session.tick(2_000 + REPAIR_DEBOUNCE_MS).fix_request.is_none());
    }

    #[test]
    fn test_session_drops_errors_while_streaming() {
        let mut session = PreviewSession::new();
        session.update_source(erroring_source(), 0);
        let _handle = session.begin_user_generation();
        assert!(session.is_streaming());

        session.handle_message(
            SandboxMessage::PreviewError(report("Foo is not defined")),
            1_000,
        );
        // Transient false positive: neither retained nor debounced.
        assert!(session.error().is_none());
        assert!(session.tick(1_000 + 2 * REPAIR_DEBOUNCE_MS).fix_request.is_none());
    }

    #[test]
    fn test_session_source_update_clears_retained_error() {
        let mut session = PreviewSession::new();
        session.update_source(erroring_source(), 0);
        session.handle_message(
            SandboxMessage::PreviewError(report("Foo is not defined")),
            500,
        );
        assert!(session.error().is_some());

        session.update_source(erroring_source(), 600);
        assert!(session.error().is_none());
    }

    #[test]
    fn test_session_edit_during_debounce_cancels_repair() {
        let mut session = PreviewSession::new();
        session.update_source(erroring_source(), 0);
        session.handle_message(
            SandboxMessage::PreviewError(report("Foo is not defined")),
            1_000,
        );

        // A manual edit lands mid-debounce: the report described old source,
        // so no repair may dispatch for it.
        session.update_source(erroring_source(), 2_000);
        assert!(session
            .tick(1_000 + 2 * REPAIR_DEBOUNCE_MS)
            .fix_request
            .is_none());
        assert_eq!(session.repair_attempts(), 0);
    }

    #[test]
    fn test_session_user_generation_resets_attempts_repair_does_not() {
        let mut session = PreviewSession::new();
        session.update_source(erroring_source(), 0);

        session.handle_message(SandboxMessage::PreviewError(report("Foo is not defined")), 0);
        session.tick(REPAIR_DEBOUNCE_MS).fix_request.unwrap();
        assert_eq!(session.repair_attempts(), 1);

        // Repair-initiated generation keeps the counter.
        let _handle = session.begin_repair_generation();
        session.generation_finished(None, REPAIR_DEBOUNCE_MS + 100);
        assert_eq!(session.repair_attempts(), 1);

        // User-initiated generation resets it.
        let _handle = session.begin_user_generation();
        assert_eq!(session.repair_attempts(), 0);
    }

    #[test]
    fn test_session_cancel_leaves_clean_state() {
        let mut session = PreviewSession::new();
        session.update_source(erroring_source(), 0);
        let handle = session.begin_user_generation();
        session.cancel_generation();

        assert!(handle.is_cancelled());
        assert!(!session.is_streaming());
        // Post-cancel errors flow normally again.
        session.handle_message(SandboxMessage::PreviewError(report("Foo is not defined")), 0);
        assert!(session.error().is_some());
    }

    #[test]
    fn test_session_navigation_updates_path() {
        let mut session = PreviewSession::new();
        session.handle_message(
            SandboxMessage::PreviewNavigation {
                path: "/products/3".to_string(),
            },
            0,
        );
        assert_eq!(session.current_path(), "/products/3");
    }
}
