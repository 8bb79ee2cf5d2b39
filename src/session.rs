//! Preview session orchestration (parent side).
//!
//! One `PreviewSession` per open project. It owns the pieces the UI shell
//! must never get wrong on its own: the debounced document rebuild, the
//! single retained error report (cleared on source change, ignored while a
//! generation streams), the single-flight generation slot, and the repair
//! guard with its user-only counter reset.
//!
//! Everything is timestamp-driven; the shell calls `tick` from its event
//! loop and acts on what comes back.

use std::collections::BTreeMap;

use crate::assemble::build_preview_html;
use crate::bundle::SourceBundle;
use crate::generation::{GenerationHandle, SingleFlight};
use crate::protocol::{PreviewErrorReport, SandboxMessage};
use crate::repair::{FixRequest, RepairGuard};
use crate::theme::ThemeColors;

/// Quiescent window for coalescing source updates into one rebuild, ms.
pub const REBUILD_DEBOUNCE_MS: u64 = 400;

/// What a `tick` produced for the shell to act on.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Freshly assembled preview document, when the rebuild window elapsed.
    pub rebuilt_html: Option<String>,
    /// Repair dispatch to send to the generation API, at most one.
    pub fix_request: Option<FixRequest>,
}

pub struct PreviewSession {
    bundle: Option<SourceBundle>,
    theme: Option<ThemeColors>,
    rebuild_window_ms: u64,
    rebuild_deadline_ms: Option<u64>,
    error: Option<PreviewErrorReport>,
    current_path: String,
    streaming: bool,
    flight: SingleFlight,
    repair: RepairGuard,
}

impl PreviewSession {
    pub fn new() -> Self {
        Self::with_rebuild_window(REBUILD_DEBOUNCE_MS)
    }

    pub fn with_rebuild_window(rebuild_window_ms: u64) -> Self {
        PreviewSession {
            bundle: None,
            theme: None,
            rebuild_window_ms,
            rebuild_deadline_ms: None,
            error: None,
            current_path: "/".to_string(),
            streaming: false,
            flight: SingleFlight::new(),
            repair: RepairGuard::new(),
        }
    }

    pub fn set_theme(&mut self, theme: Option<ThemeColors>, now_ms: u64) {
        self.theme = theme;
        if self.bundle.is_some() {
            self.rebuild_deadline_ms = Some(now_ms + self.rebuild_window_ms);
        }
    }

    /// New source arrived (streamed file update, manual edit, repair
    /// result). Restarts the rebuild window, clears the retained error, and
    /// abandons any repair still debouncing — both described source that no
    /// longer exists.
    pub fn update_source(&mut self, bundle: SourceBundle, now_ms: u64) {
        self.bundle = Some(bundle);
        self.error = None;
        self.repair.source_changed();
        self.rebuild_deadline_ms = Some(now_ms + self.rebuild_window_ms);
    }

    /// The single retained error report, if any.
    pub fn error(&self) -> Option<&PreviewErrorReport> {
        self.error.as_ref()
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn repair_attempts(&self) -> u32 {
        self.repair.attempts()
    }

    // ───────────────────────────────────────────────────────────────────────
    // Generation lifecycle
    // ───────────────────────────────────────────────────────────────────────

    /// User-initiated generation: cancels any in-flight one (single-flight),
    /// resets the repair attempt ceiling, and opens the streaming window
    /// during which error reports are treated as transient.
    pub fn begin_user_generation(&mut self) -> GenerationHandle {
        self.repair.reset_for_user_generation();
        self.streaming = true;
        self.flight.begin()
    }

    /// Repair-initiated generation: same single-flight slot, but the
    /// attempt counter is NOT reset.
    pub fn begin_repair_generation(&mut self) -> GenerationHandle {
        self.streaming = true;
        self.flight.begin()
    }

    /// Stream finished. New files (if any) flow through `update_source`.
    pub fn generation_finished(
        &mut self,
        files: Option<BTreeMap<String, String>>,
        now_ms: u64,
    ) {
        self.streaming = false;
        self.flight.finish();
        self.repair.dispatch_finished();
        if let Some(files) = files {
            self.update_source(SourceBundle::Files(files), now_ms);
        }
    }

    /// User aborted the stream: stop updates and leave no stale
    /// repair/streaming state behind.
    pub fn cancel_generation(&mut self) {
        self.flight.abort();
        self.streaming = false;
        self.repair.dispatch_finished();
    }

    // ───────────────────────────────────────────────────────────────────────
    // Sandbox messages
    // ───────────────────────────────────────────────────────────────────────

    /// Handle one message from the sandboxed document.
    pub fn handle_message(&mut self, message: SandboxMessage, now_ms: u64) {
        match message {
            SandboxMessage::PreviewError(report) => {
                if self.streaming {
                    // Partial source during streaming produces expected
                    // false positives; drop them.
                    return;
                }
                self.repair.observe_error(&report, now_ms);
                self.error = Some(report);
            }
            SandboxMessage::PreviewNavigation { path } => {
                self.current_path = path;
            }
        }
    }

    // ───────────────────────────────────────────────────────────────────────
    // Clock
    // ───────────────────────────────────────────────────────────────────────

    /// Advance timers: emits a rebuilt document when the quiescent window
    /// elapsed, and at most one repair dispatch when its guards hold.
    pub fn tick(&mut self, now_ms: u64) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        if let Some(deadline) = self.rebuild_deadline_ms {
            if now_ms >= deadline {
                self.rebuild_deadline_ms = None;
                if let Some(bundle) = &self.bundle {
                    outcome.rebuilt_html = Some(build_preview_html(bundle, self.theme.as_ref()));
                }
            }
        }

        let files = self.file_map();
        outcome.fix_request = self.repair.tick(now_ms, self.flight.in_flight(), &files);

        outcome
    }

    /// Current sources as a path → content map, for fix-request listings.
    fn file_map(&self) -> BTreeMap<String, String> {
        match &self.bundle {
            Some(SourceBundle::Files(map)) => map.clone(),
            Some(SourceBundle::Single(code)) => {
                let mut map = BTreeMap::new();
                map.insert("App.tsx".to_string(), code.clone());
                map
            }
            None => BTreeMap::new(),
        }
    }
}

impl Default for PreviewSession {
    fn default() -> Self {
        PreviewSession::new()
    }
}
