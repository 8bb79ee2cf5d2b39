//! Auto-repair loop.
//!
//! When the preview reports an error while nothing is generating, the parent
//! composes a targeted fix request and redispatches it to the generation
//! API — bounded by an attempt ceiling and an 8-second debounce so in-flight
//! file writes settle first.
//!
//! Duplicate-dispatch protection is an explicit finite-state guard
//! (idle / debouncing / dispatching), not ad hoc flags, so the
//! single-flight and attempt-ceiling invariants are independently testable.
//! Guards are re-checked synchronously when the debounce timer fires to
//! close the timer-race window.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::protocol::PreviewErrorReport;

/// Debounce window before a repair dispatch, milliseconds.
pub const REPAIR_DEBOUNCE_MS: u64 = 8_000;

/// Automatic repair attempts allowed per preview session. Reset only when
/// the user — never the loop itself — starts a generation.
pub const MAX_AUTO_FIX_ATTEMPTS: u32 = 3;

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSIS
// ═══════════════════════════════════════════════════════════════════════════════

/// Best-effort error-category hint, matched against the raw error string.
/// This is a hinting layer, not a classifier: unknown categories still
/// dispatch, just without a hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "category")]
pub enum Diagnosis {
    UndefinedSymbol { symbol: String },
    SyntaxError,
    NullPropertyAccess,
}

impl Diagnosis {
    /// Hint text included in the fix request.
    pub fn hint(&self) -> String {
        match self {
            Diagnosis::UndefinedSymbol { symbol } => format!(
                "'{}' is referenced but never defined. Define it, import nothing (imports are stubbed), or remove the reference.",
                symbol
            ),
            Diagnosis::SyntaxError => {
                "The code has a syntax error. Check for unclosed JSX tags, braces, or stray TypeScript syntax.".to_string()
            }
            Diagnosis::NullPropertyAccess => {
                "A property is read from undefined/null. Guard the access or initialize the value before use.".to_string()
            }
        }
    }
}

/// Match the raw error message against the known categories, in order.
pub fn diagnose(message: &str) -> Option<Diagnosis> {
    lazy_static! {
        static ref NOT_DEFINED_RE: Regex =
            Regex::new(r"([A-Za-z_$][\w$]*) is not defined").unwrap();
        static ref SYNTAX_RE: Regex =
            Regex::new(r"(?i)syntax\s?error|unexpected token|unexpected end of input").unwrap();
        static ref NULL_ACCESS_RE: Regex =
            Regex::new(r"(?i)cannot read propert(?:y|ies) of (?:undefined|null)").unwrap();
    }
    if let Some(caps) = NOT_DEFINED_RE.captures(message) {
        return Some(Diagnosis::UndefinedSymbol {
            symbol: caps[1].to_string(),
        });
    }
    if SYNTAX_RE.is_match(message) {
        return Some(Diagnosis::SyntaxError);
    }
    if NULL_ACCESS_RE.is_match(message) {
        return Some(Diagnosis::NullPropertyAccess);
    }
    None
}

/// A contentless generic error carries nothing the model could act on; no
/// repair is attempted for it.
pub fn is_actionable(report: &PreviewErrorReport) -> bool {
    let message = report.message.trim();
    !message.is_empty() && message != "Script error." && message != "Unknown error"
}

// ═══════════════════════════════════════════════════════════════════════════════
// FIX REQUEST COMPOSITION
// ═══════════════════════════════════════════════════════════════════════════════

/// The constrained repair request handed to the generation API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixRequest {
    pub prompt: String,
    pub error_context: String,
    pub attempt: u32,
}

/// Compose the fix request: error detail, category hint, the full current
/// file listing, and the explicit only-corrected-files instruction.
pub fn compose_fix_request(
    report: &PreviewErrorReport,
    files: &BTreeMap<String, String>,
    attempt: u32,
) -> FixRequest {
    let mut error_context = format!("Preview error: {}", report.message);
    if let Some(source) = &report.source {
        error_context.push_str(&format!("\nFile: {}", source));
    }
    if let (Some(line), Some(column)) = (report.line, report.column) {
        error_context.push_str(&format!("\nLocation: line {}, column {}", line, column));
    }
    if let Some(stack) = &report.stack {
        error_context.push_str(&format!("\nStack: {}", stack));
    }
    if let Some(diagnosis) = diagnose(&report.message) {
        error_context.push_str(&format!("\nDiagnosis: {}", diagnosis.hint()));
    }

    let mut prompt = String::new();
    prompt.push_str("The live preview failed with the error below. Fix it.\n\n");
    prompt.push_str(&error_context);
    prompt.push_str("\n\nCurrent project files:\n");
    for (path, body) in files {
        prompt.push_str(&format!("\n// {}\n{}\n", path, body));
    }
    prompt.push_str(
        "\nReturn ONLY the corrected file(s), each at its original size. Do not regenerate the whole project, do not add files, do not shorten existing files.\n",
    );

    FixRequest {
        prompt,
        error_context,
        attempt,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GUARD STATE MACHINE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairState {
    Idle,
    /// Error observed; dispatch fires when the deadline passes.
    Debouncing { deadline_ms: u64 },
    /// A repair generation is outstanding.
    Dispatching,
}

/// Per-preview-session repair guard. Callers own the clock: `observe_error`
/// and `tick` take the current timestamp; nothing in here sleeps.
#[derive(Debug)]
pub struct RepairGuard {
    state: RepairState,
    attempts: u32,
    pending: Option<PreviewErrorReport>,
}

impl Default for RepairGuard {
    fn default() -> Self {
        RepairGuard::new()
    }
}

impl RepairGuard {
    pub fn new() -> Self {
        RepairGuard {
            state: RepairState::Idle,
            attempts: 0,
            pending: None,
        }
    }

    pub fn state(&self) -> RepairState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// An error report arrived. Starts the debounce window when the guard is
    /// idle, actionable content exists, and the ceiling is not hit. Reports
    /// arriving while already debouncing or dispatching are dropped — the
    /// retained report is the single source of truth.
    pub fn observe_error(&mut self, report: &PreviewErrorReport, now_ms: u64) {
        if self.state != RepairState::Idle {
            return;
        }
        if !is_actionable(report) || self.attempts >= MAX_AUTO_FIX_ATTEMPTS {
            return;
        }
        self.pending = Some(report.clone());
        self.state = RepairState::Debouncing {
            deadline_ms: now_ms + REPAIR_DEBOUNCE_MS,
        };
    }

    /// Advance the clock. Returns the fix request exactly once, when the
    /// debounce deadline has passed and every guard still holds — the
    /// re-check catches generations that started while the timer ran.
    pub fn tick(
        &mut self,
        now_ms: u64,
        generation_in_flight: bool,
        files: &BTreeMap<String, String>,
    ) -> Option<FixRequest> {
        let RepairState::Debouncing { deadline_ms } = self.state else {
            return None;
        };
        if now_ms < deadline_ms {
            return None;
        }
        if generation_in_flight {
            // A user generation won the race; stand down and let its result
            // replace the erroring source.
            self.state = RepairState::Idle;
            self.pending = None;
            return None;
        }
        let report = self.pending.take()?;
        if self.attempts >= MAX_AUTO_FIX_ATTEMPTS {
            self.state = RepairState::Idle;
            return None;
        }
        self.attempts += 1;
        self.state = RepairState::Dispatching;
        Some(compose_fix_request(&report, files, self.attempts))
    }

    /// The source changed under the pending report: the report it debounces
    /// no longer describes the current code, so the window is abandoned. A
    /// dispatch already in flight is left alone; its result is handled like
    /// any other generation.
    pub fn source_changed(&mut self) {
        if matches!(self.state, RepairState::Debouncing { .. }) {
            self.state = RepairState::Idle;
            self.pending = None;
        }
    }

    /// The outstanding repair generation finished (success or failure).
    pub fn dispatch_finished(&mut self) {
        if self.state == RepairState::Dispatching {
            self.state = RepairState::Idle;
        }
    }

    /// The user started a generation: the ceiling resets and any pending
    /// repair is abandoned.
    pub fn reset_for_user_generation(&mut self) {
        self.state = RepairState::Idle;
        self.attempts = 0;
        self.pending = None;
    }
}
