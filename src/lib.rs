//! # RyzeCanvas Preview Native Core
//!
//! The live-preview compiler/sandbox pipeline: AI-generated, possibly
//! malformed TypeScript/JSX goes in; one self-contained, executable HTML
//! document comes out, with defensive stubbing, error interception, and a
//! bounded auto-repair loop around it.
//!
//! ## Pipeline Invariants
//!
//! 1. **Normalizer never fails**: stripping is best-effort; residue is the
//!    fallback compile pass's problem, never a hard error.
//! 2. **Merge order**: layout-named dependency files first (stable), then
//!    remaining dependencies, then the entry file last; only the entry's
//!    default export can claim the mount binding.
//! 3. **No shadowing**: a stub or safety-net declaration is never emitted
//!    for a name the user's source declares itself.
//! 4. **Deterministic assembly**: identical source + theme produce a
//!    byte-identical document. No timestamps, no random ids.
//! 5. **Two message shapes**: the sandbox reaches its parent only through
//!    `preview-error` and `preview-navigation`; nothing else crosses.
//! 6. **Repair is bounded**: at most 3 automatic attempts per session,
//!    8-second debounce, guards re-checked at fire time, counter reset only
//!    by user-initiated generations.
//! 7. **Streaming suppression**: error reports arriving while a generation
//!    streams are transient false positives and are dropped.

pub mod assemble;
pub mod bundle;
pub mod generation;
pub mod host;
pub mod icons;
pub mod normalize;
pub mod protocol;
pub mod repair;
pub mod session;
pub mod store;
pub mod stubs;
pub mod theme;

#[cfg(test)]
mod assemble_tests;
#[cfg(test)]
mod merge_tests;
#[cfg(test)]
mod repair_tests;

pub use assemble::{assemble_plain_document, build_preview_html};
pub use bundle::{merge, MergeOutcome, MergedSource, SourceBundle};
pub use generation::{GenerationApi, GenerationEvent, GenerationRequest, SingleFlight};
pub use host::{ExecutionHost, HostPhase, SourceCompiler};
pub use normalize::{aggressive_strip, normalize};
pub use protocol::{message_channel, PreviewErrorReport, SandboxMessage};
pub use repair::{diagnose, Diagnosis, FixRequest, RepairGuard};
pub use session::PreviewSession;
pub use store::{LocalCache, ProjectStore};
pub use stubs::{plan_stubs, StubPlan, SymbolKind};
pub use theme::ThemeColors;
