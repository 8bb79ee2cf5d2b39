//! Sandboxed execution host model.
//!
//! Models the per-render lifecycle of the isolated preview document:
//!
//! ```text
//! Assembling → CompilingPrimary → { Success
//!                                 | CompilingFallback → { Success | Failed } }
//! ```
//!
//! The actual JSX compiler sits behind [`SourceCompiler`] — in the browser
//! it is the embedded Babel pipeline; in tests it is a fake. The fallback
//! attempt reapplies [`crate::normalize::aggressive_strip`] and retries
//! exactly once. A `Failed` host reports one structured compile error and
//! never retries within the same document instance. All outward effects go
//! through the sandbox port; nothing else crosses the boundary.

use thiserror::Error;

use crate::normalize::aggressive_strip;
use crate::protocol::{PreviewErrorReport, SandboxPort};

/// Compile failure surfaced by the evaluator behind the seam.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("compile error: {message}")]
pub struct CompileError {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        CompileError {
            message: message.into(),
            line: None,
            column: None,
        }
    }
}

/// The JSX/TS compile seam (browser-side Babel, or a test double).
pub trait SourceCompiler {
    fn compile(&self, source: &str) -> Result<String, CompileError>;
}

impl<F> SourceCompiler for F
where
    F: Fn(&str) -> Result<String, CompileError>,
{
    fn compile(&self, source: &str) -> Result<String, CompileError> {
        self(source)
    }
}

/// Render lifecycle state, one per preview document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    Assembling,
    CompilingPrimary,
    CompilingFallback,
    Success,
    Failed,
}

/// One sandboxed document instance.
pub struct ExecutionHost<C: SourceCompiler> {
    compiler: C,
    port: SandboxPort,
    phase: HostPhase,
}

impl<C: SourceCompiler> ExecutionHost<C> {
    pub fn new(compiler: C, port: SandboxPort) -> Self {
        ExecutionHost {
            compiler,
            port,
            phase: HostPhase::Assembling,
        }
    }

    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    /// Run the two-pass compile. Returns the compiled output on success;
    /// `None` means the host is `Failed` and has already reported the error.
    pub fn compile(&mut self, source: &str) -> Option<String> {
        if self.phase == HostPhase::Failed {
            // No retries within the same document instance.
            return None;
        }

        self.phase = HostPhase::CompilingPrimary;
        let primary = self.compiler.compile(source);
        match primary {
            Ok(code) => {
                self.phase = HostPhase::Success;
                return Some(code);
            }
            Err(_) => {
                self.phase = HostPhase::CompilingFallback;
            }
        }

        // Normalization residue: strip harder, retry once.
        match self.compiler.compile(&aggressive_strip(source)) {
            Ok(code) => {
                self.phase = HostPhase::Success;
                Some(code)
            }
            Err(err) => {
                self.phase = HostPhase::Failed;
                self.port.report_error(PreviewErrorReport {
                    message: format!("Compile error: {}", err.message),
                    source: Some("preview.tsx".to_string()),
                    line: err.line,
                    column: err.column,
                    stack: None,
                });
                None
            }
        }
    }

    /// Record a mount-time exception: reported structurally, eligible for
    /// the auto-repair loop. The document shows its own banner.
    pub fn report_mount_failure(&self, message: impl Into<String>, stack: Option<String>) {
        self.port.report_error(PreviewErrorReport {
            message: message.into(),
            source: Some("preview.tsx".to_string()),
            line: None,
            column: None,
            stack,
        });
    }
}
