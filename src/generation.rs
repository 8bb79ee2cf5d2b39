//! Generation API collaborator.
//!
//! Code generation itself is an opaque external streaming service; this
//! module owns the typed request/event contract, the single-flight
//! cancellation rule (starting a new generation cancels the previous one),
//! and the token batcher that bounds UI update frequency during streaming.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default flush cadence for streamed tokens, milliseconds.
pub const TOKEN_FLUSH_CADENCE_MS: u64 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMode {
    Generate,
    Repair,
}

/// One chat turn carried in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
}

/// Request shape accepted by the streaming generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub mode: GenerationMode,
    pub provider: String,
    pub model: String,
    pub conversation_history: Vec<ConversationTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_context: Option<crate::theme::ThemeColors>,
}

/// Terminal metadata delivered with `Done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMeta {
    pub success: bool,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<BTreeMap<String, String>>,
}

/// Typed event sequence emitted by the stream, terminating in `Done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum GenerationEvent {
    Step { label: String },
    Token { text: String },
    Code { code: String },
    Install { package: String },
    FileUpdate { path: String, content: String },
    Todo { text: String, done: bool },
    Command { command: String },
    Error { message: String },
    Done { meta: GenerationMeta },
}

/// Sink the host feeds stream events into.
pub trait GenerationSink {
    fn on_event(&mut self, event: GenerationEvent);
}

/// The external streaming service seam.
pub trait GenerationApi {
    /// Start a streaming generation. Implementations must stop emitting
    /// events once `handle.is_cancelled()`.
    fn dispatch(&self, request: &GenerationRequest, sink: &mut dyn GenerationSink)
        -> GenerationHandle;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SINGLE-FLIGHT CANCELLATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Cancelable handle for one in-flight generation.
#[derive(Debug, Clone, Default)]
pub struct GenerationHandle {
    cancelled: Arc<AtomicBool>,
}

impl GenerationHandle {
    pub fn new() -> Self {
        GenerationHandle::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Enforces single-flight per chat session: taking a new slot cancels the
/// previous handle before the new request is issued.
#[derive(Debug, Default)]
pub struct SingleFlight {
    current: Option<GenerationHandle>,
}

impl SingleFlight {
    pub fn new() -> Self {
        SingleFlight::default()
    }

    /// Cancel whatever is in flight and register a fresh handle.
    pub fn begin(&mut self) -> GenerationHandle {
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }
        let handle = GenerationHandle::new();
        self.current = Some(handle.clone());
        handle
    }

    /// Abort the in-flight generation, leaving no active slot behind.
    pub fn abort(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.cancel();
        }
    }

    pub fn in_flight(&self) -> bool {
        self.current
            .as_ref()
            .map(|h| !h.is_cancelled())
            .unwrap_or(false)
    }

    /// The registered generation completed.
    pub fn finish(&mut self) {
        self.current = None;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN BATCHING
// ═══════════════════════════════════════════════════════════════════════════════

/// Buffers streamed tokens and releases them at a fixed cadence instead of
/// per token, bounding re-render frequency. Timestamp-driven; the caller
/// owns the clock.
#[derive(Debug)]
pub struct TokenBatcher {
    buffer: String,
    cadence_ms: u64,
    last_flush_ms: u64,
}

impl TokenBatcher {
    pub fn new(cadence_ms: u64) -> Self {
        TokenBatcher {
            buffer: String::new(),
            cadence_ms,
            last_flush_ms: 0,
        }
    }

    /// Buffer a token; returns the accumulated batch when the cadence
    /// boundary has passed, `None` otherwise.
    pub fn push(&mut self, token: &str, now_ms: u64) -> Option<String> {
        self.buffer.push_str(token);
        if now_ms.saturating_sub(self.last_flush_ms) >= self.cadence_ms {
            self.last_flush_ms = now_ms;
            return Some(std::mem::take(&mut self.buffer));
        }
        None
    }

    /// Flush whatever is buffered, cadence or not (stream end, cancel).
    pub fn flush(&mut self, now_ms: u64) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        self.last_flush_ms = now_ms;
        Some(std::mem::take(&mut self.buffer))
    }

    /// Drop buffered output without emitting (cancellation).
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
