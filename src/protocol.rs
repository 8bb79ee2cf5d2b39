//! Sandbox ↔ parent message protocol.
//!
//! The execution host runs isolated: its only way of affecting the parent is
//! a structured message. Exactly two shapes exist — an error report and a
//! navigation report — and nothing else is ever defined. The channel is a
//! typed event bus (std mpsc) standing in for the browser's postMessage
//! boundary.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};

/// Structured runtime/compile error reported from the sandboxed document.
/// At most one active report is retained by the parent at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewErrorReport {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl PreviewErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        PreviewErrorReport {
            message: message.into(),
            source: None,
            line: None,
            column: None,
            stack: None,
        }
    }
}

/// The two message shapes the sandbox may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SandboxMessage {
    PreviewError(PreviewErrorReport),
    PreviewNavigation { path: String },
}

/// Sandbox-side handle: emit-only.
#[derive(Debug, Clone)]
pub struct SandboxPort {
    sender: Sender<SandboxMessage>,
}

impl SandboxPort {
    pub fn report_error(&self, report: PreviewErrorReport) {
        // A closed parent just drops the report; the sandbox never fails
        // because nobody is listening.
        let _ = self.sender.send(SandboxMessage::PreviewError(report));
    }

    pub fn report_navigation(&self, path: impl Into<String>) {
        let _ = self
            .sender
            .send(SandboxMessage::PreviewNavigation { path: path.into() });
    }
}

/// Parent-side handle: receive-only.
#[derive(Debug)]
pub struct ParentPort {
    receiver: Receiver<SandboxMessage>,
}

impl ParentPort {
    /// Drain every message currently queued, in arrival order.
    pub fn drain(&self) -> Vec<SandboxMessage> {
        self.receiver.try_iter().collect()
    }
}

/// Create a connected sandbox/parent port pair.
pub fn message_channel() -> (SandboxPort, ParentPort) {
    let (sender, receiver) = channel();
    (SandboxPort { sender }, ParentPort { receiver })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_two_message_shapes_serialize() {
        let err = SandboxMessage::PreviewError(PreviewErrorReport::new("Foo is not defined"));
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"type\":\"preview-error\""));

        let nav = SandboxMessage::PreviewNavigation {
            path: "/about".to_string(),
        };
        let json = serde_json::to_string(&nav).unwrap();
        assert!(json.contains("\"type\":\"preview-navigation\""));
        assert!(json.contains("\"path\":\"/about\""));
    }

    #[test]
    fn test_channel_round_trip_in_order() {
        let (sandbox, parent) = message_channel();
        sandbox.report_navigation("/cart");
        sandbox.report_error(PreviewErrorReport::new("boom"));

        let messages = parent.drain();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], SandboxMessage::PreviewNavigation { .. }));
        assert!(matches!(messages[1], SandboxMessage::PreviewError(_)));
    }

    #[test]
    fn test_optional_fields_omitted() {
        let report = PreviewErrorReport::new("x");
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, "{\"message\":\"x\"}");
    }
}
