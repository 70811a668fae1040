//! Tool stream protocol frames.
//!
//! [`ToolStreamFrame`] is the wire contract consumed by the UI. The `type`
//! discriminator values are fixed: `tool-call-streaming-start`,
//! `tool-call-delta`, `tool-call`, `tool-result`.
//!
//! Ordering invariants per call id:
//! - exactly one `tool-call-streaming-start` precedes any delta
//! - exactly one terminal frame (`tool-result`) ends the sequence
//! - no frame for a call id is observed after its terminal frame

use serde::{Deserialize, Serialize};

/// One discrete protocol message in a tool call's lazy frame sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ToolStreamFrame {
    /// A call's execution has begun. Emitted synthetically by the registry
    /// before the tool's own logic runs, so consumers can render a
    /// "beginning" state with zero latency.
    #[serde(rename = "tool-call-streaming-start")]
    StreamStart {
        tool_call_id: String,
        tool_name: String,
    },

    /// Partial content for a streaming call.
    #[serde(rename = "tool-call-delta")]
    Delta {
        tool_call_id: String,
        args_text_delta: String,
    },

    /// A complete call request — used when arguments arrive atomically
    /// rather than incrementally.
    #[serde(rename = "tool-call")]
    Call {
        tool_call_id: String,
        tool_name: String,
        args: serde_json::Value,
    },

    /// The final structured result; terminal for the call.
    #[serde(rename = "tool-result")]
    Result {
        tool_call_id: String,
        result: serde_json::Value,
    },
}

impl ToolStreamFrame {
    /// Build a stream-start frame.
    pub fn stream_start(tool_call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self::StreamStart {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
        }
    }

    /// Build a delta frame carrying partial content.
    pub fn delta(tool_call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Delta {
            tool_call_id: tool_call_id.into(),
            args_text_delta: text.into(),
        }
    }

    /// Build a terminal result frame.
    pub fn result(tool_call_id: impl Into<String>, result: serde_json::Value) -> Self {
        Self::Result {
            tool_call_id: tool_call_id.into(),
            result,
        }
    }

    /// Build a terminal result frame carrying an aborted indicator, so
    /// downstream consumers always see a terminal frame on cancellation.
    pub fn aborted_result(tool_call_id: impl Into<String>) -> Self {
        Self::Result {
            tool_call_id: tool_call_id.into(),
            result: serde_json::json!({ "error": "Stream aborted" }),
        }
    }

    /// The call id this frame belongs to.
    pub fn tool_call_id(&self) -> &str {
        match self {
            Self::StreamStart { tool_call_id, .. }
            | Self::Delta { tool_call_id, .. }
            | Self::Call { tool_call_id, .. }
            | Self::Result { tool_call_id, .. } => tool_call_id,
        }
    }

    /// Returns true if this frame ends the call's sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Result { .. })
    }

    /// Delta text, if this is a delta frame.
    pub fn delta_text(&self) -> Option<&str> {
        match self {
            Self::Delta {
                args_text_delta, ..
            } => Some(args_text_delta),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_discriminators() {
        let start = ToolStreamFrame::stream_start("call-1", "create_app");
        let json = serde_json::to_value(&start).unwrap();
        assert_eq!(json["type"], "tool-call-streaming-start");
        assert_eq!(json["tool_call_id"], "call-1");
        assert_eq!(json["tool_name"], "create_app");

        let delta = ToolStreamFrame::delta("call-1", "import streamlit");
        let json = serde_json::to_value(&delta).unwrap();
        assert_eq!(json["type"], "tool-call-delta");
        assert_eq!(json["args_text_delta"], "import streamlit");

        let result = ToolStreamFrame::result("call-1", serde_json::json!({"code": "x = 1"}));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "tool-result");

        let call = ToolStreamFrame::Call {
            tool_call_id: "call-1".to_string(),
            tool_name: "echo".to_string(),
            args: serde_json::json!({"text": "hi"}),
        };
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["type"], "tool-call");
    }

    #[test]
    fn test_roundtrip() {
        let frame = ToolStreamFrame::delta("c", "chunk");
        let text = serde_json::to_string(&frame).unwrap();
        let back: ToolStreamFrame = serde_json::from_str(&text).unwrap();
        assert_eq!(frame, back);
    }

    #[test]
    fn test_terminality() {
        assert!(!ToolStreamFrame::stream_start("c", "t").is_terminal());
        assert!(!ToolStreamFrame::delta("c", "x").is_terminal());
        assert!(ToolStreamFrame::result("c", serde_json::json!(null)).is_terminal());
        assert!(ToolStreamFrame::aborted_result("c").is_terminal());
    }

    #[test]
    fn test_aborted_result_carries_indicator() {
        let frame = ToolStreamFrame::aborted_result("c");
        match frame {
            ToolStreamFrame::Result { result, .. } => {
                assert_eq!(result["error"], "Stream aborted");
            }
            _ => panic!("expected result frame"),
        }
    }

    #[test]
    fn test_call_id_accessor() {
        assert_eq!(ToolStreamFrame::delta("abc", "x").tool_call_id(), "abc");
        assert_eq!(ToolStreamFrame::delta("abc", "x").delta_text(), Some("x"));
        assert_eq!(
            ToolStreamFrame::stream_start("abc", "t").delta_text(),
            None
        );
    }
}
