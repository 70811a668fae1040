//! Multiplexed agent output events.
//!
//! One conversational turn produces a single outbound stream in which
//! assistant text and tool protocol frames interleave. [`AgentEvent`] tags
//! each item so a consumer can tell the two channels apart and reconstruct
//! per-call frame order from the frame's call id.

use crate::tool::frame::ToolStreamFrame;
use serde::{Deserialize, Serialize};

/// An event on the agent's multiplexed output channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AgentEvent {
    /// A verbatim assistant text token.
    AssistantDelta { text: String },

    /// A tool protocol frame, forwarded unchanged from the registry.
    Tool { frame: ToolStreamFrame },

    /// A tool call failed. Partial progress already streamed for the call
    /// remains valid; the turn continues.
    ToolError {
        tool_call_id: String,
        message: String,
    },

    /// Persisting the tool result failed. The already-delivered code result
    /// remains valid; this is informational.
    PersistenceError { message: String },

    /// The turn completed. Carries the version id when a tool result was
    /// persisted during the turn.
    Completed { version_id: Option<String> },

    /// The turn failed after any partial progress already streamed.
    Error { message: String },
}

impl AgentEvent {
    pub fn assistant_delta(text: impl Into<String>) -> Self {
        Self::AssistantDelta { text: text.into() }
    }

    pub fn tool(frame: ToolStreamFrame) -> Self {
        Self::Tool { frame }
    }

    /// Returns true if this event ends the turn's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Error { .. })
    }
}
