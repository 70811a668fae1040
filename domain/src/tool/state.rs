//! Per-call execution state.
//!
//! One [`ToolCallState`] exists per in-flight invocation, keyed by call id.
//! It is created when a call begins, mutated only by the owning tool's
//! execution path via [`StateUpdate`] merges, and removed when the call
//! terminates — never persisted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle status of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Starting,
    Streaming,
    Complete,
    Error,
}

/// Transient state for one in-flight tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallState {
    /// Opaque token identifying this call's frame lifecycle
    pub tool_call_id: String,
    /// Name of the tool being executed
    pub tool_name: String,
    /// Snapshot of the arguments the call started with
    pub args: serde_json::Value,
    /// Current lifecycle status
    pub status: CallStatus,
    /// Optional progress percentage (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Optional free-form metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Error description when status is `Error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Partial update merged into a [`ToolCallState`].
///
/// `None` fields leave the current value untouched.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub status: Option<CallStatus>,
    pub args: Option<serde_json::Value>,
    pub progress: Option<u8>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    pub error: Option<String>,
}

impl ToolCallState {
    /// Create a fresh state entry with status `Starting`.
    pub fn starting(tool_call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            args: serde_json::Value::Null,
            status: CallStatus::Starting,
            progress: None,
            metadata: HashMap::new(),
            error: None,
        }
    }

    /// Merge a partial update into this state.
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(args) = update.args {
            self.args = args;
        }
        if let Some(progress) = update.progress {
            self.progress = Some(progress);
        }
        if let Some(metadata) = update.metadata {
            self.metadata.extend(metadata);
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
    }

    /// Whether the call has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, CallStatus::Complete | CallStatus::Error)
    }
}

impl StateUpdate {
    pub fn status(status: CallStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        self.args = Some(args);
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
