//! Domain error types for tool streaming.
//!
//! The taxonomy determines caller behavior:
//!
//! | Variant | Retryable? | Description |
//! |---------|-----------|-------------|
//! | `Validation` | No (fix input first) | Bad arguments, caught before any frame |
//! | `ToolNotFound` | No | Unknown tool name — programming error |
//! | `AdmissionRejected` | Yes (after backoff) | Concurrency budget exhausted |
//! | `Timeout` | Yes | Generation exceeded its wall-clock budget |
//! | `Aborted` | No | Cooperative cancellation — clean terminal state |
//! | `Upstream` | No | LLM or network failure mid-stream |
//! | `Persistence` | No | Version store failure, reported not retried |

use thiserror::Error;

/// Errors surfaced by the tool streaming subsystem.
#[derive(Error, Debug, Clone)]
pub enum ToolStreamError {
    #[error("Invalid arguments for tool '{tool}': {message}")]
    Validation { tool: String, message: String },

    #[error("Tool \"{0}\" not found")]
    ToolNotFound(String),

    #[error("Too many concurrent tool executions ({active} active, max {max})")]
    AdmissionRejected { active: usize, max: usize },

    #[error("Tool execution timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Tool execution aborted by caller")]
    Aborted,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl ToolStreamError {
    /// Whether the caller may retry the same call after backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ToolStreamError::AdmissionRejected { .. } | ToolStreamError::Timeout { .. }
        )
    }

    /// Check if this error represents a cooperative cancellation.
    pub fn is_aborted(&self) -> bool {
        matches!(self, ToolStreamError::Aborted)
    }
}
