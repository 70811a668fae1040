//! LLM Gateway port
//!
//! Defines the interface for communicating with the LLM provider: an
//! opaque token stream for conversation turns and a structured-output
//! stream for code generation.
//!
//! Both streams are delivered through handles wrapping an
//! `mpsc::Receiver`, the lazy-sequence abstraction used throughout this
//! codebase in place of async generators.

use appforge_domain::ChatMessage;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Malformed upstream event: {0}")]
    MalformedEvent(String),

    #[error("Timeout")]
    Timeout,

    #[error("Transport closed")]
    TransportClosed,
}

/// An event in a streaming conversation turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A text token from the model, forwarded verbatim to the caller.
    Delta(String),
    /// The model invoked a tool. Arguments arrive fully assembled.
    ToolInvocation {
        name: String,
        args: serde_json::Value,
    },
    /// The model finished the turn (terminal).
    Completed,
    /// Upstream failure (terminal).
    Error(String),
}

impl ChatEvent {
    /// Returns true if this event signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::Completed | ChatEvent::Error(_))
    }
}

/// A cumulative snapshot from the structured code-generation stream.
///
/// The upstream service delivers whole-so-far snapshots, not deltas: each
/// update's `code` replaces the previous one entirely. Consumers must diff
/// or replace their buffer, never concatenate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationUpdate {
    /// The complete code generated so far.
    pub code: String,
    /// App name, once the model has produced it.
    pub app_name: Option<String>,
    /// App description, once the model has produced it.
    pub app_description: Option<String>,
}

/// Handle for receiving chat stream events.
pub struct ChatStreamHandle {
    pub receiver: mpsc::Receiver<ChatEvent>,
}

impl ChatStreamHandle {
    pub fn new(receiver: mpsc::Receiver<ChatEvent>) -> Self {
        Self { receiver }
    }

    /// Receive the next event, or `None` once the channel closes.
    pub async fn next(&mut self) -> Option<ChatEvent> {
        self.receiver.recv().await
    }
}

/// Handle for receiving cumulative generation snapshots.
///
/// The stream ends when the channel closes; an `Err` item is terminal.
pub struct GenerationStreamHandle {
    pub receiver: mpsc::Receiver<Result<GenerationUpdate, GatewayError>>,
}

impl GenerationStreamHandle {
    pub fn new(receiver: mpsc::Receiver<Result<GenerationUpdate, GatewayError>>) -> Self {
        Self { receiver }
    }

    pub async fn next(&mut self) -> Option<Result<GenerationUpdate, GatewayError>> {
        self.receiver.recv().await
    }
}

/// Gateway for LLM communication
///
/// Implementations must honor the cancellation token passed to
/// `stream_generation` by terminating the upstream request and closing the
/// channel promptly once it fires.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Open a token stream for one conversation turn.
    async fn stream_chat(&self, messages: &[ChatMessage])
    -> Result<ChatStreamHandle, GatewayError>;

    /// Open a structured-output stream producing cumulative code snapshots.
    async fn stream_generation(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        cancel: CancellationToken,
    ) -> Result<GenerationStreamHandle, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_event_terminality() {
        assert!(ChatEvent::Completed.is_terminal());
        assert!(ChatEvent::Error("x".into()).is_terminal());
        assert!(!ChatEvent::Delta("hi".into()).is_terminal());
        assert!(
            !ChatEvent::ToolInvocation {
                name: "create_app".into(),
                args: serde_json::json!({}),
            }
            .is_terminal()
        );
    }

    #[tokio::test]
    async fn test_handles_drain_channel() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(ChatEvent::Delta("a".into())).await.unwrap();
        tx.send(ChatEvent::Completed).await.unwrap();
        drop(tx);

        let mut handle = ChatStreamHandle::new(rx);
        assert_eq!(handle.next().await, Some(ChatEvent::Delta("a".into())));
        assert_eq!(handle.next().await, Some(ChatEvent::Completed));
        assert_eq!(handle.next().await, None);
    }
}
