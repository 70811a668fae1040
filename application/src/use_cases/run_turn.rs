//! One conversational turn, end to end.
//!
//! [`RunTurnUseCase`] drives the model's token stream, dispatches tool
//! invocations through the [`ToolRegistry`], and multiplexes assistant
//! text and tool protocol frames into a single outbound
//! [`AgentEvent`] channel. Tool forwarding runs in its own task per call,
//! so a slow tool never blocks assistant text and frames from concurrent
//! calls interleave freely; per-call frame order is preserved by the
//! call's own channel.
//!
//! When a tool's terminal result parses as a [`GeneratedApp`] the artifact
//! is persisted through the version store. Persistence failure is
//! surfaced as a `PersistenceError` event and does not invalidate the
//! already-delivered code result.

use appforge_domain::{AgentEvent, ChatMessage, GeneratedApp, Role, ToolStreamFrame};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ports::app_store::AppVersionStore;
use crate::ports::llm_gateway::{ChatEvent, LlmGateway};
use crate::tools::registry::ToolRegistry;

static CALL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Input for one turn.
#[derive(Debug, Clone)]
pub struct TurnInput {
    /// Conversation the turn (and any persisted artifact) belongs to.
    pub conversation_id: String,
    /// Full message history, newest last.
    pub messages: Vec<ChatMessage>,
}

impl TurnInput {
    /// The most recent user message, used as the persistence prompt.
    fn prompt(&self) -> String {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

pub struct RunTurnUseCase<G: LlmGateway> {
    gateway: Arc<G>,
    registry: Arc<ToolRegistry>,
    store: Arc<dyn AppVersionStore>,
}

impl<G: LlmGateway> RunTurnUseCase<G> {
    pub fn new(gateway: Arc<G>, registry: Arc<ToolRegistry>, store: Arc<dyn AppVersionStore>) -> Self {
        Self {
            gateway,
            registry,
            store,
        }
    }

    /// Drive one turn, emitting [`AgentEvent`]s on `output` until a
    /// terminal `Completed` or `Error` event.
    pub async fn execute(&self, input: TurnInput, output: mpsc::Sender<AgentEvent>) {
        let prompt = input.prompt();

        let mut chat = match self.gateway.stream_chat(&input.messages).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "failed to open chat stream");
                let _ = output
                    .send(AgentEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                return;
            }
        };

        let mut forwarders: Vec<JoinHandle<Option<String>>> = Vec::new();
        let mut failure: Option<String> = None;

        while let Some(event) = chat.next().await {
            match event {
                ChatEvent::Delta(text) => {
                    if output.send(AgentEvent::assistant_delta(text)).await.is_err() {
                        debug!("turn consumer gone, stopping");
                        return;
                    }
                }
                ChatEvent::ToolInvocation { name, args } => {
                    let call_id = next_call_id();
                    info!(call_id = %call_id, tool = %name, "dispatching tool invocation");
                    match self.registry.stream_tool_execution(&call_id, &name, args) {
                        Ok(stream) => {
                            forwarders.push(self.spawn_forwarder(
                                stream,
                                call_id,
                                input.conversation_id.clone(),
                                prompt.clone(),
                                output.clone(),
                            ));
                        }
                        Err(e) => {
                            warn!(call_id = %call_id, tool = %name, error = %e, "tool dispatch failed");
                            if output
                                .send(AgentEvent::ToolError {
                                    tool_call_id: call_id,
                                    message: e.to_string(),
                                })
                                .await
                                .is_err()
                            {
                                return;
                            }
                        }
                    }
                }
                ChatEvent::Completed => break,
                ChatEvent::Error(message) => {
                    failure = Some(message);
                    break;
                }
            }
        }

        // Let in-flight tool calls finish before the terminal event.
        let mut version_id = None;
        for forwarder in forwarders {
            if let Ok(Some(id)) = forwarder.await {
                version_id = Some(id);
            }
        }

        let terminal = match failure {
            Some(message) => AgentEvent::Error { message },
            None => AgentEvent::Completed { version_id },
        };
        let _ = output.send(terminal).await;
    }

    /// Forward one tool call's frames onto the turn channel; persist the
    /// artifact when the terminal result carries one.
    fn spawn_forwarder(
        &self,
        mut stream: crate::tools::streaming::FrameStream,
        call_id: String,
        conversation_id: String,
        prompt: String,
        output: mpsc::Sender<AgentEvent>,
    ) -> JoinHandle<Option<String>> {
        let store = self.store.clone();
        tokio::spawn(async move {
            let mut artifact: Option<GeneratedApp> = None;

            while let Some(item) = stream.next().await {
                match item {
                    Ok(frame) => {
                        if let ToolStreamFrame::Result { result, .. } = &frame {
                            // Non-artifact results (echo, aborted) simply
                            // skip persistence.
                            artifact = serde_json::from_value(result.clone()).ok();
                        }
                        if output.send(AgentEvent::tool(frame)).await.is_err() {
                            return None;
                        }
                    }
                    Err(e) => {
                        warn!(call_id = %call_id, error = %e, "tool call failed");
                        let _ = output
                            .send(AgentEvent::ToolError {
                                tool_call_id: call_id.clone(),
                                message: e.to_string(),
                            })
                            .await;
                        return None;
                    }
                }
            }

            let artifact = artifact?;
            match store.save_version(&conversation_id, &artifact, &prompt).await {
                Ok(version) => {
                    info!(
                        call_id = %call_id,
                        version_id = %version.version_id,
                        version_number = version.version_number,
                        "artifact persisted"
                    );
                    Some(version.version_id)
                }
                Err(e) => {
                    warn!(call_id = %call_id, error = %e, "artifact persistence failed");
                    let _ = output
                        .send(AgentEvent::PersistenceError {
                            message: e.to_string(),
                        })
                        .await;
                    None
                }
            }
        })
    }
}

/// Generate a process-unique call id.
fn next_call_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let seq = CALL_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("call-{}-{}", millis, seq)
}
