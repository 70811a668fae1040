//! HTTP adapter for an Anthropic-style streaming messages API.
//!
//! Both port methods open one streaming POST and hand the response body to
//! a spawned reader task that parses SSE lines and feeds the port's
//! channel handle. `stream_generation` accumulates text deltas into a
//! cumulative whole-so-far snapshot per the port contract.

use appforge_application::ports::llm_gateway::{
    ChatEvent, ChatStreamHandle, GatewayError, GenerationStreamHandle, GenerationUpdate,
    LlmGateway,
};
use appforge_domain::{ChatMessage, Role, ToolDefinition};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::sse::{SseParser, StreamEvent};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Connect/read timeout for opening the stream.
    pub request_timeout: Duration,
}

impl Default for HttpGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            api_key: String::new(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct HttpLlmGateway {
    client: reqwest::Client,
    config: HttpGatewayConfig,
    tools: Vec<serde_json::Value>,
}

impl HttpLlmGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::ConnectionError(e.to_string()))?;
        Ok(Self {
            client,
            config,
            tools: Vec::new(),
        })
    }

    /// Advertise tool schemas so the model can produce tool invocations.
    pub fn with_tools(mut self, definitions: &[ToolDefinition]) -> Self {
        self.tools = definitions.iter().map(tool_schema).collect();
        self
    }

    async fn open_stream(
        &self,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{}/v1/messages", self.config.base_url);
        debug!(url = %url, model = %self.config.model, "opening message stream");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(GatewayError::RequestFailed(format!(
                "{}: {}",
                status,
                appforge_domain::truncate(&detail, 200)
            )));
        }
        Ok(response)
    }

    fn chat_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        let turns: Vec<serde_json::Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                json!({
                    "role": match m.role {
                        Role::Assistant => "assistant",
                        _ => "user",
                    },
                    "content": m.content,
                })
            })
            .collect();

        let mut body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "stream": true,
            "messages": turns,
        });
        if !system.is_empty() {
            body["system"] = json!(system.join("\n"));
        }
        if !self.tools.is_empty() {
            body["tools"] = json!(self.tools);
        }
        body
    }

    fn generation_body(&self, system_prompt: &str, user_prompt: &str) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "stream": true,
            "system": system_prompt,
            "messages": [{ "role": "user", "content": user_prompt }],
        })
    }
}

/// Map a tool definition onto the wire tool schema.
fn tool_schema(definition: &ToolDefinition) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for param in &definition.parameters {
        properties.insert(
            param.name.clone(),
            json!({ "type": param.param_type, "description": param.description }),
        );
        if param.required {
            required.push(param.name.clone());
        }
    }
    json!({
        "name": definition.name,
        "description": definition.description,
        "input_schema": {
            "type": "object",
            "properties": properties,
            "required": required,
        },
    })
}

#[async_trait]
impl LlmGateway for HttpLlmGateway {
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
    ) -> Result<ChatStreamHandle, GatewayError> {
        let response = self.open_stream(self.chat_body(messages)).await?;
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut parser = SseParser::new();
            let mut body = response.bytes_stream();
            let mut tool_name: Option<String> = None;
            let mut tool_input = String::new();

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(error = %e, "chat stream transport error");
                        let _ = tx.send(ChatEvent::Error(e.to_string())).await;
                        return;
                    }
                };
                for event in parser.push(&String::from_utf8_lossy(&chunk)) {
                    match event {
                        StreamEvent::TextDelta(text) => {
                            if tx.send(ChatEvent::Delta(text)).await.is_err() {
                                return;
                            }
                        }
                        StreamEvent::ToolUseStart { name } => {
                            tool_name = Some(name);
                            tool_input.clear();
                        }
                        StreamEvent::ToolInputDelta(fragment) => {
                            tool_input.push_str(&fragment);
                        }
                        StreamEvent::BlockStop => {
                            if let Some(name) = tool_name.take() {
                                let args = serde_json::from_str(&tool_input)
                                    .unwrap_or_else(|_| json!({}));
                                tool_input.clear();
                                if tx
                                    .send(ChatEvent::ToolInvocation { name, args })
                                    .await
                                    .is_err()
                                {
                                    return;
                                }
                            }
                        }
                        StreamEvent::MessageStop => {
                            let _ = tx.send(ChatEvent::Completed).await;
                            return;
                        }
                    }
                }
            }
            // Upstream closed without message_stop.
            let _ = tx.send(ChatEvent::Error("transport closed".to_string())).await;
        });

        Ok(ChatStreamHandle::new(rx))
    }

    async fn stream_generation(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        cancel: CancellationToken,
    ) -> Result<GenerationStreamHandle, GatewayError> {
        let response = self
            .open_stream(self.generation_body(system_prompt, user_prompt))
            .await?;
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut parser = SseParser::new();
            let mut body = response.bytes_stream();
            let mut code = String::new();

            loop {
                let chunk = tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("generation stream cancelled");
                        return;
                    }
                    chunk = body.next() => match chunk {
                        None => return,
                        Some(Ok(chunk)) => chunk,
                        Some(Err(e)) => {
                            warn!(error = %e, "generation stream transport error");
                            let _ = tx
                                .send(Err(GatewayError::ConnectionError(e.to_string())))
                                .await;
                            return;
                        }
                    },
                };

                for event in parser.push(&String::from_utf8_lossy(&chunk)) {
                    match event {
                        StreamEvent::TextDelta(text) => {
                            code.push_str(&text);
                            let update = GenerationUpdate {
                                code: code.clone(),
                                ..Default::default()
                            };
                            if tx.send(Ok(update)).await.is_err() {
                                return;
                            }
                        }
                        StreamEvent::MessageStop => return,
                        _ => {}
                    }
                }
            }
        });

        Ok(GenerationStreamHandle::new(rx))
    }
}
