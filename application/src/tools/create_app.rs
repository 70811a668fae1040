//! Application code generation tool
//!
//! Streams Python (Streamlit) code for a user query, optionally grounded
//! in an attached data file. The upstream generation service delivers
//! cumulative whole-so-far snapshots; this tool diffs each snapshot
//! against its buffer and emits only the new suffix as paced delta
//! frames, so consumers can concatenate deltas into the final code.
//!
//! The terminal result frame carries a [`GeneratedApp`]: the complete
//! code, the package dependencies scanned from its imports, and the app
//! name and description once the model has produced them.

use appforge_domain::{
    DefaultToolValidator, GeneratedApp, ToolDefinition, ToolParameter, ToolStreamError,
    ToolStreamFrame, ToolValidator,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::streaming::{
    CallTracker, FrameSink, FrameStream, StreamingTool, stream_chunked, DEFAULT_CHUNK_SIZE,
    DEFAULT_MIN_INTERVAL,
};
use crate::ports::llm_gateway::{GenerationUpdate, LlmGateway};

/// Default wall-clock budget for one generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Pacing and timeout knobs for the generation stream.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Maximum bytes per emitted delta frame.
    pub chunk_size: usize,
    /// Minimum interval between emitted chunks.
    pub min_interval: Duration,
    /// Wall-clock budget for the whole generation.
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            min_interval: DEFAULT_MIN_INTERVAL,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

/// Attached data file the generated app should read.
#[derive(Debug, Clone, Deserialize)]
pub struct FileContext {
    pub file_name: String,
    pub file_type: FileType,
    #[serde(default)]
    pub analysis: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Csv,
    Json,
}

impl FileType {
    fn as_upper(&self) -> &'static str {
        match self {
            FileType::Csv => "CSV",
            FileType::Json => "JSON",
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateAppArgs {
    query: String,
    #[serde(default)]
    file_context: Option<FileContext>,
}

pub struct CreateAppTool {
    definition: ToolDefinition,
    gateway: Arc<dyn LlmGateway>,
    tracker: Arc<CallTracker>,
    settings: GenerationSettings,
}

impl CreateAppTool {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        tracker: Arc<CallTracker>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            definition: Self::describe(),
            gateway,
            tracker,
            settings,
        }
    }

    /// The tool's identity and schema, available without constructing the
    /// tool (the gateway advertises it before the tool is wired up).
    pub fn describe() -> ToolDefinition {
        ToolDefinition::new(
            "create_app",
            "Generates Python (Streamlit) code based on a given query and file context",
        )
        .with_parameter(ToolParameter::new(
            "query",
            "Explain the requirements for the app code you want to generate",
            true,
        ))
        .with_parameter(
            ToolParameter::new("file_context", "Attached data file", false).with_type("object"),
        )
    }

    fn system_prompt(file_context: Option<&FileContext>) -> String {
        let mut prompt = String::from(
            "You are a Python code generation assistant specializing in Streamlit apps.\n\
             These are the packages installed where your code will run: \
             [streamlit, pandas, numpy, matplotlib, requests, seaborn, plotly].\n",
        );
        if let Some(ctx) = file_context {
            prompt.push_str(&format!(
                "You are working with a {} file named \"{}\" at path \"/app/{}\".\n\
                 IMPORTANT: Always use the FULL PATH \"/app/{}\" when reading the file.\n\
                 DO NOT use relative paths, always use the absolute path starting with \"/app/\".\n",
                ctx.file_type.as_upper(),
                ctx.file_name,
                ctx.file_name,
                ctx.file_name,
            ));
        }
        prompt.push_str(
            "Generate a complete, runnable Streamlit app based on the given query.\n\
             DO NOT use \"st.experimental_rerun()\" at any cost.\n\
             Only respond with the code, no potential errors, no explanations!",
        );
        prompt
    }

    fn user_prompt(query: &str, file_context: Option<&FileContext>) -> String {
        let mut prompt = query.to_string();
        if let Some(ctx) = file_context {
            prompt.push_str(&format!(
                "\nIMPORTANT: Use the exact file path \"/app/{}\" to read the file.",
                ctx.file_name
            ));
            if let Some(analysis) = &ctx.analysis {
                prompt.push_str(&format!(
                    "\n\nFile Analysis:\n{}",
                    serde_json::to_string_pretty(analysis).unwrap_or_default()
                ));
            }
        }
        prompt
    }
}

impl StreamingTool for CreateAppTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    fn validate_args(&self, args: &serde_json::Value) -> Result<(), ToolStreamError> {
        DefaultToolValidator
            .validate(args, self.definition())
            .map_err(|message| ToolStreamError::Validation {
                tool: self.name().to_string(),
                message,
            })?;

        let parsed: CreateAppArgs =
            serde_json::from_value(args.clone()).map_err(|e| ToolStreamError::Validation {
                tool: self.name().to_string(),
                message: e.to_string(),
            })?;
        if parsed.query.trim().is_empty() {
            return Err(ToolStreamError::Validation {
                tool: self.name().to_string(),
                message: "Query cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    fn stream_execution(
        &self,
        call_id: &str,
        args: serde_json::Value,
        cancel: CancellationToken,
    ) -> FrameStream {
        let (sink, stream) = FrameStream::channel(call_id, 32);
        let gateway = self.gateway.clone();
        let tracker = self.tracker.clone();
        let settings = self.settings.clone();

        tokio::spawn(async move {
            let parsed: CreateAppArgs = match serde_json::from_value(args) {
                Ok(parsed) => parsed,
                Err(e) => {
                    let _ = sink
                        .error(ToolStreamError::Validation {
                            tool: "create_app".to_string(),
                            message: e.to_string(),
                        })
                        .await;
                    return;
                }
            };
            run_generation(gateway, tracker, settings, parsed, sink, cancel).await;
        });

        stream
    }
}

/// Drive one generation: open the upstream stream, diff cumulative
/// snapshots into suffix deltas, and finish with the artifact result.
async fn run_generation(
    gateway: Arc<dyn LlmGateway>,
    tracker: Arc<CallTracker>,
    settings: GenerationSettings,
    args: CreateAppArgs,
    sink: FrameSink,
    cancel: CancellationToken,
) {
    let system = CreateAppTool::system_prompt(args.file_context.as_ref());
    let user = CreateAppTool::user_prompt(&args.query, args.file_context.as_ref());

    // Child token with a drop guard: if this producer exits early for any
    // reason, the upstream request is cancelled with it.
    let upstream = cancel.child_token();
    let _upstream_guard = upstream.clone().drop_guard();

    let mut handle = match gateway.stream_generation(&system, &user, upstream).await {
        Ok(handle) => handle,
        Err(e) => {
            warn!(call_id = %sink.call_id(), error = %e, "generation request failed");
            let _ = sink.error(ToolStreamError::Upstream(e.to_string())).await;
            return;
        }
    };

    let deadline = Instant::now() + settings.timeout;
    let mut buffer = String::new();
    let mut app_name = None;
    let mut app_description = None;

    loop {
        let update = tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                warn!(call_id = %sink.call_id(), "generation timed out");
                let _ = sink
                    .error(ToolStreamError::Timeout {
                        seconds: settings.timeout.as_secs(),
                    })
                    .await;
                return;
            }
            _ = cancel.cancelled() => {
                let _ = sink
                    .send(ToolStreamFrame::aborted_result(sink.call_id()))
                    .await;
                return;
            }
            item = handle.next() => match item {
                None => break,
                Some(Ok(update)) => update,
                Some(Err(e)) => {
                    warn!(call_id = %sink.call_id(), error = %e, "generation stream failed");
                    let _ = sink.error(ToolStreamError::Upstream(e.to_string())).await;
                    return;
                }
            },
        };

        let GenerationUpdate {
            code,
            app_name: name,
            app_description: description,
        } = update;

        if name.is_some() {
            app_name = name;
        }
        if description.is_some() {
            app_description = description;
        }

        let snapshot = strip_code_fences(&code);
        let delta = if let Some(suffix) = snapshot.strip_prefix(buffer.as_str()) {
            suffix.to_string()
        } else {
            // Upstream rewrote earlier output; replace the buffer and
            // re-emit the whole snapshot.
            debug!(call_id = %sink.call_id(), "snapshot is not an extension, re-emitting");
            buffer.clear();
            snapshot.to_string()
        };

        if !delta.is_empty() {
            buffer.push_str(&delta);
            let completed = stream_chunked(
                &sink,
                &tracker,
                "create_app",
                &delta,
                settings.chunk_size,
                settings.min_interval,
                &cancel,
            )
            .await;
            if !completed {
                return;
            }
        }
    }

    if cancel.is_cancelled() {
        let _ = sink
            .send(ToolStreamFrame::aborted_result(sink.call_id()))
            .await;
        return;
    }

    let mut artifact = GeneratedApp::new(buffer);
    if let Some(name) = app_name {
        artifact = artifact.with_name(name);
    }
    if let Some(description) = app_description {
        artifact = artifact.with_description(description);
    }

    match serde_json::to_value(&artifact) {
        Ok(value) => {
            sink.result(value).await;
        }
        Err(e) => {
            let _ = sink.error(ToolStreamError::Upstream(e.to_string())).await;
        }
    }
}

/// Remove markdown code fences the model sometimes wraps around snapshots.
fn strip_code_fences(code: &str) -> &str {
    let code = code
        .strip_prefix("```python\n")
        .or_else(|| code.strip_prefix("```\n"))
        .unwrap_or(code);
    code.strip_suffix("\n```")
        .or_else(|| code.strip_suffix("```"))
        .unwrap_or(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_gateway::{
        ChatStreamHandle, GatewayError, GenerationStreamHandle,
    };
    use appforge_domain::ChatMessage;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::mpsc;

    /// Gateway that replays a fixed snapshot script.
    struct ScriptedGateway {
        updates: Vec<GenerationUpdate>,
        stall: bool,
    }

    impl ScriptedGateway {
        fn new(updates: Vec<GenerationUpdate>) -> Self {
            Self {
                updates,
                stall: false,
            }
        }

        fn stalled() -> Self {
            Self {
                updates: Vec::new(),
                stall: true,
            }
        }
    }

    #[async_trait]
    impl LlmGateway for ScriptedGateway {
        async fn stream_chat(
            &self,
            _messages: &[ChatMessage],
        ) -> Result<ChatStreamHandle, GatewayError> {
            Err(GatewayError::RequestFailed("not scripted".into()))
        }

        async fn stream_generation(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
            cancel: CancellationToken,
        ) -> Result<GenerationStreamHandle, GatewayError> {
            let (tx, rx) = mpsc::channel(8);
            let updates = self.updates.clone();
            let stall = self.stall;
            tokio::spawn(async move {
                if stall {
                    cancel.cancelled().await;
                    return;
                }
                for update in updates {
                    if cancel.is_cancelled() {
                        return;
                    }
                    if tx.send(Ok(update)).await.is_err() {
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            });
            Ok(GenerationStreamHandle::new(rx))
        }
    }

    fn snapshot(code: &str) -> GenerationUpdate {
        GenerationUpdate {
            code: code.to_string(),
            ..Default::default()
        }
    }

    fn fast_settings() -> GenerationSettings {
        GenerationSettings {
            chunk_size: 1024,
            min_interval: Duration::ZERO,
            timeout: Duration::from_secs(5),
        }
    }

    fn tool_with(gateway: ScriptedGateway, settings: GenerationSettings) -> CreateAppTool {
        CreateAppTool::new(Arc::new(gateway), Arc::new(CallTracker::new()), settings)
    }

    #[tokio::test]
    async fn test_cumulative_snapshots_become_suffix_deltas() {
        let gateway = ScriptedGateway::new(vec![
            snapshot("import pandas as pd\n"),
            snapshot("import pandas as pd\nimport streamlit as st\n"),
            GenerationUpdate {
                code: "import pandas as pd\nimport streamlit as st\nst.title(\"Sales\")\n"
                    .to_string(),
                app_name: Some("Sales Dashboard".to_string()),
                app_description: Some("Plots sales".to_string()),
            },
        ]);
        let tool = tool_with(gateway, fast_settings());

        let frames: Vec<_> = tool
            .stream_execution(
                "c1",
                json!({ "query": "build a sales dashboard" }),
                CancellationToken::new(),
            )
            .collect()
            .await
            .into_iter()
            .map(|f| f.unwrap())
            .collect();

        let streamed: String = frames.iter().filter_map(|f| f.delta_text()).collect();
        assert_eq!(
            streamed,
            "import pandas as pd\nimport streamlit as st\nst.title(\"Sales\")\n"
        );

        match frames.last().unwrap() {
            ToolStreamFrame::Result { result, .. } => {
                let artifact: GeneratedApp =
                    serde_json::from_value(result.clone()).unwrap();
                assert_eq!(artifact.code, streamed);
                assert_eq!(artifact.required_libraries, vec!["pandas", "streamlit"]);
                assert_eq!(artifact.app_name, "Sales Dashboard");
                assert_eq!(artifact.app_description, "Plots sales");
            }
            other => panic!("expected result frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_extension_snapshot_replaces_buffer() {
        let gateway = ScriptedGateway::new(vec![
            snapshot("import numpy\n"),
            snapshot("import pandas as pd\n"),
        ]);
        let tool = tool_with(gateway, fast_settings());

        let frames: Vec<_> = tool
            .stream_execution("c1", json!({ "query": "q" }), CancellationToken::new())
            .collect()
            .await
            .into_iter()
            .map(|f| f.unwrap())
            .collect();

        match frames.last().unwrap() {
            ToolStreamFrame::Result { result, .. } => {
                assert_eq!(result["code"], "import pandas as pd\n");
            }
            other => panic!("expected result frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fences_are_stripped() {
        assert_eq!(strip_code_fences("```python\nimport os\n```"), "import os");
        assert_eq!(strip_code_fences("```\nx = 1\n```"), "x = 1");
        assert_eq!(strip_code_fences("plain"), "plain");
        assert_eq!(strip_code_fences("partial```"), "partial");
    }

    #[tokio::test]
    async fn test_timeout_surfaces_retryable_error() {
        let settings = GenerationSettings {
            timeout: Duration::from_millis(50),
            ..fast_settings()
        };
        let tool = tool_with(ScriptedGateway::stalled(), settings);

        let frames = tool
            .stream_execution("c1", json!({ "query": "q" }), CancellationToken::new())
            .collect()
            .await;

        match frames.last().unwrap() {
            Err(e) => {
                assert!(matches!(e, ToolStreamError::Timeout { .. }));
                assert!(e.is_retryable());
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_abort_yields_terminal_aborted_result() {
        let tool = tool_with(ScriptedGateway::stalled(), fast_settings());
        let cancel = CancellationToken::new();

        let mut stream = tool.stream_execution("c1", json!({ "query": "q" }), cancel.clone());
        cancel.cancel();

        let mut last = None;
        while let Some(item) = stream.next().await {
            last = Some(item);
        }
        match last.unwrap() {
            Ok(ToolStreamFrame::Result { result, .. }) => {
                assert_eq!(result["error"], "Stream aborted");
            }
            other => panic!("expected aborted result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_query_fails_validation() {
        let tool = tool_with(ScriptedGateway::new(vec![]), fast_settings());
        let err = tool.validate_args(&json!({ "query": "  " })).unwrap_err();
        match err {
            ToolStreamError::Validation { message, .. } => {
                assert_eq!(message, "Query cannot be empty");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(tool.validate_args(&json!({})).is_err());
    }

    #[tokio::test]
    async fn test_registry_validation_rejects_empty_query() {
        use crate::tools::registry::{RegistryConfig, ToolRegistry};

        let registry = ToolRegistry::new(RegistryConfig::default());
        registry.register(Arc::new(tool_with(
            ScriptedGateway::new(vec![]),
            fast_settings(),
        )));

        let outcome = registry.validate_tool_call("create_app", &json!({ "query": "" }));
        assert!(!outcome.valid);
        let error = outcome.error.unwrap();
        assert!(error.contains("Query cannot be empty"), "error: {}", error);

        let outcome =
            registry.validate_tool_call("create_app", &json!({ "query": "build a dashboard" }));
        assert!(outcome.valid);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_prompts_mention_file_path() {
        let ctx = FileContext {
            file_name: "sales.csv".to_string(),
            file_type: FileType::Csv,
            analysis: Some(json!({ "columns": ["month", "total"] })),
        };
        let system = CreateAppTool::system_prompt(Some(&ctx));
        assert!(system.contains("CSV file named \"sales.csv\""));
        assert!(system.contains("/app/sales.csv"));

        let user = CreateAppTool::user_prompt("plot totals", Some(&ctx));
        assert!(user.starts_with("plot totals"));
        assert!(user.contains("/app/sales.csv"));
        assert!(user.contains("File Analysis"));
    }
}
