//! Echo tool
//!
//! Streams its input back as paced delta frames. Used by the CLI demo
//! path and as the simplest end-to-end exercise of the frame protocol.

use appforge_domain::{ToolDefinition, ToolParameter};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::streaming::{
    CallTracker, FrameStream, StreamingTool, stream_chunked, DEFAULT_CHUNK_SIZE,
    DEFAULT_MIN_INTERVAL,
};

pub struct EchoTool {
    definition: ToolDefinition,
    tracker: Arc<CallTracker>,
    chunk_size: usize,
    min_interval: Duration,
}

impl EchoTool {
    pub fn new(tracker: Arc<CallTracker>) -> Self {
        Self {
            definition: ToolDefinition::new("echo", "Streams the given text back verbatim")
                .with_parameter(ToolParameter::new("text", "Text to echo", true)),
            tracker,
            chunk_size: DEFAULT_CHUNK_SIZE,
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }

    pub fn with_pacing(mut self, chunk_size: usize, min_interval: Duration) -> Self {
        self.chunk_size = chunk_size;
        self.min_interval = min_interval;
        self
    }
}

impl StreamingTool for EchoTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    fn stream_execution(
        &self,
        call_id: &str,
        args: serde_json::Value,
        cancel: CancellationToken,
    ) -> FrameStream {
        let (sink, stream) = FrameStream::channel(call_id, 32);
        let tracker = self.tracker.clone();
        let chunk_size = self.chunk_size;
        let min_interval = self.min_interval;
        let text = args["text"].as_str().unwrap_or_default().to_string();

        tokio::spawn(async move {
            let completed =
                stream_chunked(&sink, &tracker, "echo", &text, chunk_size, min_interval, &cancel)
                    .await;
            if completed {
                sink.result(json!({ "echoed": text, "length": text.len() }))
                    .await;
            }
        });

        stream
    }
}
