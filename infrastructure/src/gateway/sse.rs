//! Incremental parser for Anthropic-style server-sent events.
//!
//! Network chunks do not align with line boundaries, so the parser keeps
//! a carry buffer and only interprets complete `data: {...}` lines.

/// A parsed upstream stream event. Unknown event types are dropped.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StreamEvent {
    /// `content_block_delta` with a `text_delta`.
    TextDelta(String),
    /// `content_block_start` opening a `tool_use` block.
    ToolUseStart { name: String },
    /// `content_block_delta` with an `input_json_delta` fragment.
    ToolInputDelta(String),
    /// `content_block_stop`.
    BlockStop,
    /// `message_stop` (terminal).
    MessageStop,
}

#[derive(Default)]
pub(crate) struct SseParser {
    buffer: String,
}

impl SseParser {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed a network chunk, returning the events completed by it.
    pub(crate) fn push(&mut self, chunk: &str) -> Vec<StreamEvent> {
        self.buffer.push_str(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line = self.buffer[..newline].trim_end_matches('\r').to_string();
            self.buffer.drain(..=newline);
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }
}

fn parse_line(line: &str) -> Option<StreamEvent> {
    let data = line.strip_prefix("data:")?.trim_start();
    let value: serde_json::Value = serde_json::from_str(data).ok()?;

    match value["type"].as_str()? {
        "content_block_delta" => match value["delta"]["type"].as_str()? {
            "text_delta" => Some(StreamEvent::TextDelta(
                value["delta"]["text"].as_str()?.to_string(),
            )),
            "input_json_delta" => Some(StreamEvent::ToolInputDelta(
                value["delta"]["partial_json"].as_str()?.to_string(),
            )),
            _ => None,
        },
        "content_block_start" => {
            if value["content_block"]["type"].as_str()? == "tool_use" {
                Some(StreamEvent::ToolUseStart {
                    name: value["content_block"]["name"].as_str()?.to_string(),
                })
            } else {
                None
            }
        }
        "content_block_stop" => Some(StreamEvent::BlockStop),
        "message_stop" => Some(StreamEvent::MessageStop),
        _ => None,
    }
}
