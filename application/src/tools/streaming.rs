//! Streaming tool contract and shared execution helpers.
//!
//! A tool execution is a lazy sequence of [`ToolStreamFrame`]s delivered
//! through a bounded channel: the producer side is a [`FrameSink`] written
//! to by a spawned task, the consumer side a [`FrameStream`]. This is the
//! channel-plus-producer-task rendition of an async generator; frame order
//! per call id is guaranteed by the single producer.
//!
//! Shared per-call mutable state lives in the [`CallTracker`]: the
//! call-state table and the rate-limiter timestamp table, both keyed by
//! call id. No two logically concurrent operations touch the same key, so
//! plain mutexes held across non-await sections suffice.

use appforge_domain::{
    CallStatus, StateUpdate, ToolCallState, ToolDefinition, ToolStreamError, ToolStreamFrame,
    ToolValidator, truncate,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default minimum interval between emitted chunks.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Default chunk size for rate-limited content streaming.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Bounded log preview length for delta content.
const PREVIEW_LEN: usize = 80;

/// Consumer side of a tool's frame sequence.
///
/// An `Err` item is terminal: the producer sends at most one error and
/// then closes the channel.
pub struct FrameStream {
    receiver: mpsc::Receiver<Result<ToolStreamFrame, ToolStreamError>>,
}

impl FrameStream {
    /// Create a connected sink/stream pair for a call.
    pub fn channel(call_id: impl Into<String>, capacity: usize) -> (FrameSink, FrameStream) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            FrameSink {
                call_id: call_id.into(),
                tx,
            },
            FrameStream { receiver: rx },
        )
    }

    /// Receive the next frame, or `None` once the producer is done.
    pub async fn next(&mut self) -> Option<Result<ToolStreamFrame, ToolStreamError>> {
        self.receiver.recv().await
    }

    /// Drain the remaining sequence into a vector.
    pub async fn collect(mut self) -> Vec<Result<ToolStreamFrame, ToolStreamError>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item);
        }
        items
    }
}

/// Producer side of a tool's frame sequence.
///
/// Send methods return `false` when the consumer has gone away; producers
/// should stop promptly in that case.
#[derive(Clone)]
pub struct FrameSink {
    call_id: String,
    tx: mpsc::Sender<Result<ToolStreamFrame, ToolStreamError>>,
}

impl FrameSink {
    /// The call id this sink belongs to.
    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// Forward a frame. Delta frames are logged with their content length
    /// and a bounded preview, never the full content.
    pub async fn send(&self, frame: ToolStreamFrame) -> bool {
        if let Some(text) = frame.delta_text() {
            debug!(
                call_id = %self.call_id,
                len = text.len(),
                preview = %truncate(text, PREVIEW_LEN),
                "delta frame"
            );
        }
        self.tx.send(Ok(frame)).await.is_ok()
    }

    /// Emit a delta frame for this call.
    pub async fn delta(&self, text: impl Into<String>) -> bool {
        self.send(ToolStreamFrame::delta(self.call_id.clone(), text))
            .await
    }

    /// Emit the terminal result frame for this call.
    pub async fn result(&self, value: serde_json::Value) -> bool {
        self.send(ToolStreamFrame::result(self.call_id.clone(), value))
            .await
    }

    /// Surface a terminal error and close the sequence.
    pub async fn error(&self, err: ToolStreamError) -> bool {
        self.tx.send(Err(err)).await.is_ok()
    }
}

/// Shared per-call bookkeeping: state table and rate-limiter stamps.
///
/// Both tables are keyed by call id and cleared together by
/// [`cleanup`](Self::cleanup), which the registry invokes exactly once per
/// call on its structured-exit path.
#[derive(Default)]
pub struct CallTracker {
    states: Mutex<HashMap<String, ToolCallState>>,
    last_emit: Mutex<HashMap<String, Instant>>,
}

impl CallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a partial update into a call's state, creating the entry with
    /// status `Starting` if absent.
    pub fn update_state(&self, call_id: &str, tool_name: &str, update: StateUpdate) {
        let mut states = self.states.lock().expect("call state table poisoned");
        states
            .entry(call_id.to_string())
            .or_insert_with(|| ToolCallState::starting(call_id, tool_name))
            .apply(update);
    }

    /// Snapshot a call's current state.
    pub fn state(&self, call_id: &str) -> Option<ToolCallState> {
        self.states
            .lock()
            .expect("call state table poisoned")
            .get(call_id)
            .cloned()
    }

    /// Pace chunk emission for a call: if less than `min_interval` has
    /// elapsed since the last emitted chunk, suspend until it has, then
    /// record the new timestamp. Every chunk is paced individually; there
    /// is no burst absorption.
    pub async fn pace(&self, call_id: &str, min_interval: Duration) {
        let wait = {
            let stamps = self.last_emit.lock().expect("rate limiter table poisoned");
            stamps.get(call_id).and_then(|last| {
                let elapsed = last.elapsed();
                (elapsed < min_interval).then(|| min_interval - elapsed)
            })
        };

        if let Some(wait) = wait {
            tokio::time::sleep(wait).await;
        }

        self.last_emit
            .lock()
            .expect("rate limiter table poisoned")
            .insert(call_id.to_string(), Instant::now());
    }

    /// Remove a call's state entry and rate-limiter stamp.
    pub fn cleanup(&self, call_id: &str) {
        self.states
            .lock()
            .expect("call state table poisoned")
            .remove(call_id);
        self.last_emit
            .lock()
            .expect("rate limiter table poisoned")
            .remove(call_id);
    }

    /// True when no bookkeeping remains for the call id.
    pub fn is_clean(&self, call_id: &str) -> bool {
        !self
            .states
            .lock()
            .expect("call state table poisoned")
            .contains_key(call_id)
            && !self
                .last_emit
                .lock()
                .expect("rate limiter table poisoned")
                .contains_key(call_id)
    }

    /// Number of tracked call states.
    pub fn len(&self) -> usize {
        self.states.lock().expect("call state table poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split `content` into fixed-size chunks and emit one paced delta frame
/// per chunk.
///
/// Terminates early if the cancel token fires; in that case a final result
/// frame carrying an aborted indicator is emitted instead of an error, so
/// downstream consumers always see a terminal frame. Returns `false` when
/// the sequence was cut short (abort or dropped consumer).
pub async fn stream_chunked(
    sink: &FrameSink,
    tracker: &CallTracker,
    tool_name: &str,
    content: &str,
    chunk_size: usize,
    min_interval: Duration,
    cancel: &CancellationToken,
) -> bool {
    tracker.update_state(
        sink.call_id(),
        tool_name,
        StateUpdate::status(CallStatus::Streaming),
    );

    for chunk in split_chunks(content, chunk_size) {
        if cancel.is_cancelled() {
            let _ = sink
                .send(ToolStreamFrame::aborted_result(sink.call_id()))
                .await;
            return false;
        }
        tracker.pace(sink.call_id(), min_interval).await;
        if !sink.delta(chunk).await {
            return false;
        }
    }
    true
}

/// Split on char boundaries into chunks of at most `chunk_size` bytes.
fn split_chunks(content: &str, chunk_size: usize) -> Vec<&str> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut rest = content;
    while !rest.is_empty() {
        let mut end = chunk_size.min(rest.len());
        while end < rest.len() && !rest.is_char_boundary(end) {
            end += 1;
        }
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

/// A named, schema-validated capability with an execute-as-stream contract.
///
/// Executions are not restartable: a retry must use a fresh call id. A
/// frame sequence must terminate with a result frame or surface an error;
/// infinite sequences are not permitted. Implementations must observe the
/// cancel token at least once per emitted frame and at entry to any
/// unbounded loop.
pub trait StreamingTool: Send + Sync {
    /// The tool's identity and parameter schema.
    fn definition(&self) -> &ToolDefinition;

    fn name(&self) -> &str {
        &self.definition().name
    }

    /// Validate arguments against the schema. Runs before any frame is
    /// produced. The default applies [`DefaultToolValidator`].
    fn validate_args(&self, args: &serde_json::Value) -> Result<(), ToolStreamError> {
        appforge_domain::DefaultToolValidator
            .validate(args, self.definition())
            .map_err(|message| ToolStreamError::Validation {
                tool: self.name().to_string(),
                message,
            })
    }

    /// Begin execution, returning the lazy frame sequence. The registry
    /// wraps this with the synthetic stream-start frame, pacing, abort
    /// checks, and cleanup.
    fn stream_execution(
        &self,
        call_id: &str,
        args: serde_json::Value,
        cancel: CancellationToken,
    ) -> FrameStream;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_chunks_ascii() {
        assert_eq!(split_chunks("abcdef", 2), vec!["ab", "cd", "ef"]);
        assert_eq!(split_chunks("abcde", 2), vec!["ab", "cd", "e"]);
        assert_eq!(split_chunks("", 2), Vec::<&str>::new());
    }

    #[test]
    fn test_split_chunks_multibyte_boundary() {
        // 3-byte chars with chunk_size 4 force boundary adjustment
        let chunks = split_chunks("日本語", 4);
        assert_eq!(chunks.concat(), "日本語");
        for chunk in chunks {
            assert!(!chunk.is_empty());
        }
    }

    #[test]
    fn test_tracker_state_created_as_starting() {
        let tracker = CallTracker::new();
        tracker.update_state("c1", "echo", StateUpdate::default());
        assert_eq!(tracker.state("c1").unwrap().status, CallStatus::Starting);

        tracker.update_state("c1", "echo", StateUpdate::status(CallStatus::Streaming));
        assert_eq!(tracker.state("c1").unwrap().status, CallStatus::Streaming);
    }

    #[test]
    fn test_tracker_cleanup_clears_both_tables() {
        let tracker = CallTracker::new();
        tracker.update_state("c1", "echo", StateUpdate::default());
        assert!(!tracker.is_clean("c1"));

        tracker.cleanup("c1");
        assert!(tracker.is_clean("c1"));
        assert!(tracker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pace_enforces_min_interval() {
        let tracker = CallTracker::new();
        let interval = Duration::from_millis(10);

        let start = Instant::now();
        tracker.pace("c1", interval).await; // first emit, no wait
        tracker.pace("c1", interval).await;
        tracker.pace("c1", interval).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pace_is_per_call_id() {
        let tracker = CallTracker::new();
        let interval = Duration::from_millis(10);

        tracker.pace("a", interval).await;
        let start = Instant::now();
        tracker.pace("b", interval).await; // different key, no wait
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_stream_chunked_emits_paced_deltas() {
        let tracker = CallTracker::new();
        let (sink, stream) = FrameStream::channel("c1", 32);
        let cancel = CancellationToken::new();

        let done = stream_chunked(
            &sink,
            &tracker,
            "echo",
            "hello world",
            4,
            Duration::ZERO,
            &cancel,
        )
        .await;
        assert!(done);
        drop(sink);

        let frames: Vec<_> = stream.collect().await;
        let texts: Vec<_> = frames
            .iter()
            .map(|f| f.as_ref().unwrap().delta_text().unwrap().to_string())
            .collect();
        assert_eq!(texts, vec!["hell", "o wo", "rld"]);
        assert_eq!(tracker.state("c1").unwrap().status, CallStatus::Streaming);
    }

    #[tokio::test]
    async fn test_stream_chunked_abort_yields_terminal_result() {
        let tracker = CallTracker::new();
        let (sink, stream) = FrameStream::channel("c1", 32);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let done = stream_chunked(
            &sink,
            &tracker,
            "echo",
            "content",
            2,
            Duration::ZERO,
            &cancel,
        )
        .await;
        assert!(!done);
        drop(sink);

        let frames: Vec<_> = stream.collect().await;
        assert_eq!(frames.len(), 1);
        let frame = frames[0].as_ref().unwrap();
        assert!(frame.is_terminal());
        match frame {
            ToolStreamFrame::Result { result, .. } => {
                assert_eq!(result["error"], "Stream aborted");
            }
            other => panic!("expected result frame, got {:?}", other),
        }
    }
}
