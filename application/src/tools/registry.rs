//! Tool registry
//!
//! The [`ToolRegistry`] owns the set of registered streaming tools and the
//! canonical [`stream_tool_execution`](ToolRegistry::stream_tool_execution)
//! entry point that wraps a tool's raw frame sequence with the synthetic
//! start frame, pacing, abort checks, and guaranteed cleanup.
//!
//! One instance is constructed at the composition root and shared via
//! `Arc`; there is no global mutable state.
//!
//! # Admission control
//!
//! A semaphore bounds concurrent executions process-wide. A call that
//! would exceed the bound fails immediately with
//! [`ToolStreamError::AdmissionRejected`] rather than queueing, so the
//! runtime never accumulates unbounded backlog under burst. Callers back
//! off and retry.
//!
//! # Cleanup invariant
//!
//! Every call, whatever its outcome, removes its call-state entry,
//! rate-limiter stamp, and cancellation token on the supervisor's exit
//! path. [`is_clean`](ToolRegistry::is_clean) checks all three.

use appforge_domain::{CallStatus, StateUpdate, ToolStreamError, ToolStreamFrame};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::streaming::{CallTracker, FrameSink, FrameStream, StreamingTool};

/// Default maximum number of concurrent tool executions.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Registry tuning knobs.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Global concurrency bound for in-flight tool executions.
    pub max_concurrent: usize,
    /// Minimum interval between forwarded delta frames per call.
    pub min_stream_interval: Duration,
    /// Capacity of each call's frame channel.
    pub channel_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            min_stream_interval: super::streaming::DEFAULT_MIN_INTERVAL,
            channel_capacity: 32,
        }
    }
}

/// Result of validating a prospective tool call. Lookup and schema
/// failures are reported in-band rather than as an `Err`.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub error: Option<String>,
}

impl ValidationOutcome {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn fail(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// Bookkeeping for one in-flight call.
struct ActiveCall {
    tool_name: String,
    cancel: CancellationToken,
}

type ActiveTable = Arc<Mutex<HashMap<String, ActiveCall>>>;

/// Process-wide registry of streaming tools.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn StreamingTool>>>,
    active: ActiveTable,
    tracker: Arc<CallTracker>,
    limiter: Arc<Semaphore>,
    config: RegistryConfig,
}

impl ToolRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
            active: Arc::new(Mutex::new(HashMap::new())),
            tracker: Arc::new(CallTracker::new()),
            limiter: Arc::new(Semaphore::new(config.max_concurrent)),
            config,
        }
    }

    /// Shared per-call bookkeeping, for tools that track state or pace
    /// their own emission.
    pub fn tracker(&self) -> Arc<CallTracker> {
        self.tracker.clone()
    }

    /// Register a tool under its definition name. Last writer wins on a
    /// name collision; in-flight calls keep the instance captured at call
    /// start.
    pub fn register(&self, tool: Arc<dyn StreamingTool>) {
        let name = tool.name().to_string();
        let previous = self
            .tools
            .write()
            .expect("tool table poisoned")
            .insert(name.clone(), tool);
        if previous.is_some() {
            warn!(tool = %name, "replacing registered tool");
        } else {
            info!(tool = %name, "registered tool");
        }
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn StreamingTool>> {
        self.tools
            .read()
            .expect("tool table poisoned")
            .get(name)
            .cloned()
    }

    /// Names of all registered tools.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools
            .read()
            .expect("tool table poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Call ids currently in flight.
    pub fn active_calls(&self) -> Vec<String> {
        self.active
            .lock()
            .expect("active call table poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Validate a prospective call without executing it.
    pub fn validate_tool_call(&self, name: &str, args: &serde_json::Value) -> ValidationOutcome {
        let Some(tool) = self.get(name) else {
            return ValidationOutcome::fail(format!("Tool \"{}\" not found", name));
        };
        match tool.validate_args(args) {
            Ok(()) => ValidationOutcome::ok(),
            Err(e) => ValidationOutcome::fail(e.to_string()),
        }
    }

    /// Run a tool call as a supervised, rate-limited, cancellable frame
    /// sequence.
    ///
    /// Fails before any frame exists on unknown tools, invalid arguments,
    /// and admission rejection. On success the returned stream begins with
    /// a synthetic `tool-call-streaming-start` frame emitted before the
    /// tool's own logic runs, and always ends with a terminal frame or a
    /// single error.
    pub fn stream_tool_execution(
        &self,
        call_id: &str,
        name: &str,
        args: serde_json::Value,
    ) -> Result<FrameStream, ToolStreamError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolStreamError::ToolNotFound(name.to_string()))?;

        tool.validate_args(&args)?;

        let permit = self.limiter.clone().try_acquire_owned().map_err(|_| {
            let active = self.config.max_concurrent - self.limiter.available_permits();
            warn!(call_id, tool = name, active, "admission rejected");
            ToolStreamError::AdmissionRejected {
                active,
                max: self.config.max_concurrent,
            }
        })?;

        let cancel = CancellationToken::new();
        self.active
            .lock()
            .expect("active call table poisoned")
            .insert(
                call_id.to_string(),
                ActiveCall {
                    tool_name: name.to_string(),
                    cancel: cancel.clone(),
                },
            );
        self.tracker
            .update_state(call_id, name, StateUpdate::default().with_args(args.clone()));

        info!(call_id, tool = name, "tool execution starting");

        let (sink, stream) = FrameStream::channel(call_id, self.config.channel_capacity);
        let inner = tool.stream_execution(call_id, args, cancel.clone());
        let supervisor = Supervisor {
            call_id: call_id.to_string(),
            tool_name: name.to_string(),
            tracker: self.tracker.clone(),
            active: self.active.clone(),
            min_interval: self.config.min_stream_interval,
        };

        tokio::spawn(async move {
            supervisor.run(inner, sink, cancel).await;
            drop(permit);
        });

        Ok(stream)
    }

    /// Cancel an in-flight call and discard its bookkeeping entry. The
    /// producer observes the token cooperatively on its next iteration;
    /// there is no hard kill. After cancellation only terminal frames the
    /// tool already produced are forwarded.
    pub fn abort_tool_execution(&self, call_id: &str) {
        let entry = self
            .active
            .lock()
            .expect("active call table poisoned")
            .remove(call_id);
        if let Some(entry) = entry {
            info!(call_id, tool = %entry.tool_name, "aborting tool execution");
            entry.cancel.cancel();
        } else {
            debug!(call_id, "abort requested for unknown or finished call");
        }
    }

    /// True when no per-call bookkeeping remains for the call id.
    pub fn is_clean(&self, call_id: &str) -> bool {
        self.tracker.is_clean(call_id)
            && !self
                .active
                .lock()
                .expect("active call table poisoned")
                .contains_key(call_id)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

/// Supervises one call: emits the synthetic start frame, forwards the
/// tool's frames with pacing and abort checks, and runs cleanup on every
/// exit path. The sink is dropped only after cleanup, so a consumer that
/// sees the stream end can rely on the bookkeeping being gone.
struct Supervisor {
    call_id: String,
    tool_name: String,
    tracker: Arc<CallTracker>,
    active: ActiveTable,
    min_interval: Duration,
}

impl Supervisor {
    async fn run(self, mut inner: FrameStream, sink: FrameSink, cancel: CancellationToken) {
        if sink
            .send(ToolStreamFrame::stream_start(&self.call_id, &self.tool_name))
            .await
        {
            self.forward(&mut inner, &sink, &cancel).await;
        }
        self.cleanup();
    }

    async fn forward(&self, inner: &mut FrameStream, sink: &FrameSink, cancel: &CancellationToken) {
        let mut terminated = false;
        // Paced against the supervisor's own clock, not the tracker's
        // stamp table: a tool that already paces its emission through the
        // shared tracker must not be delayed a second time per frame.
        let mut last_emit: Option<Instant> = None;

        while let Some(item) = inner.next().await {
            match item {
                Ok(frame) => {
                    if cancel.is_cancelled() && !frame.is_terminal() {
                        debug!(call_id = %self.call_id, "dropping frame after abort");
                        let _ = sink.error(ToolStreamError::Aborted).await;
                        terminated = true;
                        break;
                    }
                    let terminal = frame.is_terminal();
                    if !terminal
                        && let Some(last) = last_emit
                    {
                        let elapsed = last.elapsed();
                        if elapsed < self.min_interval {
                            tokio::time::sleep(self.min_interval - elapsed).await;
                        }
                    }
                    if !sink.send(frame).await {
                        debug!(call_id = %self.call_id, "consumer gone, stopping forward");
                        terminated = true;
                        break;
                    }
                    last_emit = Some(Instant::now());
                    if terminal {
                        self.tracker.update_state(
                            &self.call_id,
                            &self.tool_name,
                            StateUpdate::status(CallStatus::Complete),
                        );
                        info!(call_id = %self.call_id, tool = %self.tool_name, "tool execution complete");
                        terminated = true;
                        break;
                    }
                }
                Err(e) => {
                    self.tracker.update_state(
                        &self.call_id,
                        &self.tool_name,
                        StateUpdate::status(CallStatus::Error).with_error(e.to_string()),
                    );
                    warn!(call_id = %self.call_id, tool = %self.tool_name, error = %e, "tool execution failed");
                    let _ = sink.error(e).await;
                    terminated = true;
                    break;
                }
            }
        }

        // The tool's producer ended without a terminal frame.
        if !terminated {
            let err = if cancel.is_cancelled() {
                ToolStreamError::Aborted
            } else {
                ToolStreamError::Upstream("tool stream ended without a terminal frame".to_string())
            };
            warn!(call_id = %self.call_id, tool = %self.tool_name, error = %err, "tool stream ended early");
            let _ = sink.error(err).await;
        }
    }

    fn cleanup(&self) {
        self.tracker.cleanup(&self.call_id);
        self.active
            .lock()
            .expect("active call table poisoned")
            .remove(&self.call_id);
        debug!(call_id = %self.call_id, "call bookkeeping cleared");
    }
}
