//! Tool domain module
//!
//! Defines the core abstractions for streaming tool execution: tool
//! definitions, the wire protocol frames a running tool emits, and the
//! transient per-call state tracked while a call is in flight.
//!
//! ```text
//! ┌────────────────┐    ┌──────────────────┐    ┌──────────────┐
//! │ ToolDefinition │───▶│ ToolStreamFrame* │───▶│ tool-result  │
//! │ (registered)   │    │ (lazy sequence)  │    │ (terminal)   │
//! └────────────────┘    └──────────────────┘    └──────────────┘
//! ```
//!
//! Frame ordering is strict per call id: exactly one
//! `tool-call-streaming-start`, zero or more `tool-call-delta`, exactly one
//! terminal frame.

pub mod entities;
pub mod frame;
pub mod state;
pub mod traits;

pub use entities::{ToolDefinition, ToolParameter};
pub use frame::ToolStreamFrame;
pub use state::{CallStatus, StateUpdate, ToolCallState};
pub use traits::{DefaultToolValidator, ToolValidator};
