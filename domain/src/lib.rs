//! Domain layer for appforge
//!
//! This crate contains the core business logic, entities, and value objects
//! for the tool streaming protocol. It has no dependencies on infrastructure
//! concerns — no I/O, no async runtime.
//!
//! # Core Concepts
//!
//! ## Tool Stream Protocol
//!
//! A tool invocation produces a strictly ordered sequence of
//! [`ToolStreamFrame`]s: exactly one `tool-call-streaming-start`, any number
//! of `tool-call-delta` frames, and exactly one terminal `tool-result`.
//!
//! ## Call State
//!
//! Each in-flight invocation is tracked by a [`ToolCallState`] keyed by an
//! opaque call id. State lives only for the duration of the call and is
//! never persisted.

pub mod app;
pub mod core;
pub mod session;
pub mod tool;

// Re-export commonly used types
pub use app::{
    artifact::{AppVersion, GeneratedApp},
    imports::scan_required_libraries,
};
pub use core::error::ToolStreamError;
pub use core::string::truncate;
pub use session::{
    event::AgentEvent,
    message::{ChatMessage, Role},
};
pub use tool::{
    entities::{ToolDefinition, ToolParameter},
    frame::ToolStreamFrame,
    state::{CallStatus, StateUpdate, ToolCallState},
    traits::{DefaultToolValidator, ToolValidator},
};
