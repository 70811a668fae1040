//! Conversation session types: chat messages and the multiplexed
//! agent event stream.

pub mod event;
pub mod message;

pub use event::AgentEvent;
pub use message::{ChatMessage, Role};
