//! The tool streaming subsystem.
//!
//! - [`streaming`]: the [`StreamingTool`](streaming::StreamingTool)
//!   contract, frame channel plumbing, per-call state tracking, and
//!   rate-limited chunk emission
//! - [`registry`]: the process-wide [`ToolRegistry`](registry::ToolRegistry)
//!   with admission control and cooperative cancellation
//! - [`create_app`]: the application-code generator tool
//! - [`echo`]: a trivial tool for tests and demos

pub mod create_app;
pub mod echo;
pub mod registry;
pub mod streaming;

pub use create_app::CreateAppTool;
pub use echo::EchoTool;
pub use registry::ToolRegistry;
pub use streaming::{CallTracker, FrameSink, FrameStream, StreamingTool};
