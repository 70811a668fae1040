//! Application layer for appforge
//!
//! Contains the ports (abstract interfaces to the LLM gateway, version
//! store, and sandbox) and the core tool streaming subsystem: the
//! [`ToolRegistry`], the [`StreamingTool`] contract with its shared
//! streaming helpers, the concrete code-generation tool, and the
//! [`RunTurnUseCase`] orchestrator that multiplexes assistant text and tool
//! frames into one outbound stream.

pub mod ports;
pub mod tools;
pub mod use_cases;

// Re-export commonly used types
pub use ports::app_store::{AppVersionStore, StoreError};
pub use ports::llm_gateway::{
    ChatEvent, ChatStreamHandle, GatewayError, GenerationStreamHandle, GenerationUpdate,
    LlmGateway,
};
pub use ports::sandbox::{SandboxError, SandboxPort};
pub use tools::create_app::{CreateAppTool, GenerationSettings};
pub use tools::echo::EchoTool;
pub use tools::registry::{RegistryConfig, ToolRegistry, ValidationOutcome};
pub use tools::streaming::{CallTracker, FrameSink, FrameStream, StreamingTool};
pub use use_cases::run_turn::{RunTurnUseCase, TurnInput};
