//! Infrastructure layer for appforge
//!
//! Adapters implementing the application-layer ports: the HTTP LLM
//! gateway, the version stores, the sandbox client, and configuration
//! loading.

pub mod config;
pub mod gateway;
pub mod sandbox;
pub mod store;

pub use config::{ConfigLoader, FileConfig};
pub use gateway::http::{HttpGatewayConfig, HttpLlmGateway};
pub use sandbox::http::HttpSandboxClient;
pub use store::jsonl::JsonlAppStore;
pub use store::memory::InMemoryAppStore;
