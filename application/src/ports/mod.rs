//! Port definitions (interfaces to external collaborators).
//!
//! Ports define how the application layer talks to the outside world.
//! Implementations (adapters) live in the infrastructure layer.

pub mod app_store;
pub mod llm_gateway;
pub mod sandbox;
