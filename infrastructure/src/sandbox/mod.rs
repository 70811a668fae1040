//! Sandbox execution adapters.

pub mod http;
