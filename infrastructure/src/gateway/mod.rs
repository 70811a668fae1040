//! LLM gateway adapters.

pub mod http;
pub(crate) mod sse;
