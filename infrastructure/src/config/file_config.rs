//! Raw TOML configuration data types.
//!
//! These structs represent the exact structure of the TOML config file
//! and convert into the runtime settings the subsystems take.

use appforge_application::{GenerationSettings, RegistryConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::gateway::http::HttpGatewayConfig;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Tool execution settings
    pub agent: FileAgentConfig,
    /// LLM gateway settings
    pub gateway: FileGatewayConfig,
    /// Version store settings
    pub store: FileStoreConfig,
}

/// Tool execution and streaming settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    /// Maximum concurrent tool executions
    pub max_concurrent_tools: usize,
    /// Minimum interval between emitted chunks, in milliseconds
    pub min_stream_interval_ms: u64,
    /// Maximum bytes per emitted delta frame
    pub chunk_size: usize,
    /// Wall-clock budget for one generation call, in seconds
    pub generation_timeout_secs: u64,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tools: 5,
            min_stream_interval_ms: 10,
            chunk_size: 100,
            generation_timeout_secs: 120,
        }
    }
}

impl FileAgentConfig {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_concurrent: self.max_concurrent_tools,
            min_stream_interval: Duration::from_millis(self.min_stream_interval_ms),
            ..RegistryConfig::default()
        }
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            chunk_size: self.chunk_size,
            min_interval: Duration::from_millis(self.min_stream_interval_ms),
            timeout: Duration::from_secs(self.generation_timeout_secs),
        }
    }
}

/// LLM gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGatewayConfig {
    /// Base URL of the messages API
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Maximum tokens per response
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for FileGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
        }
    }
}

impl FileGatewayConfig {
    /// Resolve the runtime gateway config, reading the API key from the
    /// configured environment variable.
    pub fn http_config(&self) -> HttpGatewayConfig {
        HttpGatewayConfig {
            base_url: self.base_url.clone(),
            api_key: std::env::var(&self.api_key_env).unwrap_or_default(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            ..HttpGatewayConfig::default()
        }
    }
}

/// Version store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStoreConfig {
    /// Store backend: "memory" or "jsonl"
    pub backend: String,
    /// File path for the jsonl backend
    pub path: String,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            path: "appforge.versions.jsonl".to_string(),
        }
    }
}
