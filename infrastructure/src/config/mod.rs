//! Configuration loading.

mod file_config;
mod loader;

pub use file_config::{FileAgentConfig, FileConfig, FileGatewayConfig, FileStoreConfig};
pub use loader::ConfigLoader;
