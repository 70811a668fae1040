//! Sandboxed execution port
//!
//! The sandbox runs generated code and returns a reachable URL. This core
//! does not manage the sandbox lifecycle; it only supplies the code.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the sandbox service
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Sandbox unavailable: {0}")]
    Unavailable(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Port for launching generated code in a sandbox.
#[async_trait]
pub trait SandboxPort: Send + Sync {
    /// Run the code and return the URL where the app is reachable.
    async fn launch(&self, code: &str) -> Result<String, SandboxError>;
}
