//! HTTP client for the sandboxed execution service.
//!
//! POSTs generated code to the service and returns the URL where the
//! launched app is reachable.

use appforge_application::ports::sandbox::{SandboxError, SandboxPort};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpSandboxClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct LaunchResponse {
    url: String,
}

impl HttpSandboxClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SandboxError> {
        let client = reqwest::Client::builder()
            .timeout(LAUNCH_TIMEOUT)
            .build()
            .map_err(|e| SandboxError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl SandboxPort for HttpSandboxClient {
    async fn launch(&self, code: &str) -> Result<String, SandboxError> {
        let url = format!("{}/launch", self.base_url);
        debug!(url = %url, code_len = code.len(), "launching app in sandbox");

        let response = self
            .client
            .post(&url)
            .json(&json!({ "code": code }))
            .send()
            .await
            .map_err(|e| SandboxError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(SandboxError::ExecutionFailed(format!(
                "{}: {}",
                status, detail
            )));
        }

        let launch: LaunchResponse = response
            .json()
            .await
            .map_err(|e| SandboxError::ExecutionFailed(e.to_string()))?;
        Ok(launch.url)
    }
}
