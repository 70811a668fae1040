//! In-memory version store.
//!
//! Per-conversation version vectors with incrementing version numbers.
//! Suitable for tests and single-process demos; nothing survives restart.

use appforge_application::ports::app_store::{AppVersionStore, StoreError};
use appforge_domain::{AppVersion, GeneratedApp};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryAppStore {
    conversations: Mutex<HashMap<String, Vec<AppVersion>>>,
}

impl InMemoryAppStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppVersionStore for InMemoryAppStore {
    async fn save_version(
        &self,
        conversation_id: &str,
        artifact: &GeneratedApp,
        prompt: &str,
    ) -> Result<AppVersion, StoreError> {
        let mut conversations = self
            .conversations
            .lock()
            .map_err(|_| StoreError::WriteFailed("store lock poisoned".to_string()))?;
        let versions = conversations
            .entry(conversation_id.to_string())
            .or_default();

        let version_number = versions.len() as u32 + 1;
        let version = AppVersion {
            version_id: format!("{}-v{}", conversation_id, version_number),
            conversation_id: conversation_id.to_string(),
            version_number,
            code: artifact.code.clone(),
            prompt: prompt.to_string(),
            created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        };
        versions.push(version.clone());
        Ok(version)
    }

    async fn versions(&self, conversation_id: &str) -> Result<Vec<AppVersion>, StoreError> {
        let conversations = self
            .conversations
            .lock()
            .map_err(|_| StoreError::WriteFailed("store lock poisoned".to_string()))?;
        Ok(conversations
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_version_numbers_increment_per_conversation() {
        let store = InMemoryAppStore::new();
        let artifact = GeneratedApp::new("import pandas\n");

        let v1 = store.save_version("conv-1", &artifact, "first").await.unwrap();
        let v2 = store.save_version("conv-1", &artifact, "second").await.unwrap();
        let other = store.save_version("conv-2", &artifact, "first").await.unwrap();

        assert_eq!(v1.version_number, 1);
        assert_eq!(v2.version_number, 2);
        assert_eq!(other.version_number, 1);
        assert_ne!(v1.version_id, v2.version_id);

        let versions = store.versions("conv-1").await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].prompt, "first");
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_empty() {
        let store = InMemoryAppStore::new();
        assert!(store.versions("nope").await.unwrap().is_empty());
    }
}
