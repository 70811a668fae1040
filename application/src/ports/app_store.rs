//! App version store port
//!
//! Persistence collaborator for generated artifacts. Failure is reported
//! to the caller, not retried by this subsystem.

use appforge_domain::{AppVersion, GeneratedApp};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from the version store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
}

/// Port for persisting generated app versions.
#[async_trait]
pub trait AppVersionStore: Send + Sync {
    /// Append a new version record for a conversation and return it.
    ///
    /// The version number increments per conversation.
    async fn save_version(
        &self,
        conversation_id: &str,
        artifact: &GeneratedApp,
        prompt: &str,
    ) -> Result<AppVersion, StoreError>;

    /// List versions for a conversation, oldest first.
    async fn versions(&self, conversation_id: &str) -> Result<Vec<AppVersion>, StoreError>;
}
