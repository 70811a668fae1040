//! Generated application artifact and version record.

use serde::{Deserialize, Serialize};

/// The structured result of a successful code-generation tool call.
///
/// This is the payload carried by the terminal `tool-result` frame and
/// handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedApp {
    /// Complete, runnable app code including all imports
    pub code: String,
    /// Package dependencies derived from the code's import statements
    pub required_libraries: Vec<String>,
    /// Descriptive name for the application
    pub app_name: String,
    /// Brief summary of the app's functionality
    pub app_description: String,
}

impl GeneratedApp {
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        let required_libraries = super::imports::scan_required_libraries(&code);
        Self {
            code,
            required_libraries,
            app_name: String::new(),
            app_description: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.app_description = description.into();
        self
    }
}

/// A persisted version of a generated application, linked to the
/// conversation that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppVersion {
    /// Store-assigned version identifier
    pub version_id: String,
    /// Conversation this version belongs to
    pub conversation_id: String,
    /// Monotonically increasing per-conversation version number
    pub version_number: u32,
    /// The generated code
    pub code: String,
    /// The user query that produced this version
    pub prompt: String,
    /// RFC3339 creation timestamp
    pub created_at: String,
}
