//! Tool domain entities

use serde::{Deserialize, Serialize};

/// Definition of a tool the agent can invoke.
///
/// Immutable after registration; the registry owns it for the process
/// lifetime. The parameter list is the structural validation contract
/// checked by [`ToolValidator`](super::traits::ToolValidator) before any
/// frame is emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool (e.g., "create_app")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Parameter specifications
    pub parameters: Vec<ToolParameter>,
}

/// Parameter specification for a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// Parameter description
    pub description: String,
    /// Whether this parameter is required
    pub required: bool,
    /// Parameter type hint (e.g., "string", "object", "number")
    pub param_type: String,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Get a parameter by name
    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: "string".to_string(),
        }
    }

    pub fn with_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = param_type.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definition_builder() {
        let tool = ToolDefinition::new("create_app", "Generates app code")
            .with_parameter(ToolParameter::new("query", "What to build", true))
            .with_parameter(
                ToolParameter::new("file_context", "Attached data file", false)
                    .with_type("object"),
            );

        assert_eq!(tool.name, "create_app");
        assert_eq!(tool.parameters.len(), 2);
        assert!(tool.parameter("query").unwrap().required);
        assert_eq!(tool.parameter("file_context").unwrap().param_type, "object");
        assert!(tool.parameter("missing").is_none());
    }
}
