//! Tool domain traits
//!
//! Contains pure domain logic for argument validation. Validation runs
//! before any frame is emitted for a call; a failure means zero frames.

use super::entities::ToolDefinition;

/// Validator for tool arguments
///
/// Pure domain trait validating a JSON argument object against a tool's
/// definition, without any I/O.
pub trait ToolValidator {
    /// Validate arguments against a definition. Returns a human-readable
    /// message on failure.
    fn validate(&self, args: &serde_json::Value, definition: &ToolDefinition)
    -> Result<(), String>;
}

/// Default implementation of ToolValidator
///
/// Checks that arguments form a JSON object, that every required parameter
/// is present, that no unknown parameters are supplied, and that values
/// match their declared type hints.
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(
        &self,
        args: &serde_json::Value,
        definition: &ToolDefinition,
    ) -> Result<(), String> {
        let map = args.as_object().ok_or_else(|| {
            format!(
                "Arguments for tool '{}' must be a JSON object",
                definition.name
            )
        })?;

        for param in &definition.parameters {
            if param.required && !map.contains_key(&param.name) {
                return Err(format!(
                    "Missing required parameter '{}' for tool '{}'",
                    param.name, definition.name
                ));
            }
        }

        for (name, value) in map {
            let Some(param) = definition.parameter(name) else {
                return Err(format!(
                    "Unknown parameter '{}' for tool '{}'",
                    name, definition.name
                ));
            };
            if !type_matches(&param.param_type, value) {
                return Err(format!(
                    "Parameter '{}' for tool '{}' must be of type {}",
                    name, definition.name, param.param_type
                ));
            }
        }

        Ok(())
    }
}

fn type_matches(param_type: &str, value: &serde_json::Value) -> bool {
    match param_type {
        "string" => value.is_string(),
        "number" | "integer" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        // Unrecognized hints accept anything
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::ToolParameter;
    use serde_json::json;

    fn definition() -> ToolDefinition {
        ToolDefinition::new("create_app", "Generates app code")
            .with_parameter(ToolParameter::new("query", "What to build", true))
            .with_parameter(
                ToolParameter::new("file_context", "Attached file", false).with_type("object"),
            )
    }

    #[test]
    fn test_valid_args() {
        let validator = DefaultToolValidator;
        let args = json!({"query": "plot sales", "file_context": {"file_name": "sales.csv"}});
        assert!(validator.validate(&args, &definition()).is_ok());
    }

    #[test]
    fn test_missing_required() {
        let validator = DefaultToolValidator;
        let err = validator.validate(&json!({}), &definition()).unwrap_err();
        assert!(err.contains("Missing required parameter 'query'"));
    }

    #[test]
    fn test_unknown_param() {
        let validator = DefaultToolValidator;
        let err = validator
            .validate(&json!({"query": "x", "bogus": 1}), &definition())
            .unwrap_err();
        assert!(err.contains("Unknown parameter 'bogus'"));
    }

    #[test]
    fn test_type_mismatch() {
        let validator = DefaultToolValidator;
        let err = validator
            .validate(&json!({"query": 42}), &definition())
            .unwrap_err();
        assert!(err.contains("must be of type string"));
    }

    #[test]
    fn test_non_object_args() {
        let validator = DefaultToolValidator;
        let err = validator
            .validate(&json!("just a string"), &definition())
            .unwrap_err();
        assert!(err.contains("must be a JSON object"));
    }
}
