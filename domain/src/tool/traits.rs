//! Tool domain traits
//!
//! Pure validation logic. The async provider trait lives in the application
//! layer because execution needs the per-turn context.

use super::entities::{ToolCall, ToolDefinition};
use super::value_objects::ToolError;

/// Validator for tool calls
pub trait ToolValidator {
    /// Validate a tool call against its definition
    fn validate(&self, call: &ToolCall, definition: &ToolDefinition) -> Result<(), ToolError>;
}

/// Checks presence of every `required` schema field.
///
/// Unknown arguments are tolerated: external schemas are often looser than
/// the arguments models send, and extra keys are harmless to executors.
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(&self, call: &ToolCall, definition: &ToolDefinition) -> Result<(), ToolError> {
        let missing: Vec<&str> = definition
            .parameter_schema
            .required
            .iter()
            .filter(|name| {
                call.arguments
                    .get(name.as_str())
                    .is_none_or(|v| v.is_null())
            })
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        let noun = if missing.len() == 1 {
            "parameter"
        } else {
            "parameters"
        };
        Err(ToolError::validation(format!(
            "Missing required {} for tool '{}': {}",
            noun,
            definition.name,
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::{ApprovalType, ToolParameter};
    use crate::tool::value_objects::ErrorKind;

    fn definition() -> ToolDefinition {
        ToolDefinition::new("test", "test tool", ApprovalType::None)
            .with_parameter(ToolParameter::new("path", "A required param", true))
            .with_parameter(ToolParameter::new("content", "Another required param", true))
            .with_parameter(ToolParameter::new("optional", "Optional", false))
    }

    #[test]
    fn test_validator_missing_required() {
        let call = ToolCall::new("test").with_arg("path", "a.txt");
        let err = DefaultToolValidator
            .validate(&call, &definition())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("Missing required parameter"));
        assert!(err.message.contains("content"));
    }

    #[test]
    fn test_validator_lists_all_missing() {
        let call = ToolCall::new("test");
        let err = DefaultToolValidator
            .validate(&call, &definition())
            .unwrap_err();
        assert!(err.message.contains("path, content"));
    }

    #[test]
    fn test_validator_null_counts_as_missing() {
        let call = ToolCall::new("test")
            .with_arg("path", serde_json::Value::Null)
            .with_arg("content", "x");
        assert!(DefaultToolValidator.validate(&call, &definition()).is_err());
    }

    #[test]
    fn test_validator_valid_call() {
        let call = ToolCall::new("test")
            .with_arg("path", "a.txt")
            .with_arg("content", "")
            .with_arg("unlisted", 1);
        assert!(DefaultToolValidator.validate(&call, &definition()).is_ok());
    }
}
