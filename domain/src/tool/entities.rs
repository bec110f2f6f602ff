//! Tool domain entities

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Whether a tool call needs human confirmation before it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalType {
    /// Executes immediately (read-only operations such as read_file, glob_search)
    #[default]
    None,
    /// Side-effecting operations (write_file, run_command, external tools)
    Dangerous,
}

impl ApprovalType {
    pub fn as_str(&self) -> &str {
        match self {
            ApprovalType::None => "none",
            ApprovalType::Dangerous => "dangerous",
        }
    }

    pub fn requires_confirmation(&self) -> bool {
        matches!(self, ApprovalType::Dangerous)
    }
}

impl std::fmt::Display for ApprovalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JSON-Schema-like description of a tool's arguments.
///
/// Serializes to `{"type": "object", "properties": {...}, "required": [...]}`.
/// Property schemas are kept as raw JSON so externally-provided schemas
/// (nested objects, enums, arrays) survive unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type", default = "object_type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub required: Vec<String>,
}

fn object_type() -> String {
    "object".to_string()
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self {
            schema_type: object_type(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

impl ParameterSchema {
    /// Build a schema from an arbitrary JSON Schema value.
    ///
    /// Non-object input, or an object without `properties`, yields an empty
    /// object schema. Entries in `required` that are not strings are dropped.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let properties = value
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        let required = value
            .get("required")
            .and_then(|r| r.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            schema_type: object_type(),
            properties,
            required,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

/// Definition of a tool advertised to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool (e.g., "read_file")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Argument contract
    pub parameter_schema: ParameterSchema,
    /// Intrinsic approval requirement
    #[serde(default)]
    pub approval_type: ApprovalType,
}

/// Single parameter, used to build a [`ParameterSchema`] fluently
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// Parameter description
    pub description: String,
    /// Whether this parameter is required
    pub required: bool,
    /// Parameter type hint (e.g., "string", "path", "number", "array")
    pub param_type: String,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        approval_type: ApprovalType,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter_schema: ParameterSchema::default(),
            approval_type,
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        let schema = param.to_property_schema();
        if param.required && !self.parameter_schema.is_required(&param.name) {
            self.parameter_schema.required.push(param.name.clone());
        }
        self.parameter_schema.properties.insert(param.name, schema);
        self
    }

    pub fn with_schema(mut self, schema: ParameterSchema) -> Self {
        self.parameter_schema = schema;
        self
    }

    pub fn requires_confirmation(&self) -> bool {
        self.approval_type.requires_confirmation()
    }

    /// Provider-neutral function-calling schema for this tool
    pub fn to_json_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.parameter_schema.to_json(),
        })
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

    /// Map the type hint onto a JSON Schema property.
    ///
    /// `"path"` maps to `"string"`; `"array"` is an array of strings; unknown
    /// hints fall back to `"string"`.
    fn to_property_schema(&self) -> serde_json::Value {
        match self.param_type.as_str() {
            "array" => serde_json::json!({
                "type": "array",
                "items": { "type": "string" },
                "description": self.description,
            }),
            other => {
                let schema_type = match other {
                    "number" => "number",
                    "integer" => "integer",
                    "boolean" => "boolean",
                    _ => "string",
                };
                serde_json::json!({
                    "type": schema_type,
                    "description": self.description,
                })
            }
        }
    }
}

/// Invocation envelope: a call to a tool with arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to call
    #[serde(rename = "name")]
    pub tool_name: String,
    /// Arguments passed to the tool
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,
    /// Identifier assigned by the model loop, echoed back in results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: HashMap::new(),
            call_id: None,
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_call_id(mut self, id: impl Into<String>) -> Self {
        self.call_id = Some(id.into());
        self
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    /// Get a required string argument or return an error message
    pub fn require_string(&self, key: &str) -> Result<&str, String> {
        self.get_string(key)
            .ok_or_else(|| format!("Missing required argument: {}", key))
    }

    /// Get an optional i64 argument.
    ///
    /// Models frequently send numbers as strings ("12"), so numeric strings
    /// are accepted too.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.arguments.get(key)? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Get an optional bool argument
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.arguments.get(key)? {
            serde_json::Value::Bool(b) => Some(*b),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Get a list of strings; a single string is treated as a one-element list
    pub fn get_string_list(&self, key: &str) -> Option<Vec<String>> {
        match self.arguments.get(key)? {
            serde_json::Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            serde_json::Value::String(s) => Some(vec![s.clone()]),
            _ => None,
        }
    }
}
