//! Tool provider port
//!
//! Tools come from several heterogeneous sources behind one contract:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ToolRegistry                │
//! │  (ordered; first has_tool() match wins)  │
//! └──────────────────────────────────────────┘
//!           │                     │
//!           ▼                     ▼
//!    ┌──────────────┐     ┌──────────────┐
//!    │   Builtin    │     │     MCP      │
//!    │   Provider   │     │    Bridge    │
//!    └──────────────┘     └──────────────┘
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use toolgate_domain::{
    ApprovalType, DefaultToolValidator, ToolCall, ToolDefinition, ToolError, ToolResult,
    ToolValidator,
};

use crate::context::ExecutionContext;

/// A source of tools
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Unique identifier (e.g. "builtin", "mcp")
    fn id(&self) -> &str;

    /// Display name for user-facing output
    fn display_name(&self) -> &str;

    fn has_tool(&self, name: &str) -> bool;

    fn tool_definitions(&self) -> Vec<ToolDefinition>;

    fn tool_definition(&self, name: &str) -> Option<ToolDefinition> {
        self.tool_definitions().into_iter().find(|d| d.name == name)
    }

    /// Intrinsic approval requirement of `name`
    fn approval_type(&self, name: &str) -> ApprovalType {
        self.tool_definition(name)
            .map(|d| d.approval_type)
            .unwrap_or(ApprovalType::Dangerous)
    }

    /// Whether `name` is on this provider's allow-list
    fn is_auto_approved(&self, name: &str) -> bool;

    /// Check presence of every required argument.
    ///
    /// A missing field is a validation failure, never a runtime error.
    fn validate_args(&self, call: &ToolCall) -> Result<(), ToolError> {
        match self.tool_definition(&call.tool_name) {
            Some(def) => DefaultToolValidator.validate(call, &def),
            None => Err(ToolError::not_found(format!("tool '{}'", call.tool_name))),
        }
    }

    /// Run the call. Failures are folded into the returned result.
    async fn execute(&self, call: &ToolCall, ctx: &mut ExecutionContext) -> ToolResult;
}

/// Lookup side of the registry, as seen by use cases
pub trait ToolRegistryPort: Send + Sync {
    fn tool_definitions(&self) -> Vec<ToolDefinition>;

    /// Owning provider of `name`, if any
    fn resolve(&self, name: &str) -> Option<Arc<dyn ToolProvider>>;

    fn has_tool(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }
}
