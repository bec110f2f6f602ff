//! Tool domain module
//!
//! Core abstractions for turning a model's requested actions into validated,
//! approval-gated operations.
//!
//! ```text
//! ┌────────────────┐    ┌──────────────┐    ┌──────────────────┐    ┌────────────┐
//! │ ToolDefinition │───▶│ ToolCall     │───▶│ ToolExecution    │───▶│ ToolResult │
//! │ (schema)       │    │ (invocation) │    │ (approval state) │    │ (output)   │
//! └────────────────┘    └──────────────┘    └──────────────────┘    └────────────┘
//! ```
//!
//! # Approval
//!
//! | ApprovalType | Examples | Confirmation |
//! |--------------|----------|--------------|
//! | **None** | `read_file`, `glob_search`, `get_plan` | never |
//! | **Dangerous** | `write_file`, `run_command`, MCP tools | unless allow-listed |
//!
//! The async provider trait and the approval gate live in the application
//! layer; this module holds only pure data and transitions.

pub mod approval;
pub mod entities;
pub mod traits;
pub mod value_objects;

pub use approval::{ApprovalState, ToolExecution, TransitionError};
pub use entities::{ApprovalType, ParameterSchema, ToolCall, ToolDefinition, ToolParameter};
pub use traits::{DefaultToolValidator, ToolValidator};
pub use value_objects::{ErrorKind, ToolError, ToolResult, ToolResultMetadata};
