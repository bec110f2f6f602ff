//! MCP bridge
//!
//! Exposes tools from external tool servers as `mcp__<server>__<tool>`.
//! [`McpServerRegistry`] keeps the live server table that transports attach
//! to; [`McpToolProvider`] adapts that table to the tool provider contract.

mod naming;
mod provider;
mod registry;

pub use naming::{MCP_PREFIX, MCP_SEPARATOR, McpNameError, McpToolName, qualified_name};
pub use provider::{MCP_PROVIDER_ID, McpToolProvider};
pub use registry::{McpConnection, McpServerRegistry, McpServerSpec};
