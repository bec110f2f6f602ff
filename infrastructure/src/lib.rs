//! Infrastructure layer for toolgate
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the built-in tools and their registry, the MCP bridge,
//! local file system and process adapters, configuration file loading and
//! the JSONL audit log.

pub mod config;
pub mod fs;
pub mod logging;
pub mod mcp;
pub mod process;
pub mod security;
pub mod tools;

// Re-export commonly used types
pub use config::{
    ApprovalMode, ConfigLoader, ConfigSource, ConfigValidationError, FileConfig,
};
pub use fs::LocalFileSystem;
pub use logging::JsonlAuditLogger;
pub use mcp::{McpConnection, McpServerRegistry, McpServerSpec, McpToolProvider};
pub use process::LocalProcessRunner;
pub use security::{PathGuard, PathViolation};
pub use tools::{BuiltinProvider, RegistryStats, ToolEnv, ToolRegistry, builtin_tool_definitions};
