//! Qualified MCP tool names: `mcp__<server_id>__<tool_name>`

use thiserror::Error;

pub const MCP_PREFIX: &str = "mcp";
pub const MCP_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum McpNameError {
    #[error("'{0}' is not an MCP tool name (expected mcp__<server>__<tool>)")]
    MissingPrefix(String),

    #[error("'{0}' has an empty server id")]
    EmptyServer(String),

    #[error("'{0}' has an empty tool name")]
    EmptyTool(String),

    #[error("'{0}' is missing the '__' separator between server and tool")]
    MissingSeparator(String),
}

/// A parsed qualified name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct McpToolName<'a> {
    pub server_id: &'a str,
    pub tool_name: &'a str,
}

impl<'a> McpToolName<'a> {
    /// Split a qualified name.
    ///
    /// The server id ends at the first separator, so tool names may
    /// themselves contain `__`.
    pub fn parse(name: &'a str) -> Result<Self, McpNameError> {
        let owned = || name.to_string();
        let rest = name
            .strip_prefix(MCP_PREFIX)
            .and_then(|r| r.strip_prefix(MCP_SEPARATOR))
            .ok_or_else(|| McpNameError::MissingPrefix(owned()))?;
        let (server_id, tool_name) = rest
            .split_once(MCP_SEPARATOR)
            .ok_or_else(|| McpNameError::MissingSeparator(owned()))?;
        if server_id.is_empty() {
            return Err(McpNameError::EmptyServer(owned()));
        }
        if tool_name.is_empty() {
            return Err(McpNameError::EmptyTool(owned()));
        }
        Ok(Self {
            server_id,
            tool_name,
        })
    }
}

pub fn qualified_name(server_id: &str, tool_name: &str) -> String {
    format!("{MCP_PREFIX}{MCP_SEPARATOR}{server_id}{MCP_SEPARATOR}{tool_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_names() {
        let parsed = McpToolName::parse("mcp__github__search_issues").unwrap();
        assert_eq!(parsed.server_id, "github");
        assert_eq!(parsed.tool_name, "search_issues");

        let nested = McpToolName::parse("mcp__fs__read__raw").unwrap();
        assert_eq!(nested.server_id, "fs");
        assert_eq!(nested.tool_name, "read__raw");

        assert_eq!(qualified_name("github", "search_issues"), "mcp__github__search_issues");
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(matches!(
            McpToolName::parse("read_file"),
            Err(McpNameError::MissingPrefix(_))
        ));
        assert!(matches!(
            McpToolName::parse("mcp____tool"),
            Err(McpNameError::EmptyServer(_))
        ));
        assert!(matches!(
            McpToolName::parse("mcp__github__"),
            Err(McpNameError::EmptyTool(_))
        ));
        assert!(matches!(
            McpToolName::parse("mcp__github"),
            Err(McpNameError::MissingSeparator(_))
        ));
    }
}
