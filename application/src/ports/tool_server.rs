//! External tool server port (MCP).
//!
//! Only the result shapes are modelled here; transports live elsewhere and
//! report live server state through [`ToolServerPort::servers`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    Connected,
    Connecting,
    Disconnected,
    Failed,
}

/// A tool as advertised by a server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "inputSchema", alias = "input_schema")]
    pub input_schema: serde_json::Value,
}

/// Snapshot of one server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolServerInfo {
    pub id: String,
    pub name: String,
    pub status: ServerStatus,
    #[serde(default)]
    pub tools: Vec<RemoteTool>,
    /// Raw tool names that skip confirmation
    #[serde(default)]
    pub auto_approve: Vec<String>,
}

impl ToolServerInfo {
    pub fn is_connected(&self) -> bool {
        self.status == ServerStatus::Connected
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolServerCall {
    pub server_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// One content item as delivered on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(
        default,
        rename = "mimeType",
        alias = "mime_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Base64 payload for binary content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl RawContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolServerResponse {
    pub success: bool,
    #[serde(default, rename = "isError", alias = "is_error")]
    pub is_error: bool,
    #[serde(default)]
    pub content: Vec<RawContent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolServerError {
    #[error("unknown tool server '{0}'")]
    UnknownServer(String),

    #[error("tool server '{0}' is not connected")]
    NotConnected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait ToolServerPort: Send + Sync {
    fn servers(&self) -> Vec<ToolServerInfo>;

    async fn call_tool(&self, call: &ToolServerCall)
    -> Result<ToolServerResponse, ToolServerError>;
}
