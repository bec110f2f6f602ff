//! MCP tool provider
//!
//! Catalogs are read from the live server table on every lookup: a tool is
//! listed and callable only while its server reports `connected`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use toolgate_application::ports::tool_server::{
    RawContent, RemoteTool, ToolServerCall, ToolServerInfo, ToolServerPort,
};
use toolgate_application::{ExecutionContext, ToolProvider};
use toolgate_domain::{
    ApprovalType, ParameterSchema, RichContentItem, ToolCall, ToolDefinition, ToolError,
    ToolResult, classify_binary, classify_resource, classify_text,
};
use tracing::{debug, info};

use super::naming::{McpToolName, qualified_name};
use crate::tools::cancellable;

pub const MCP_PROVIDER_ID: &str = "mcp";

pub struct McpToolProvider {
    servers: Arc<dyn ToolServerPort>,
}

impl McpToolProvider {
    pub fn new(servers: Arc<dyn ToolServerPort>) -> Self {
        Self { servers }
    }

    fn connected_server(&self, server_id: &str) -> Option<ToolServerInfo> {
        self.servers
            .servers()
            .into_iter()
            .find(|s| s.id == server_id && s.is_connected())
    }
}

fn definition(server: &ToolServerInfo, tool: &RemoteTool) -> ToolDefinition {
    let approval = if server.auto_approve.iter().any(|t| t == &tool.name) {
        ApprovalType::None
    } else {
        ApprovalType::Dangerous
    };
    let description = if tool.description.is_empty() {
        format!("{} (from {})", tool.name, server.name)
    } else {
        tool.description.clone()
    };
    ToolDefinition::new(qualified_name(&server.id, &tool.name), description, approval)
        .with_schema(ParameterSchema::from_json(&tool.input_schema))
}

/// Classify one wire content item
fn classify(raw: &RawContent) -> Option<RichContentItem> {
    let mime = raw.mime_type.as_deref();
    match raw.content_type.as_str() {
        "image" | "audio" | "blob" => Some(classify_binary(
            mime.unwrap_or("application/octet-stream"),
            raw.data.clone(),
            raw.uri.clone(),
        )),
        "resource" | "resource_link" => raw
            .uri
            .as_deref()
            .map(|uri| classify_resource(uri, mime, raw.text.as_deref()))
            .or_else(|| raw.text.as_deref().map(|t| classify_text(t, mime))),
        _ => raw.text.as_deref().map(|t| classify_text(t, mime)),
    }
}

#[async_trait]
impl ToolProvider for McpToolProvider {
    fn id(&self) -> &str {
        MCP_PROVIDER_ID
    }

    fn display_name(&self) -> &str {
        "MCP Servers"
    }

    fn has_tool(&self, name: &str) -> bool {
        let Ok(parsed) = McpToolName::parse(name) else {
            return false;
        };
        self.connected_server(parsed.server_id)
            .is_some_and(|s| s.tools.iter().any(|t| t.name == parsed.tool_name))
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.servers
            .servers()
            .iter()
            .filter(|s| s.is_connected())
            .flat_map(|s| s.tools.iter().map(move |t| definition(s, t)))
            .collect()
    }

    fn tool_definition(&self, name: &str) -> Option<ToolDefinition> {
        let parsed = McpToolName::parse(name).ok()?;
        let server = self.connected_server(parsed.server_id)?;
        let tool = server.tools.iter().find(|t| t.name == parsed.tool_name)?;
        Some(definition(&server, tool))
    }

    fn is_auto_approved(&self, name: &str) -> bool {
        McpToolName::parse(name)
            .ok()
            .and_then(|p| {
                self.connected_server(p.server_id)
                    .map(|s| s.auto_approve.iter().any(|t| t == p.tool_name))
            })
            .unwrap_or(false)
    }

    async fn execute(&self, call: &ToolCall, ctx: &mut ExecutionContext) -> ToolResult {
        let name = call.tool_name.as_str();
        let parsed = match McpToolName::parse(name) {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(name, ToolError::external_provider(e.to_string())),
        };
        if self.connected_server(parsed.server_id).is_none() {
            return ToolResult::failure(
                name,
                ToolError::external_provider(format!(
                    "MCP server '{}' is not connected",
                    parsed.server_id
                )),
            );
        }

        let request = ToolServerCall {
            server_id: parsed.server_id.to_string(),
            tool_name: parsed.tool_name.to_string(),
            arguments: Value::Object(call.arguments.clone().into_iter().collect()),
        };
        debug!(server = parsed.server_id, tool = parsed.tool_name, "Calling MCP tool");

        let pending = self.servers.call_tool(&request);
        let response = match cancellable(ctx.cancellation(), pending).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return ToolResult::failure(
                    name,
                    ToolError::external_provider(format!(
                        "MCP tool '{}' on server '{}' failed: {}",
                        parsed.tool_name, parsed.server_id, e
                    )),
                );
            }
            Err(e) => return ToolResult::failure(name, e),
        };

        let items: Vec<RichContentItem> = response.content.iter().filter_map(classify).collect();
        let text = response
            .content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");

        if response.success && !response.is_error {
            info!(server = parsed.server_id, tool = parsed.tool_name, "MCP tool succeeded");
            let output = if text.is_empty() {
                items
                    .iter()
                    .map(RichContentItem::summary)
                    .collect::<Vec<_>>()
                    .join("\n")
            } else {
                text
            };
            ToolResult::success(name, output).with_rich_content(items)
        } else {
            let message = if text.is_empty() {
                format!("MCP tool '{}' reported an error", parsed.tool_name)
            } else {
                text
            };
            ToolResult::failure(name, ToolError::external_provider(message))
                .with_rich_content(items)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use toolgate_application::ResourceLimits;
    use toolgate_application::ports::tool_server::{
        ServerStatus, ToolServerError, ToolServerResponse,
    };
    use toolgate_domain::{ContentKind, ErrorKind};

    struct StubServers {
        servers: Vec<ToolServerInfo>,
        response: ToolServerResponse,
        calls: Mutex<Vec<ToolServerCall>>,
    }

    #[async_trait]
    impl ToolServerPort for StubServers {
        fn servers(&self) -> Vec<ToolServerInfo> {
            self.servers.clone()
        }

        async fn call_tool(
            &self,
            call: &ToolServerCall,
        ) -> Result<ToolServerResponse, ToolServerError> {
            self.calls.lock().unwrap().push(call.clone());
            Ok(self.response.clone())
        }
    }

    fn server(id: &str, status: ServerStatus) -> ToolServerInfo {
        ToolServerInfo {
            id: id.into(),
            name: id.into(),
            status,
            tools: vec![
                RemoteTool {
                    name: "search_issues".into(),
                    description: "Search issues".into(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {"query": {"type": "string"}},
                        "required": ["query"]
                    }),
                },
                RemoteTool {
                    name: "create_issue".into(),
                    description: String::new(),
                    input_schema: json!({"type": "object"}),
                },
            ],
            auto_approve: vec!["search_issues".into()],
        }
    }

    fn stub(response: ToolServerResponse) -> Arc<StubServers> {
        Arc::new(StubServers {
            servers: vec![
                server("github", ServerStatus::Connected),
                server("jira", ServerStatus::Disconnected),
            ],
            response,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn ok(content: Vec<RawContent>) -> ToolServerResponse {
        ToolServerResponse {
            success: true,
            is_error: false,
            content,
        }
    }

    #[test]
    fn only_connected_servers_are_listed() {
        let provider = McpToolProvider::new(stub(ok(vec![])));
        let names: Vec<_> = provider
            .tool_definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            ["mcp__github__search_issues", "mcp__github__create_issue"]
        );
        assert!(provider.has_tool("mcp__github__create_issue"));
        assert!(!provider.has_tool("mcp__jira__create_issue"));
        assert!(!provider.has_tool("read_file"));
    }

    #[test]
    fn approval_follows_server_allow_list() {
        let provider = McpToolProvider::new(stub(ok(vec![])));
        assert_eq!(
            provider.approval_type("mcp__github__search_issues"),
            ApprovalType::None
        );
        assert_eq!(
            provider.approval_type("mcp__github__create_issue"),
            ApprovalType::Dangerous
        );
        assert!(provider.is_auto_approved("mcp__github__search_issues"));
    }

    #[test]
    fn remote_schema_drives_validation() {
        let provider = McpToolProvider::new(stub(ok(vec![])));
        let err = provider
            .validate_args(&ToolCall::new("mcp__github__search_issues"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn forwards_raw_name_and_classifies_content() {
        let servers = stub(ok(vec![
            RawContent::text("{\"total\": 2}"),
            RawContent {
                content_type: "image".into(),
                mime_type: Some("image/png".into()),
                data: Some("iVBOR".into()),
                ..Default::default()
            },
        ]));
        let provider = McpToolProvider::new(servers.clone());
        let mut ctx = ExecutionContext::new(None, ResourceLimits::default());
        let call = ToolCall::new("mcp__github__search_issues").with_arg("query", "bug");
        let result = provider.execute(&call, &mut ctx).await;

        assert!(result.is_success());
        assert_eq!(result.output(), "{\"total\": 2}");
        let kinds: Vec<_> = result
            .rich_content
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|i| i.kind())
            .collect();
        assert_eq!(kinds, [ContentKind::Json, ContentKind::Image]);

        let calls = servers.calls.lock().unwrap();
        assert_eq!(calls[0].server_id, "github");
        assert_eq!(calls[0].tool_name, "search_issues");
        assert_eq!(calls[0].arguments["query"], "bug");
    }

    #[tokio::test]
    async fn server_error_text_is_preserved() {
        let provider = McpToolProvider::new(stub(ToolServerResponse {
            success: true,
            is_error: true,
            content: vec![RawContent::text("rate limited: retry in 30s")],
        }));
        let mut ctx = ExecutionContext::new(None, ResourceLimits::default());
        let result = provider
            .execute(&ToolCall::new("mcp__github__create_issue"), &mut ctx)
            .await;
        assert!(!result.is_success());
        assert_eq!(result.error_kind(), Some(ErrorKind::ExternalProvider));
        assert_eq!(result.error().unwrap().message, "rate limited: retry in 30s");
    }

    #[tokio::test]
    async fn disconnected_server_is_external_failure() {
        let provider = McpToolProvider::new(stub(ok(vec![])));
        let mut ctx = ExecutionContext::new(None, ResourceLimits::default());
        let result = provider
            .execute(&ToolCall::new("mcp__jira__create_issue"), &mut ctx)
            .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::ExternalProvider));

        let result = provider.execute(&ToolCall::new("mcp__jira"), &mut ctx).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::ExternalProvider));
    }
}
