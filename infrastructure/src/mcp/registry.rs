//! In-process MCP server table
//!
//! Servers are declared from configuration, then transports attach a live
//! [`McpConnection`] when they come up and detach it when they drop. The
//! table is what [`ToolServerPort::servers`] reports.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use toolgate_application::ports::tool_server::{
    RemoteTool, ServerStatus, ToolServerCall, ToolServerError, ToolServerInfo, ToolServerPort,
    ToolServerResponse,
};
use tracing::{debug, info, warn};

use super::naming::MCP_SEPARATOR;

/// A live link to one tool server
#[async_trait]
pub trait McpConnection: Send + Sync {
    fn status(&self) -> ServerStatus;

    fn tools(&self) -> Vec<RemoteTool>;

    async fn call_tool(
        &self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<ToolServerResponse, ToolServerError>;
}

/// Declared server, as read from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpServerSpec {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub auto_approve: Vec<String>,
}

impl McpServerSpec {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            enabled: true,
            auto_approve: Vec::new(),
        }
    }
}

struct ServerEntry {
    spec: McpServerSpec,
    connection: Option<Arc<dyn McpConnection>>,
}

impl ServerEntry {
    fn info(&self) -> ToolServerInfo {
        let (status, tools) = match (&self.connection, self.spec.enabled) {
            (Some(conn), true) => {
                let status = conn.status();
                let tools = if status == ServerStatus::Connected {
                    conn.tools()
                } else {
                    Vec::new()
                };
                (status, tools)
            }
            _ => (ServerStatus::Disconnected, Vec::new()),
        };
        ToolServerInfo {
            id: self.spec.id.clone(),
            name: self.spec.name.clone(),
            status,
            tools,
            auto_approve: self.spec.auto_approve.clone(),
        }
    }
}

#[derive(Default)]
pub struct McpServerRegistry {
    servers: RwLock<BTreeMap<String, ServerEntry>>,
}

impl McpServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a server. Ids must be non-empty and free of the `__` separator.
    pub fn declare(&self, spec: McpServerSpec) -> Result<(), ToolServerError> {
        if spec.id.is_empty() || spec.id.contains(MCP_SEPARATOR) {
            return Err(ToolServerError::Transport(format!(
                "invalid server id '{}': must be non-empty and must not contain '{}'",
                spec.id, MCP_SEPARATOR
            )));
        }
        let mut servers = self.write();
        debug!(server = %spec.id, enabled = spec.enabled, "Declared MCP server");
        let connection = servers.remove(&spec.id).and_then(|e| e.connection);
        servers.insert(spec.id.clone(), ServerEntry { spec, connection });
        Ok(())
    }

    /// Attach a live connection to a declared server
    pub fn attach(
        &self,
        server_id: &str,
        connection: Arc<dyn McpConnection>,
    ) -> Result<(), ToolServerError> {
        let mut servers = self.write();
        let entry = servers
            .get_mut(server_id)
            .ok_or_else(|| ToolServerError::UnknownServer(server_id.to_string()))?;
        if !entry.spec.enabled {
            warn!(server = server_id, "Attaching a connection to a disabled MCP server");
        }
        info!(server = server_id, tools = connection.tools().len(), "MCP server attached");
        entry.connection = Some(connection);
        Ok(())
    }

    /// Drop the connection of `server_id`; returns whether one was attached
    pub fn detach(&self, server_id: &str) -> bool {
        let detached = self
            .write()
            .get_mut(server_id)
            .and_then(|e| e.connection.take())
            .is_some();
        if detached {
            info!(server = server_id, "MCP server detached");
        }
        detached
    }

    pub fn server_ids(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, ServerEntry>> {
        self.servers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, ServerEntry>> {
        self.servers.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ToolServerPort for McpServerRegistry {
    fn servers(&self) -> Vec<ToolServerInfo> {
        self.read().values().map(ServerEntry::info).collect()
    }

    async fn call_tool(
        &self,
        call: &ToolServerCall,
    ) -> Result<ToolServerResponse, ToolServerError> {
        let connection = {
            let servers = self.read();
            let entry = servers
                .get(&call.server_id)
                .ok_or_else(|| ToolServerError::UnknownServer(call.server_id.clone()))?;
            match (&entry.connection, entry.spec.enabled) {
                (Some(conn), true) if conn.status() == ServerStatus::Connected => conn.clone(),
                _ => return Err(ToolServerError::NotConnected(call.server_id.clone())),
            }
        };
        connection
            .call_tool(&call.tool_name, call.arguments.clone())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolgate_application::ports::tool_server::RawContent;

    struct Echo;

    #[async_trait]
    impl McpConnection for Echo {
        fn status(&self) -> ServerStatus {
            ServerStatus::Connected
        }

        fn tools(&self) -> Vec<RemoteTool> {
            vec![RemoteTool {
                name: "echo".into(),
                description: "Echo arguments".into(),
                input_schema: json!({"type": "object"}),
            }]
        }

        async fn call_tool(
            &self,
            tool_name: &str,
            arguments: Value,
        ) -> Result<ToolServerResponse, ToolServerError> {
            Ok(ToolServerResponse {
                success: true,
                is_error: false,
                content: vec![RawContent::text(format!("{tool_name}: {arguments}"))],
            })
        }
    }

    fn call(server: &str) -> ToolServerCall {
        ToolServerCall {
            server_id: server.into(),
            tool_name: "echo".into(),
            arguments: json!({"x": 1}),
        }
    }

    #[test]
    fn separator_in_server_id_is_rejected() {
        let registry = McpServerRegistry::new();
        assert!(registry.declare(McpServerSpec::new("my__server")).is_err());
        assert!(registry.declare(McpServerSpec::new("")).is_err());
        assert!(registry.declare(McpServerSpec::new("github")).is_ok());
    }

    #[tokio::test]
    async fn attach_and_detach_drive_status() {
        let registry = McpServerRegistry::new();
        registry.declare(McpServerSpec::new("local")).unwrap();
        assert_eq!(registry.servers()[0].status, ServerStatus::Disconnected);
        assert!(matches!(
            registry.call_tool(&call("local")).await,
            Err(ToolServerError::NotConnected(_))
        ));

        registry.attach("local", Arc::new(Echo)).unwrap();
        let info = &registry.servers()[0];
        assert!(info.is_connected());
        assert_eq!(info.tools[0].name, "echo");

        let response = registry.call_tool(&call("local")).await.unwrap();
        assert_eq!(response.content[0].text.as_deref(), Some("echo: {\"x\":1}"));

        assert!(registry.detach("local"));
        assert!(!registry.servers()[0].is_connected());
    }

    #[tokio::test]
    async fn disabled_servers_stay_disconnected() {
        let registry = McpServerRegistry::new();
        let mut spec = McpServerSpec::new("off");
        spec.enabled = false;
        registry.declare(spec).unwrap();
        registry.attach("off", Arc::new(Echo)).unwrap();
        assert!(!registry.servers()[0].is_connected());
        assert!(registry.call_tool(&call("off")).await.is_err());

        assert!(matches!(
            registry.attach("missing", Arc::new(Echo)),
            Err(ToolServerError::UnknownServer(_))
        ));
    }
}
