//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Conversion into runtime types happens after [`FileConfig::validate`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use toolgate_application::ResourceLimits;

use crate::mcp::{MCP_SEPARATOR, McpServerSpec};
use crate::tools::DEFAULT_PLAN_FILE;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("limits.{0} cannot be 0")]
    ZeroTimeout(&'static str),

    #[error("limits.read_concurrency cannot be 0")]
    ZeroConcurrency,

    #[error("approval.mode: unknown value '{0}' (expected interactive, auto_approve or auto_reject)")]
    UnknownApprovalMode(String),

    #[error("mcp.servers.{0}: server ids must not be empty or contain '__'")]
    InvalidServerId(String),
}

/// How dangerous calls are decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApprovalMode {
    /// Ask the user
    #[default]
    Interactive,
    AutoApprove,
    AutoReject,
}

impl ApprovalMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "interactive" | "ask" => Some(ApprovalMode::Interactive),
            "auto_approve" | "approve" | "yes" => Some(ApprovalMode::AutoApprove),
            "auto_reject" | "reject" | "no" => Some(ApprovalMode::AutoReject),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalMode::Interactive => "interactive",
            ApprovalMode::AutoApprove => "auto_approve",
            ApprovalMode::AutoReject => "auto_reject",
        }
    }
}

/// `[workspace]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWorkspaceConfig {
    /// Workspace root; the current directory when unset
    pub root: Option<PathBuf>,
    /// Plan artifact, relative to the root
    pub plan_file: PathBuf,
}

impl Default for FileWorkspaceConfig {
    fn default() -> Self {
        Self {
            root: None,
            plan_file: PathBuf::from(DEFAULT_PLAN_FILE),
        }
    }
}

/// `[limits]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLimitsConfig {
    pub command_timeout_secs: u64,
    pub diagnostics_timeout_ms: u64,
    pub read_concurrency: usize,
    pub max_read_bytes: u64,
    pub max_output_bytes: usize,
}

impl Default for FileLimitsConfig {
    fn default() -> Self {
        let limits = ResourceLimits::default();
        Self {
            command_timeout_secs: limits.command_timeout.as_secs(),
            diagnostics_timeout_ms: limits.diagnostics_timeout.as_millis() as u64,
            read_concurrency: limits.read_concurrency,
            max_read_bytes: limits.max_read_bytes,
            max_output_bytes: limits.max_output_bytes,
        }
    }
}

impl FileLimitsConfig {
    pub fn to_resource_limits(&self) -> ResourceLimits {
        ResourceLimits {
            command_timeout: Duration::from_secs(self.command_timeout_secs),
            diagnostics_timeout: Duration::from_millis(self.diagnostics_timeout_ms),
            read_concurrency: self.read_concurrency,
            max_read_bytes: self.max_read_bytes,
            max_output_bytes: self.max_output_bytes,
        }
    }
}

/// `[approval]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileApprovalConfig {
    /// interactive | auto_approve | auto_reject
    pub mode: String,
    /// Built-in tools that never ask, even when dangerous
    pub auto_approve: Vec<String>,
}

impl Default for FileApprovalConfig {
    fn default() -> Self {
        Self {
            mode: ApprovalMode::Interactive.as_str().to_string(),
            auto_approve: Vec::new(),
        }
    }
}

impl FileApprovalConfig {
    pub fn parse_mode(&self) -> Result<ApprovalMode, ConfigValidationError> {
        ApprovalMode::parse(&self.mode)
            .ok_or_else(|| ConfigValidationError::UnknownApprovalMode(self.mode.clone()))
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Write the JSONL audit trail
    pub audit: bool,
    /// Audit file, relative paths resolve against the workspace root
    pub audit_log: PathBuf,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            audit: true,
            audit_log: PathBuf::from(".toolgate/audit.jsonl"),
        }
    }
}

/// `[mcp.servers.<id>]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMcpServerConfig {
    pub enabled: bool,
    /// Display name; the id when unset
    pub name: Option<String>,
    /// Raw tool names that skip confirmation
    pub auto_approve: Vec<String>,
}

impl Default for FileMcpServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: None,
            auto_approve: Vec::new(),
        }
    }
}

/// `[mcp]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMcpConfig {
    pub servers: BTreeMap<String, FileMcpServerConfig>,
}

impl FileMcpConfig {
    pub fn server_specs(&self) -> Vec<McpServerSpec> {
        self.servers
            .iter()
            .map(|(id, server)| McpServerSpec {
                id: id.clone(),
                name: server.name.clone().unwrap_or_else(|| id.clone()),
                enabled: server.enabled,
                auto_approve: server.auto_approve.clone(),
            })
            .collect()
    }
}

/// Complete file configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub workspace: FileWorkspaceConfig,
    pub limits: FileLimitsConfig,
    pub approval: FileApprovalConfig,
    pub logging: FileLoggingConfig,
    pub mcp: FileMcpConfig,
}

impl FileConfig {
    /// Check values serde cannot rule out
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.limits.command_timeout_secs == 0 {
            return Err(ConfigValidationError::ZeroTimeout("command_timeout_secs"));
        }
        if self.limits.diagnostics_timeout_ms == 0 {
            return Err(ConfigValidationError::ZeroTimeout("diagnostics_timeout_ms"));
        }
        if self.limits.read_concurrency == 0 {
            return Err(ConfigValidationError::ZeroConcurrency);
        }
        self.approval.parse_mode()?;
        if let Some(id) = self
            .mcp
            .servers
            .keys()
            .find(|id| id.is_empty() || id.contains(MCP_SEPARATOR))
        {
            return Err(ConfigValidationError::InvalidServerId(id.clone()));
        }
        Ok(())
    }

    pub fn to_resource_limits(&self) -> ResourceLimits {
        self.limits.to_resource_limits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.to_resource_limits(), ResourceLimits::default());
        assert_eq!(config.workspace.plan_file, PathBuf::from(".toolgate/plan.json"));
        assert_eq!(config.approval.parse_mode(), Ok(ApprovalMode::Interactive));
    }

    #[test]
    fn parse_full_toml() {
        let config: FileConfig = toml::from_str(
            r#"
            [workspace]
            root = "/srv/project"

            [limits]
            command_timeout_secs = 10
            read_concurrency = 2

            [approval]
            mode = "auto_reject"
            auto_approve = ["create_directory"]

            [mcp.servers.github]
            auto_approve = ["search_issues"]

            [mcp.servers.jira]
            enabled = false
            name = "Jira Cloud"
            "#,
        )
        .unwrap();

        assert_eq!(config.workspace.root, Some(PathBuf::from("/srv/project")));
        assert_eq!(config.limits.command_timeout_secs, 10);
        assert_eq!(config.limits.diagnostics_timeout_ms, 3000);
        assert_eq!(config.approval.parse_mode(), Ok(ApprovalMode::AutoReject));

        let specs = config.mcp.server_specs();
        assert_eq!(specs[0].id, "github");
        assert!(specs[0].enabled);
        assert_eq!(specs[1].name, "Jira Cloud");
        assert!(!specs[1].enabled);
    }

    #[test]
    fn validation_errors() {
        let mut config = FileConfig::default();
        config.limits.command_timeout_secs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::ZeroTimeout("command_timeout_secs"))
        );

        let mut config = FileConfig::default();
        config.limits.read_concurrency = 0;
        assert_eq!(config.validate(), Err(ConfigValidationError::ZeroConcurrency));

        let mut config = FileConfig::default();
        config.approval.mode = "sometimes".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::UnknownApprovalMode(_))
        ));

        let mut config = FileConfig::default();
        config
            .mcp
            .servers
            .insert("my__server".into(), FileMcpServerConfig::default());
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvalidServerId("my__server".into()))
        );
    }

    #[test]
    fn approval_mode_aliases() {
        assert_eq!(ApprovalMode::parse("auto-approve"), Some(ApprovalMode::AutoApprove));
        assert_eq!(ApprovalMode::parse("ASK"), Some(ApprovalMode::Interactive));
        assert_eq!(ApprovalMode::parse("maybe"), None);
    }
}
