//! Ports (interfaces) for external dependencies
//!
//! Implementations (adapters) live in the infrastructure and presentation
//! layers.

pub mod approval;
pub mod audit_logger;
pub mod code_intelligence;
pub mod file_system;
pub mod process;
pub mod tool_provider;
pub mod tool_server;

pub use approval::{
    ApprovalDecision, ApprovalError, ApprovalPort, ApprovalRequest, AutoApprove, AutoReject,
    SignalApprover,
};
pub use audit_logger::{AuditEvent, AuditLogger, NoAuditLogger};
pub use code_intelligence::{
    CodeIntelError, CodeIntelligencePort, Diagnostic, Location, NoCodeIntelligence, Position,
    SymbolInfo,
};
pub use file_system::{DirEntry, FileSystemPort, FsError, SearchKind, SearchMatch, SearchQuery};
pub use process::{CommandOutput, CommandRequest, ProcessError, ProcessPort};
pub use tool_provider::{ToolProvider, ToolRegistryPort};
pub use tool_server::{
    RawContent, RemoteTool, ServerStatus, ToolServerCall, ToolServerError, ToolServerInfo,
    ToolServerPort, ToolServerResponse,
};
