//! Application layer for toolgate
//!
//! This crate contains the port definitions, the per-turn execution context,
//! the approval gate and the execute-tool-call use case.
//! It depends only on the domain layer.

pub mod context;
pub mod ports;
pub mod session;
pub mod use_cases;

// Re-export commonly used types
pub use context::{ExecutionContext, ResourceLimits};
pub use ports::{
    approval::{
        ApprovalDecision, ApprovalError, ApprovalPort, ApprovalRequest, AutoApprove, AutoReject,
        SignalApprover,
    },
    audit_logger::{AuditEvent, AuditLogger, NoAuditLogger},
    code_intelligence::{CodeIntelligencePort, NoCodeIntelligence},
    file_system::FileSystemPort,
    process::ProcessPort,
    tool_provider::{ToolProvider, ToolRegistryPort},
    tool_server::ToolServerPort,
};
pub use session::{ToolSession, TurnAbort};
pub use use_cases::approval_gate::{ApprovalGate, GateOutcome};
pub use use_cases::execute_tool_call::ExecuteToolCallUseCase;
