//! Port for the structured audit trail.
//!
//! Separate from `tracing` diagnostics: tracing carries human-readable
//! operation logs, this port records every tool call, approval request and
//! decision in a machine-readable form (JSONL).

use serde_json::Value;

/// A structured audit event.
///
/// Event types: `tool_call_requested`, `approval_requested`,
/// `approval_decided`, `tool_call_completed`.
pub struct AuditEvent {
    pub event_type: &'static str,
    pub payload: Value,
}

impl AuditEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Synchronous and non-fallible so audit problems never disturb execution.
pub trait AuditLogger: Send + Sync {
    fn log(&self, event: AuditEvent);
}

/// No-op implementation for tests and when auditing is disabled.
pub struct NoAuditLogger;

impl AuditLogger for NoAuditLogger {
    fn log(&self, _event: AuditEvent) {}
}
