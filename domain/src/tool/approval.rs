//! Approval state machine for a single tool call.
//!
//! ```text
//! Pending ──> Running ──> Success
//!    │           └──────> Error
//!    └──> AwaitingApproval ──> Running
//!                  ├─────────> Rejected
//!                  └─────────> Aborted
//! ```
//!
//! `Pending -> Running` is only legal when the call needs no confirmation
//! (see [`ToolExecution::start`]); dangerous calls must pass through
//! `AwaitingApproval`. Every transition returns `Err` when applied from the
//! wrong state, leaving the execution untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{ApprovalType, ToolCall};
use super::value_objects::ToolResult;

/// Phase of a tracked tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    AwaitingApproval,
    Running,
    Success,
    Error,
    Rejected,
    Aborted,
}

impl ApprovalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalState::Pending => "pending",
            ApprovalState::AwaitingApproval => "awaiting_approval",
            ApprovalState::Running => "running",
            ApprovalState::Success => "success",
            ApprovalState::Error => "error",
            ApprovalState::Rejected => "rejected",
            ApprovalState::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApprovalState::Success
                | ApprovalState::Error
                | ApprovalState::Rejected
                | ApprovalState::Aborted
        )
    }
}

impl std::fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition for '{tool_name}': {from} -> {to}")]
pub struct TransitionError {
    pub tool_name: String,
    pub from: ApprovalState,
    pub to: ApprovalState,
}

/// A tool call tracked through approval and execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecution {
    pub id: String,
    pub call: ToolCall,
    pub approval_type: ApprovalType,
    /// Whether the owning provider allow-lists this tool
    pub auto_approved: bool,
    state: ApprovalState,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    finished_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejection_reason: Option<String>,
}

impl ToolExecution {
    pub fn new(
        id: impl Into<String>,
        call: ToolCall,
        approval_type: ApprovalType,
        auto_approved: bool,
    ) -> Self {
        Self {
            id: id.into(),
            call,
            approval_type,
            auto_approved,
            state: ApprovalState::Pending,
            started_at: None,
            finished_at: None,
            rejection_reason: None,
        }
    }

    pub fn state(&self) -> ApprovalState {
        self.state
    }

    pub fn tool_name(&self) -> &str {
        &self.call.tool_name
    }

    /// Whether the call must wait for a human decision before running
    pub fn needs_approval(&self) -> bool {
        self.approval_type.requires_confirmation() && !self.auto_approved
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    /// Duration in milliseconds (terminal states that actually ran)
    pub fn duration_ms(&self) -> Option<u64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some(end.saturating_sub(start)),
            _ => None,
        }
    }

    /// Leave `Pending`: straight to `Running` when no confirmation is needed,
    /// otherwise into `AwaitingApproval`. Returns the new state.
    pub fn start(&mut self) -> Result<ApprovalState, TransitionError> {
        if self.needs_approval() {
            self.transition(ApprovalState::Pending, ApprovalState::AwaitingApproval)?;
        } else {
            self.transition(ApprovalState::Pending, ApprovalState::Running)?;
            self.started_at = Some(current_timestamp());
        }
        Ok(self.state)
    }

    pub fn approve(&mut self) -> Result<(), TransitionError> {
        self.transition(ApprovalState::AwaitingApproval, ApprovalState::Running)?;
        self.started_at = Some(current_timestamp());
        Ok(())
    }

    pub fn reject(&mut self, reason: Option<String>) -> Result<(), TransitionError> {
        self.transition(ApprovalState::AwaitingApproval, ApprovalState::Rejected)?;
        self.rejection_reason = reason;
        self.finished_at = Some(current_timestamp());
        Ok(())
    }

    pub fn abort(&mut self) -> Result<(), TransitionError> {
        self.transition(ApprovalState::AwaitingApproval, ApprovalState::Aborted)?;
        self.finished_at = Some(current_timestamp());
        Ok(())
    }

    /// `Running -> Success | Error` depending on the result
    pub fn complete(&mut self, result: &ToolResult) -> Result<(), TransitionError> {
        let to = if result.is_success() {
            ApprovalState::Success
        } else {
            ApprovalState::Error
        };
        self.transition(ApprovalState::Running, to)?;
        self.finished_at = Some(current_timestamp());
        Ok(())
    }

    fn transition(
        &mut self,
        from: ApprovalState,
        to: ApprovalState,
    ) -> Result<(), TransitionError> {
        if self.state != from {
            return Err(TransitionError {
                tool_name: self.call.tool_name.clone(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
