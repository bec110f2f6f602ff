//! Approval gate: suspends dangerous tool calls until a decision arrives.
//!
//! ```text
//! ToolExecution::start()
//!        │
//!        ├── Running ─────────────────────────────▶ Proceed
//!        │
//!        └── AwaitingApproval
//!               │  (queue: one outstanding request per session, FIFO)
//!               ▼
//!        ApprovalPort::request_approval()  ◀── raced against abort signal
//!               │
//!               ├── Approve ──▶ Running ──────────▶ Proceed
//!               ├── Reject ───▶ Rejected ─────────▶ Rejected
//!               └── abort ────▶ Aborted ──────────▶ Aborted
//! ```

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use toolgate_domain::{ApprovalState, ToolExecution};
use tracing::{info, warn};

use crate::ports::approval::{ApprovalDecision, ApprovalError, ApprovalPort, ApprovalRequest};
use crate::ports::audit_logger::{AuditEvent, AuditLogger};

/// What the caller should do with the call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Proceed,
    Rejected(Option<String>),
    Aborted,
}

pub struct ApprovalGate {
    approver: Arc<dyn ApprovalPort>,
    audit: Arc<dyn AuditLogger>,
    /// Held for the whole time a request is outstanding
    slot: Mutex<()>,
}

impl ApprovalGate {
    pub fn new(approver: Arc<dyn ApprovalPort>, audit: Arc<dyn AuditLogger>) -> Self {
        Self {
            approver,
            audit,
            slot: Mutex::new(()),
        }
    }

    /// Move `execution` out of `Pending`, waiting for approval when needed.
    ///
    /// On return the execution is `Running` (for `Proceed`) or in a terminal
    /// state (`Rejected` / `Aborted`).
    pub async fn admit(
        &self,
        execution: &mut ToolExecution,
        provider_id: &str,
        description: &str,
        cancel: &CancellationToken,
    ) -> GateOutcome {
        match execution.start() {
            Ok(ApprovalState::Running) => return GateOutcome::Proceed,
            Ok(_) => {}
            Err(e) => {
                warn!("Approval gate: {}", e);
                return GateOutcome::Rejected(Some(e.to_string()));
            }
        }

        // Wait for our turn; a second dangerous call queues behind the first
        let _slot = tokio::select! {
            guard = self.slot.lock() => guard,
            _ = cancel.cancelled() => return self.abort(execution),
        };
        if cancel.is_cancelled() {
            return self.abort(execution);
        }

        let request = ApprovalRequest {
            id: execution.id.clone(),
            tool_name: execution.tool_name().to_string(),
            provider_id: provider_id.to_string(),
            arguments: execution.call.arguments.clone(),
            description: description.to_string(),
        };
        self.audit.log(AuditEvent::new(
            "approval_requested",
            serde_json::json!({
                "id": request.id,
                "tool": request.tool_name,
                "provider": request.provider_id,
                "arguments": request.arguments,
            }),
        ));
        info!("Awaiting approval for {} ({})", request.tool_name, request.id);

        let decision = tokio::select! {
            decision = self.approver.request_approval(&request) => decision,
            _ = cancel.cancelled() => Err(ApprovalError::Cancelled),
        };

        match decision {
            Ok(ApprovalDecision::Approve) => {
                if let Err(e) = execution.approve() {
                    warn!("Approval gate: {}", e);
                    return GateOutcome::Rejected(Some(e.to_string()));
                }
                self.log_decision(&request, "approved", None);
                GateOutcome::Proceed
            }
            Ok(ApprovalDecision::Reject { reason }) => self.reject(execution, &request, reason),
            Err(ApprovalError::Cancelled) => {
                self.log_decision(&request, "aborted", None);
                self.abort(execution)
            }
            Err(e) => {
                warn!("Approval for {} failed: {}", request.tool_name, e);
                self.reject(execution, &request, Some(format!("approval unavailable: {}", e)))
            }
        }
    }

    fn reject(
        &self,
        execution: &mut ToolExecution,
        request: &ApprovalRequest,
        reason: Option<String>,
    ) -> GateOutcome {
        if let Err(e) = execution.reject(reason.clone()) {
            warn!("Approval gate: {}", e);
        }
        self.log_decision(request, "rejected", reason.as_deref());
        info!("Rejected {} ({})", request.tool_name, request.id);
        GateOutcome::Rejected(reason)
    }

    fn abort(&self, execution: &mut ToolExecution) -> GateOutcome {
        if let Err(e) = execution.abort() {
            warn!("Approval gate: {}", e);
        }
        GateOutcome::Aborted
    }

    fn log_decision(&self, request: &ApprovalRequest, decision: &str, reason: Option<&str>) {
        self.audit.log(AuditEvent::new(
            "approval_decided",
            serde_json::json!({
                "id": request.id,
                "tool": request.tool_name,
                "decision": decision,
                "reason": reason,
            }),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::approval::{AutoApprove, AutoReject, SignalApprover};
    use crate::ports::audit_logger::NoAuditLogger;
    use std::time::Duration;
    use toolgate_domain::{ApprovalType, ToolCall};

    fn dangerous(id: &str) -> ToolExecution {
        ToolExecution::new(id, ToolCall::new("write_file"), ApprovalType::Dangerous, false)
    }

    #[tokio::test]
    async fn safe_calls_skip_the_approver() {
        let gate = ApprovalGate::new(Arc::new(AutoReject), Arc::new(NoAuditLogger));
        let mut exec =
            ToolExecution::new("1", ToolCall::new("read_file"), ApprovalType::None, false);
        let outcome = gate
            .admit(&mut exec, "builtin", "", &CancellationToken::new())
            .await;
        assert_eq!(outcome, GateOutcome::Proceed);
        assert_eq!(exec.state(), ApprovalState::Running);
    }

    #[tokio::test]
    async fn approved_call_runs() {
        let gate = ApprovalGate::new(Arc::new(AutoApprove), Arc::new(NoAuditLogger));
        let mut exec = dangerous("1");
        let outcome = gate
            .admit(&mut exec, "builtin", "", &CancellationToken::new())
            .await;
        assert_eq!(outcome, GateOutcome::Proceed);
        assert_eq!(exec.state(), ApprovalState::Running);
    }

    #[tokio::test]
    async fn rejected_call_is_terminal() {
        let gate = ApprovalGate::new(Arc::new(AutoReject), Arc::new(NoAuditLogger));
        let mut exec = dangerous("1");
        let outcome = gate
            .admit(&mut exec, "builtin", "", &CancellationToken::new())
            .await;
        assert!(matches!(outcome, GateOutcome::Rejected(Some(_))));
        assert_eq!(exec.state(), ApprovalState::Rejected);
    }

    #[tokio::test]
    async fn abort_while_waiting() {
        let (approver, mut requests) = SignalApprover::channel();
        let gate = ApprovalGate::new(Arc::new(approver), Arc::new(NoAuditLogger));
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                requests.recv().await;
                cancel.cancel();
            })
        };

        let mut exec = dangerous("1");
        let outcome = gate.admit(&mut exec, "builtin", "", &cancel).await;
        canceller.await.unwrap();
        assert_eq!(outcome, GateOutcome::Aborted);
        assert_eq!(exec.state(), ApprovalState::Aborted);
    }

    #[tokio::test]
    async fn second_request_waits_for_the_first() {
        let (approver, mut requests) = SignalApprover::channel();
        let approver = Arc::new(approver);
        let gate = Arc::new(ApprovalGate::new(approver.clone(), Arc::new(NoAuditLogger)));

        let first = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let mut exec = dangerous("first");
                gate.admit(&mut exec, "builtin", "", &CancellationToken::new())
                    .await
            })
        };
        let announced = requests.recv().await.unwrap();
        assert_eq!(announced.id, "first");

        let second = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let mut exec = dangerous("second");
                gate.admit(&mut exec, "builtin", "", &CancellationToken::new())
                    .await
            })
        };

        // The second request must not be announced while the first is outstanding
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(requests.try_recv().is_err());

        assert!(approver.approve("first"));
        assert_eq!(first.await.unwrap(), GateOutcome::Proceed);

        let announced = requests.recv().await.unwrap();
        assert_eq!(announced.id, "second");
        assert!(approver.reject("second", None));
        assert_eq!(second.await.unwrap(), GateOutcome::Rejected(None));
    }
}
