//! Execute tool call use case
//!
//! The single entry point for `{name, arguments}` envelopes coming from the
//! model loop: resolve → validate → approval gate → execute.

use std::sync::Arc;
use std::time::Instant;

use toolgate_domain::{ToolCall, ToolDefinition, ToolError, ToolExecution, ToolResult};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::approval_gate::{ApprovalGate, GateOutcome};
use crate::context::ExecutionContext;
use crate::ports::approval::ApprovalPort;
use crate::ports::audit_logger::{AuditEvent, AuditLogger};
use crate::ports::tool_provider::ToolRegistryPort;

pub struct ExecuteToolCallUseCase {
    registry: Arc<dyn ToolRegistryPort>,
    gate: ApprovalGate,
    audit: Arc<dyn AuditLogger>,
}

impl ExecuteToolCallUseCase {
    pub fn new(
        registry: Arc<dyn ToolRegistryPort>,
        approver: Arc<dyn ApprovalPort>,
        audit: Arc<dyn AuditLogger>,
    ) -> Self {
        Self {
            registry,
            gate: ApprovalGate::new(approver, audit.clone()),
            audit,
        }
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.registry.tool_definitions()
    }

    /// Run one call to completion. Never fails: every problem is folded into
    /// the returned [`ToolResult`].
    pub async fn execute(&self, call: &ToolCall, ctx: &mut ExecutionContext) -> ToolResult {
        let id = call
            .call_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        self.audit.log(AuditEvent::new(
            "tool_call_requested",
            serde_json::json!({
                "id": id,
                "tool": call.tool_name,
                "arguments": call.arguments,
            }),
        ));

        let result = self.run(&id, call, ctx).await;

        self.audit.log(AuditEvent::new(
            "tool_call_completed",
            serde_json::json!({
                "id": id,
                "tool": call.tool_name,
                "success": result.success,
                "error_kind": result.error_kind().map(|k| k.as_str()),
                "duration_ms": result.metadata.duration_ms,
            }),
        ));
        result
    }

    async fn run(&self, id: &str, call: &ToolCall, ctx: &mut ExecutionContext) -> ToolResult {
        if ctx.is_cancelled() {
            return ToolResult::failure(&call.tool_name, ToolError::cancelled());
        }

        let Some(provider) = self.registry.resolve(&call.tool_name) else {
            debug!("No provider has tool '{}'", call.tool_name);
            let mut known: Vec<String> = self
                .registry
                .tool_definitions()
                .into_iter()
                .map(|d| d.name)
                .collect();
            known.sort();
            return ToolResult::failure(
                &call.tool_name,
                ToolError::not_found(format!("tool '{}'", call.tool_name))
                    .with_details(format!("Available tools: {}", known.join(", "))),
            );
        };
        debug!(
            "Routing '{}' to provider '{}'",
            call.tool_name,
            provider.id()
        );

        if let Err(e) = provider.validate_args(call) {
            debug!("Validation failed for '{}': {}", call.tool_name, e);
            return ToolResult::failure(&call.tool_name, e);
        }

        let mut execution = ToolExecution::new(
            id,
            call.clone(),
            provider.approval_type(&call.tool_name),
            provider.is_auto_approved(&call.tool_name),
        );
        let description = provider
            .tool_definition(&call.tool_name)
            .map(|d| d.description)
            .unwrap_or_default();

        let cancel = ctx.cancellation().clone();
        match self
            .gate
            .admit(&mut execution, provider.id(), &description, &cancel)
            .await
        {
            GateOutcome::Proceed => {}
            GateOutcome::Rejected(reason) => {
                return ToolResult::failure(
                    &call.tool_name,
                    ToolError::rejected(reason.as_deref()),
                );
            }
            GateOutcome::Aborted => {
                return ToolResult::failure(&call.tool_name, ToolError::cancelled());
            }
        }

        let started = Instant::now();
        let mut result = provider.execute(call, ctx).await;
        if result.metadata.duration_ms.is_none() {
            result.metadata.duration_ms = Some(started.elapsed().as_millis() as u64);
        }

        if let Err(e) = execution.complete(&result) {
            warn!("{}", e);
        }
        info!(
            "Executed {} via {}: {}",
            call.tool_name,
            provider.id(),
            execution.state()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ResourceLimits;
    use crate::ports::approval::{AutoApprove, AutoReject, SignalApprover};
    use crate::ports::audit_logger::NoAuditLogger;
    use crate::ports::tool_provider::ToolProvider;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use toolgate_domain::{ApprovalType, ErrorKind, ToolParameter};

    /// Records every executed call
    #[derive(Default)]
    struct CountingProvider {
        runs: AtomicUsize,
        allow: Vec<String>,
    }

    #[async_trait]
    impl ToolProvider for CountingProvider {
        fn id(&self) -> &str {
            "test"
        }

        fn display_name(&self) -> &str {
            "Test"
        }

        fn has_tool(&self, name: &str) -> bool {
            matches!(name, "look" | "touch")
        }

        fn tool_definitions(&self) -> Vec<ToolDefinition> {
            vec![
                ToolDefinition::new("look", "Read something", ApprovalType::None),
                ToolDefinition::new("touch", "Change something", ApprovalType::Dangerous)
                    .with_parameter(ToolParameter::new("path", "Target", true)),
            ]
        }

        fn is_auto_approved(&self, name: &str) -> bool {
            self.allow.iter().any(|n| n == name)
        }

        async fn execute(&self, call: &ToolCall, _ctx: &mut ExecutionContext) -> ToolResult {
            self.runs.fetch_add(1, Ordering::SeqCst);
            ToolResult::success(&call.tool_name, "done")
        }
    }

    struct SingleRegistry(Arc<CountingProvider>);

    impl ToolRegistryPort for SingleRegistry {
        fn tool_definitions(&self) -> Vec<ToolDefinition> {
            self.0.tool_definitions()
        }

        fn resolve(&self, name: &str) -> Option<Arc<dyn ToolProvider>> {
            if self.0.has_tool(name) {
                Some(self.0.clone())
            } else {
                None
            }
        }
    }

    #[derive(Default)]
    struct RecordingAudit(Mutex<Vec<&'static str>>);

    impl AuditLogger for RecordingAudit {
        fn log(&self, event: AuditEvent) {
            self.0.lock().unwrap().push(event.event_type);
        }
    }

    fn use_case(
        provider: Arc<CountingProvider>,
        approver: Arc<dyn ApprovalPort>,
    ) -> ExecuteToolCallUseCase {
        ExecuteToolCallUseCase::new(
            Arc::new(SingleRegistry(provider)),
            approver,
            Arc::new(NoAuditLogger),
        )
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(None, ResourceLimits::default())
    }

    fn touch() -> ToolCall {
        ToolCall::new("touch").with_arg("path", "a.txt")
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let provider = Arc::new(CountingProvider::default());
        let uc = use_case(provider, Arc::new(AutoApprove));
        let result = uc.execute(&ToolCall::new("nope"), &mut ctx()).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));
        assert!(result.text_for_model().contains("look, touch"));
    }

    #[tokio::test]
    async fn missing_argument_is_validation_failure() {
        let provider = Arc::new(CountingProvider::default());
        let uc = use_case(provider.clone(), Arc::new(AutoApprove));
        let result = uc.execute(&ToolCall::new("touch"), &mut ctx()).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(provider.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_dangerous_call_never_executes() {
        let provider = Arc::new(CountingProvider::default());
        let uc = use_case(provider.clone(), Arc::new(AutoReject));
        let result = uc.execute(&touch(), &mut ctx()).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Rejected));
        assert_eq!(provider.runs.load(Ordering::SeqCst), 0);

        // Safe tools are unaffected by the approver
        let result = uc.execute(&ToolCall::new("look"), &mut ctx()).await;
        assert!(result.is_success());
        assert_eq!(provider.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn allow_listed_tool_skips_approval() {
        let provider = Arc::new(CountingProvider {
            allow: vec!["touch".into()],
            ..Default::default()
        });
        let uc = use_case(provider.clone(), Arc::new(AutoReject));
        let result = uc.execute(&touch(), &mut ctx()).await;
        assert!(result.is_success());
        assert!(result.metadata.duration_ms.is_some());
    }

    #[tokio::test]
    async fn dangerous_call_waits_for_signal() {
        let provider = Arc::new(CountingProvider::default());
        let (approver, mut requests) = SignalApprover::channel();
        let approver = Arc::new(approver);
        let uc = Arc::new(use_case(provider.clone(), approver.clone()));

        let task = {
            let uc = uc.clone();
            tokio::spawn(async move {
                let call = touch().with_call_id("call-1");
                uc.execute(&call, &mut ctx()).await
            })
        };

        let request = requests.recv().await.unwrap();
        assert_eq!(request.id, "call-1");
        assert_eq!(request.tool_name, "touch");
        assert_eq!(provider.runs.load(Ordering::SeqCst), 0);

        assert!(approver.approve("call-1"));
        let result = task.await.unwrap();
        assert!(result.is_success());
        assert_eq!(provider.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_turn_short_circuits() {
        let provider = Arc::new(CountingProvider::default());
        let uc = use_case(provider.clone(), Arc::new(AutoApprove));
        let mut ctx = ctx();
        ctx.cancellation().cancel();
        let result = uc.execute(&ToolCall::new("look"), &mut ctx).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
        assert_eq!(provider.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn audit_trail_covers_approval() {
        let provider = Arc::new(CountingProvider::default());
        let audit = Arc::new(RecordingAudit::default());
        let uc = ExecuteToolCallUseCase::new(
            Arc::new(SingleRegistry(provider)),
            Arc::new(AutoApprove),
            audit.clone(),
        );
        uc.execute(&touch(), &mut ctx()).await;
        assert_eq!(
            *audit.0.lock().unwrap(),
            vec![
                "tool_call_requested",
                "approval_requested",
                "approval_decided",
                "tool_call_completed"
            ]
        );
    }
}
