//! Tool session: a sequence of turns sharing one executor.
//!
//! Each turn gets a fresh [`ExecutionContext`] (empty cache, new abort
//! signal). The active plan survives across turns since it belongs to the
//! task rather than to a single model response.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use toolgate_domain::{ToolCall, ToolDefinition, ToolResult};
use tracing::debug;

use crate::context::{ExecutionContext, ResourceLimits};
use crate::use_cases::execute_tool_call::ExecuteToolCallUseCase;

/// Aborts whatever turn is current when [`TurnAbort::abort`] is called.
///
/// Cloneable and usable from any task while a call is in flight.
#[derive(Clone, Default)]
pub struct TurnAbort {
    current: Arc<Mutex<CancellationToken>>,
}

impl TurnAbort {
    pub fn abort(&self) {
        self.token().cancel();
    }

    fn token(&self) -> CancellationToken {
        match self.current.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn install(&self, token: CancellationToken) {
        match self.current.lock() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}

pub struct ToolSession {
    executor: Arc<ExecuteToolCallUseCase>,
    workspace: Option<PathBuf>,
    limits: ResourceLimits,
    context: Option<ExecutionContext>,
    abort: TurnAbort,
    turns: u64,
}

impl ToolSession {
    pub fn new(
        executor: Arc<ExecuteToolCallUseCase>,
        workspace: Option<PathBuf>,
        limits: ResourceLimits,
    ) -> Self {
        Self {
            executor,
            workspace,
            limits,
            context: None,
            abort: TurnAbort::default(),
            turns: 0,
        }
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.executor.tool_definitions()
    }

    pub fn abort_handle(&self) -> TurnAbort {
        self.abort.clone()
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    pub fn context(&self) -> Option<&ExecutionContext> {
        self.context.as_ref()
    }

    /// Start a new turn, discarding any previous one
    pub fn begin_turn(&mut self) -> &mut ExecutionContext {
        let plan = self.context.take().and_then(|ctx| ctx.plan);
        let token = CancellationToken::new();
        self.abort.install(token.clone());
        self.turns += 1;
        debug!("Beginning turn {}", self.turns);

        let mut ctx = ExecutionContext::new(self.workspace.clone(), self.limits.clone())
            .with_cancellation(token);
        ctx.plan = plan;
        self.context.insert(ctx)
    }

    /// Finish the current turn. The file cache is dropped with it.
    pub fn end_turn(&mut self) {
        if let Some(ctx) = self.context.as_mut() {
            debug!("Ending turn {}", self.turns);
            ctx.file_cache.clear();
            ctx.cancellation().cancel();
        }
    }

    /// Execute `call` in the current turn, starting one if needed
    pub async fn call(&mut self, call: &ToolCall) -> ToolResult {
        let needs_turn = self
            .context
            .as_ref()
            .is_none_or(|ctx| ctx.is_cancelled());
        if needs_turn {
            self.begin_turn();
        }
        let executor = self.executor.clone();
        match self.context.as_mut() {
            Some(ctx) => executor.execute(call, ctx).await,
            None => ToolResult::failure(&call.tool_name, toolgate_domain::ToolError::cancelled()),
        }
    }
}
