//! Command execution tool: run_command

use std::time::Duration;

use toolgate_application::ExecutionContext;
use toolgate_application::ports::process::{CommandOutput, CommandRequest, ProcessError};
use toolgate_domain::text::truncate_with_notice;
use toolgate_domain::{
    ApprovalType, ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult,
    ToolResultMetadata,
};
use tracing::info;

use super::ToolEnv;

/// Tool name constant
pub const RUN_COMMAND: &str = "run_command";

pub fn run_command_definition() -> ToolDefinition {
    ToolDefinition::new(
        RUN_COMMAND,
        "Execute a shell command and return its output. Use with caution.",
        ApprovalType::Dangerous,
    )
    .with_parameter(ToolParameter::new("command", "The command to execute", true))
    .with_parameter(
        ToolParameter::new(
            "working_dir",
            "Working directory for the command (default: workspace root)",
            false,
        )
        .with_type("path"),
    )
    .with_parameter(
        ToolParameter::new(
            "timeout_secs",
            "Timeout in seconds (default: configured command timeout)",
            false,
        )
        .with_type("integer"),
    )
}

/// Whether a finished command counts as a success.
///
/// Heuristic: exit code 0, or any output at all when nothing went wrong
/// collecting it. Tools like `grep` or linters exit non-zero while still
/// producing the answer the model asked for.
pub fn command_succeeded(output: &CommandOutput) -> bool {
    output.exit_code == Some(0) || (output.has_output() && output.error.is_none())
}

pub async fn execute_run_command(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let command = match call.require_string("command") {
        Ok(c) if !c.trim().is_empty() => c,
        Ok(_) => {
            return ToolResult::failure(RUN_COMMAND, ToolError::validation("command is empty"));
        }
        Err(e) => return ToolResult::failure(RUN_COMMAND, ToolError::validation(e)),
    };

    let cwd = match call.get_string("working_dir") {
        Some(dir) => match env.resolve(ctx, dir) {
            Ok(p) => Some(p),
            Err(e) => return ToolResult::failure(RUN_COMMAND, e),
        },
        None => ctx.workspace_path().map(|p| p.to_path_buf()),
    };
    let timeout = call
        .get_i64("timeout_secs")
        .filter(|s| *s > 0)
        .map(|s| Duration::from_secs(s as u64))
        .unwrap_or(ctx.limits.command_timeout);

    let request = CommandRequest {
        command: command.to_string(),
        cwd,
        timeout,
    };
    info!("Running command: {}", command);

    let output = match env
        .process
        .execute_background(&request, ctx.cancellation().clone())
        .await
    {
        Ok(out) => out,
        Err(ProcessError::TimedOut(after)) => {
            return ToolResult::failure(
                RUN_COMMAND,
                ToolError::timeout(format!("`{}` after {}s", command, after.as_secs())),
            );
        }
        Err(ProcessError::Cancelled) => {
            return ToolResult::failure(RUN_COMMAND, ToolError::cancelled());
        }
        Err(e @ ProcessError::Spawn(_)) => {
            return ToolResult::failure(RUN_COMMAND, ToolError::execution_failed(e.to_string()));
        }
    };

    let exit_code = output.exit_code.unwrap_or(-1);
    let text = truncate_with_notice(&output.combined(), ctx.limits.max_output_bytes);
    let metadata = ToolResultMetadata {
        exit_code: output.exit_code,
        bytes: Some(text.len()),
        ..Default::default()
    };

    if command_succeeded(&output) {
        let text = match (exit_code, text.is_empty()) {
            (0, true) => "(no output)".to_string(),
            (0, false) => text,
            (code, _) => format!("Command exited with code {}\n{}", code, text),
        };
        return ToolResult::success(RUN_COMMAND, text).with_metadata(metadata);
    }

    let (error, text) = if output.has_output() {
        let message = format!("Command exited with code {}", exit_code);
        (ToolError::execution_failed(message), text)
    } else {
        let message = format!("Command exited with code {} (no output)", exit_code);
        (ToolError::execution_failed(message.clone()), message)
    };
    let error = match &output.error {
        Some(detail) => error.with_details(detail.clone()),
        None => error,
    };
    ToolResult::failure(RUN_COMMAND, error)
        .with_output(text)
        .with_metadata(metadata)
}
