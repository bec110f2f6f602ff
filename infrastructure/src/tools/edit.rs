//! Edit tools: edit_file (smart replace), replace_lines (line range)
//!
//! Both work on LF-normalized text and write the file back in its original
//! line-ending style.

use std::path::Path;
use std::time::Duration;

use toolgate_application::ExecutionContext;
use toolgate_application::ports::code_intelligence::CodeIntelError;
use toolgate_domain::text::{LineEnding, normalize_line_endings};
use toolgate_domain::{
    ApprovalType, EditAttempt, EditFailure, EditStrategy, ErrorKind, ToolCall, ToolDefinition,
    ToolError, ToolParameter, ToolResult, ToolResultMetadata, line_diff_stats, replace_line_range,
    smart_replace,
};
use tracing::{debug, warn};

use super::{ToolEnv, cancellable, display_path, fs_error};

/// Tool name constants
pub const EDIT_FILE: &str = "edit_file";
pub const REPLACE_LINES: &str = "replace_lines";

pub fn edit_file_definition() -> ToolDefinition {
    ToolDefinition::new(
        EDIT_FILE,
        "Replace old_text with new_text in a file. Tolerates whitespace and small differences in old_text, but refuses to guess when several places match.",
        ApprovalType::Dangerous,
    )
    .with_parameter(ToolParameter::new("path", "Path to the file to edit", true).with_type("path"))
    .with_parameter(ToolParameter::new("old_text", "Text to replace", true))
    .with_parameter(ToolParameter::new("new_text", "Replacement text", true))
    .with_parameter(
        ToolParameter::new("replace_all", "Replace every occurrence (default: false)", false)
            .with_type("boolean"),
    )
}

pub fn replace_lines_definition() -> ToolDefinition {
    ToolDefinition::new(
        REPLACE_LINES,
        "Replace an inclusive range of lines (1-based) with new text. An empty new_text deletes the lines.",
        ApprovalType::Dangerous,
    )
    .with_parameter(ToolParameter::new("path", "Path to the file to edit", true).with_type("path"))
    .with_parameter(
        ToolParameter::new("start_line", "First line to replace (1-based)", true)
            .with_type("integer"),
    )
    .with_parameter(
        ToolParameter::new("end_line", "Last line to replace (inclusive)", true)
            .with_type("integer"),
    )
    .with_parameter(ToolParameter::new("new_text", "Replacement text", true))
}

/// Boundary conversion for smart-replace failures
fn edit_error(failure: EditFailure, shown: &str) -> ToolError {
    match &failure {
        EditFailure::EmptyOldText | EditFailure::NoChanges => {
            ToolError::validation(failure.to_string())
        }
        EditFailure::Ambiguous { .. } => {
            ToolError::ambiguous_edit(format!("{} in {}", failure, shown))
        }
        EditFailure::NotFound { best_match } => {
            let details = match best_match {
                Some(m) => format!(
                    "Did you mean line {} ({}% match)? Re-read the file and copy old_text exactly.",
                    m.line,
                    m.percent()
                ),
                None => "Re-read the file and copy old_text exactly.".to_string(),
            };
            ToolError::new(
                ErrorKind::NotFound,
                format!("old_text not found in {}", shown),
            )
            .with_details(details)
        }
    }
}

/// Notify code intelligence and collect fresh diagnostics.
///
/// Notification and the wait share one `timeout`; never fails the edit.
async fn collect_diagnostics(
    env: &ToolEnv,
    path: &Path,
    content: &str,
    timeout: Duration,
) -> Option<String> {
    let refresh = async {
        match env.code.notify_changed(path, content).await {
            Ok(()) => env.code.wait_for_diagnostics(path, timeout).await,
            Err(e) => Err(e),
        }
    };
    let diagnostics = match tokio::time::timeout(timeout, refresh).await {
        Ok(Ok(d)) => d,
        Ok(Err(CodeIntelError::Unavailable)) => return None,
        Ok(Err(e)) => {
            warn!("Diagnostics for {} unavailable: {}", path.display(), e);
            return None;
        }
        Err(_) => {
            warn!(
                "No diagnostics for {} within {}ms",
                path.display(),
                timeout.as_millis()
            );
            return None;
        }
    };
    if diagnostics.is_empty() {
        return None;
    }
    let mut text = String::from("Diagnostics:");
    for d in diagnostics {
        text.push_str(&format!(
            "\n  {}:{} {}: {}",
            d.line, d.column, d.severity, d.message
        ));
    }
    Some(text)
}

/// Read `path` for editing: (original, line ending, LF-normalized)
async fn load(
    env: &ToolEnv,
    ctx: &ExecutionContext,
    path: &Path,
) -> Result<(LineEnding, String), ToolError> {
    let original = cancellable(
        ctx.cancellation(),
        env.fs.read(path, ctx.limits.max_read_bytes),
    )
    .await?
    .map_err(fs_error)?;
    Ok((LineEnding::detect(&original), normalize_line_endings(&original)))
}

/// Write the edited text back and refresh the cache
async fn store(
    env: &ToolEnv,
    ctx: &mut ExecutionContext,
    path: &Path,
    content: String,
) -> Result<(), ToolError> {
    cancellable(ctx.cancellation(), env.fs.write(path, &content, false))
        .await?
        .map_err(fs_error)?;
    ctx.file_cache.insert(path.to_path_buf(), content);
    Ok(())
}

pub async fn execute_edit_file(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let (raw, old_text, new_text) = match (
        call.require_string("path"),
        call.require_string("old_text"),
        call.require_string("new_text"),
    ) {
        (Ok(p), Ok(o), Ok(n)) => (p, o, n),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            return ToolResult::failure(EDIT_FILE, ToolError::validation(e));
        }
    };
    let replace_all = call.get_bool("replace_all").unwrap_or(false);
    let path = match env.resolve(ctx, raw) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(EDIT_FILE, e),
    };
    let shown = display_path(ctx, &path);

    let (ending, normalized) = match load(env, ctx, &path).await {
        Ok(loaded) => loaded,
        Err(e) => return ToolResult::failure(EDIT_FILE, e),
    };

    let attempt = EditAttempt::new(
        normalize_line_endings(old_text),
        normalize_line_endings(new_text),
    )
    .with_replace_all(replace_all);
    // CPU-bound when the fuzzy strategy runs
    let search = tokio::task::spawn_blocking(move || {
        let result = smart_replace(&normalized, &attempt);
        (normalized, result)
    });
    let (normalized, outcome) = match cancellable(ctx.cancellation(), search).await {
        Ok(Ok((normalized, Ok(outcome)))) => (normalized, outcome),
        Ok(Ok((_, Err(failure)))) => {
            debug!(path = %shown, "edit_file failed: {}", failure);
            return ToolResult::failure(EDIT_FILE, edit_error(failure, &shown));
        }
        Ok(Err(e)) => {
            return ToolResult::failure(
                EDIT_FILE,
                ToolError::execution_failed(format!("edit search did not complete: {}", e)),
            );
        }
        Err(e) => return ToolResult::failure(EDIT_FILE, e),
    };

    let updated = ending.apply(&outcome.new_content);
    if let Err(e) = store(env, ctx, &path, updated.clone()).await {
        return ToolResult::failure(EDIT_FILE, e);
    }

    let (lines_added, lines_removed) = line_diff_stats(&normalized, &outcome.new_content);
    let mut output = format!(
        "Edited {} ({} replacement{}, strategy: {})",
        shown,
        outcome.replacements,
        if outcome.replacements == 1 { "" } else { "s" },
        outcome.strategy.as_str()
    );
    if outcome.strategy == EditStrategy::Fuzzy {
        output.push_str(&format!(
            "; matched at {:.0}% similarity",
            outcome.similarity * 100.0
        ));
    }
    if let Some(diagnostics) =
        collect_diagnostics(env, &path, &updated, ctx.limits.diagnostics_timeout).await
    {
        output.push_str("\n\n");
        output.push_str(&diagnostics);
    }

    ToolResult::success(EDIT_FILE, output).with_metadata(ToolResultMetadata {
        path: Some(shown),
        lines_added: Some(lines_added),
        lines_removed: Some(lines_removed),
        strategy: Some(outcome.strategy.as_str().to_string()),
        ..Default::default()
    })
}

pub async fn execute_replace_lines(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let raw = match call.require_string("path") {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(REPLACE_LINES, ToolError::validation(e)),
    };
    let (Some(start), Some(end)) = (call.get_i64("start_line"), call.get_i64("end_line")) else {
        return ToolResult::failure(
            REPLACE_LINES,
            ToolError::validation("start_line and end_line must be integers"),
        );
    };
    let new_text = call.get_string("new_text").unwrap_or_default();
    let path = match env.resolve(ctx, raw) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(REPLACE_LINES, e),
    };
    let shown = display_path(ctx, &path);

    let (ending, normalized) = match load(env, ctx, &path).await {
        Ok(loaded) => loaded,
        Err(e) => return ToolResult::failure(REPLACE_LINES, e),
    };

    let new_text = normalize_line_endings(new_text);
    let edit = match replace_line_range(&normalized, start, end, &new_text) {
        Ok(edit) => edit,
        Err(e) => {
            return ToolResult::failure(
                REPLACE_LINES,
                ToolError::validation(format!("{} ({})", e, shown)),
            );
        }
    };

    let updated = ending.apply(&edit.new_content);
    if let Err(e) = store(env, ctx, &path, updated.clone()).await {
        return ToolResult::failure(REPLACE_LINES, e);
    }

    let mut output = format!(
        "Replaced lines {}-{} of {} ({} removed, {} added)",
        start, end, shown, edit.lines_removed, edit.lines_added
    );
    if let Some(diagnostics) =
        collect_diagnostics(env, &path, &updated, ctx.limits.diagnostics_timeout).await
    {
        output.push_str("\n\n");
        output.push_str(&diagnostics);
    }

    ToolResult::success(REPLACE_LINES, output).with_metadata(ToolResultMetadata {
        path: Some(shown),
        lines_added: Some(edit.lines_added),
        lines_removed: Some(edit.lines_removed),
        ..Default::default()
    })
}
