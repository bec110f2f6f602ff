//! File operation tools: read_file, read_files, write_file, list_directory,
//! create_directory, delete_file

use std::path::PathBuf;

use futures::stream::{self, StreamExt};
use toolgate_application::ExecutionContext;
use toolgate_domain::text::truncate_with_notice;
use toolgate_domain::{
    ApprovalType, ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult,
    ToolResultMetadata, line_diff_stats,
};
use tracing::debug;

use super::{ToolEnv, cancellable, display_path, fs_error};

/// Tool name constants
pub const READ_FILE: &str = "read_file";
pub const READ_FILES: &str = "read_files";
pub const WRITE_FILE: &str = "write_file";
pub const LIST_DIRECTORY: &str = "list_directory";
pub const CREATE_DIRECTORY: &str = "create_directory";
pub const DELETE_FILE: &str = "delete_file";

pub fn read_file_definition() -> ToolDefinition {
    ToolDefinition::new(
        READ_FILE,
        "Read the contents of a file at the specified path",
        ApprovalType::None,
    )
    .with_parameter(ToolParameter::new("path", "Path to the file to read", true).with_type("path"))
    .with_parameter(
        ToolParameter::new(
            "offset",
            "Line number to start reading from (0-indexed)",
            false,
        )
        .with_type("integer"),
    )
    .with_parameter(
        ToolParameter::new("limit", "Maximum number of lines to read", false).with_type("integer"),
    )
}

pub fn read_files_definition() -> ToolDefinition {
    ToolDefinition::new(
        READ_FILES,
        "Read several files at once. Each path gets its own section; a failing path does not affect the others.",
        ApprovalType::None,
    )
    .with_parameter(
        ToolParameter::new("paths", "Paths of the files to read", true).with_type("array"),
    )
}

pub fn write_file_definition() -> ToolDefinition {
    ToolDefinition::new(
        WRITE_FILE,
        "Write content to a file at the specified path. Creates the file if it doesn't exist, or overwrites if it does.",
        ApprovalType::Dangerous,
    )
    .with_parameter(ToolParameter::new("path", "Path to the file to write", true).with_type("path"))
    .with_parameter(ToolParameter::new("content", "Content to write to the file", true))
    .with_parameter(
        ToolParameter::new("create_dirs", "Create parent directories if they don't exist", false)
            .with_type("boolean"),
    )
}

pub fn list_directory_definition() -> ToolDefinition {
    ToolDefinition::new(
        LIST_DIRECTORY,
        "List the entries of a directory (directories first)",
        ApprovalType::None,
    )
    .with_parameter(
        ToolParameter::new("path", "Directory to list (default: workspace root)", false)
            .with_type("path"),
    )
}

pub fn create_directory_definition() -> ToolDefinition {
    ToolDefinition::new(
        CREATE_DIRECTORY,
        "Create a directory, including missing parents",
        ApprovalType::Dangerous,
    )
    .with_parameter(ToolParameter::new("path", "Directory to create", true).with_type("path"))
}

pub fn delete_file_definition() -> ToolDefinition {
    ToolDefinition::new(DELETE_FILE, "Delete a file", ApprovalType::Dangerous)
        .with_parameter(ToolParameter::new("path", "File to delete", true).with_type("path"))
}

/// Select `limit` lines starting at 0-based `offset`
fn slice_lines(content: &str, offset: usize, limit: Option<usize>) -> String {
    let lines: Vec<&str> = content.lines().collect();
    if offset >= lines.len() {
        return String::new();
    }
    let end = match limit {
        Some(l) => (offset + l).min(lines.len()),
        None => lines.len(),
    };
    lines[offset..end].join("\n")
}

pub async fn execute_read_file(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let raw = match call.require_string("path") {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(READ_FILE, ToolError::validation(e)),
    };
    let path = match env.resolve(ctx, raw) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(READ_FILE, e),
    };

    let content = match cancellable(
        ctx.cancellation(),
        env.fs.read(&path, ctx.limits.max_read_bytes),
    )
    .await
    {
        Ok(Ok(c)) => c,
        Ok(Err(e)) => return ToolResult::failure(READ_FILE, fs_error(e)),
        Err(e) => return ToolResult::failure(READ_FILE, e),
    };

    let offset = call.get_i64("offset").unwrap_or(0).max(0) as usize;
    let limit = call.get_i64("limit").map(|l| l.max(0) as usize);
    let output = if offset > 0 || limit.is_some() {
        slice_lines(&content, offset, limit)
    } else {
        content.clone()
    };

    let bytes = content.len();
    ctx.file_cache.insert(path.clone(), content);

    ToolResult::success(
        READ_FILE,
        truncate_with_notice(&output, ctx.limits.max_output_bytes),
    )
    .with_metadata(ToolResultMetadata {
        bytes: Some(bytes),
        path: Some(display_path(ctx, &path)),
        ..Default::default()
    })
}

/// Reads fan out with bounded concurrency. Every requested path gets exactly
/// one segment, in request order, and the cache is only updated once all
/// reads have finished.
pub async fn execute_read_files(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let paths = call.get_string_list("paths").unwrap_or_default();
    if paths.is_empty() {
        return ToolResult::failure(
            READ_FILES,
            ToolError::validation("'paths' must be a non-empty list of file paths"),
        );
    }

    let max_bytes = ctx.limits.max_read_bytes;
    let concurrency = ctx.limits.read_concurrency.max(1);
    let token = ctx.cancellation().clone();
    let resolved: Vec<(String, Result<PathBuf, ToolError>)> = paths
        .into_iter()
        .map(|raw| {
            let path = env.resolve(ctx, &raw);
            (raw, path)
        })
        .collect();

    let reads = stream::iter(resolved)
        .map(|(raw, path)| {
            let token = token.clone();
            async move {
                let outcome = match path {
                    Ok(path) => match cancellable(&token, env.fs.read(&path, max_bytes)).await {
                        Ok(Ok(content)) => Ok((path, content)),
                        Ok(Err(e)) => Err(fs_error(e)),
                        Err(e) => Err(e),
                    },
                    Err(e) => Err(e),
                };
                (raw, outcome)
            }
        })
        .buffered(concurrency)
        .collect::<Vec<_>>()
        .await;

    if token.is_cancelled() {
        return ToolResult::failure(READ_FILES, ToolError::cancelled());
    }

    let mut output = String::new();
    let mut failed = 0usize;
    let mut bytes = 0usize;
    let total = reads.len();
    for (raw, outcome) in reads {
        if !output.is_empty() {
            output.push_str("\n\n");
        }
        output.push_str(&format!("==> {} <==\n", raw));
        match outcome {
            Ok((path, content)) => {
                bytes += content.len();
                output.push_str(&content);
                ctx.file_cache.insert(path, content);
            }
            Err(e) => {
                failed += 1;
                debug!("read_files: {} failed: {}", raw, e);
                output.push_str(&format!("Error: {}", e.message));
            }
        }
    }

    let output = truncate_with_notice(&output, ctx.limits.max_output_bytes);
    let metadata = ToolResultMetadata {
        bytes: Some(bytes),
        match_count: Some(total - failed),
        ..Default::default()
    };
    if failed == total {
        ToolResult::failure(
            READ_FILES,
            ToolError::execution_failed(format!("None of the {} files could be read", total)),
        )
        .with_output(output)
        .with_metadata(metadata)
    } else {
        ToolResult::success(READ_FILES, output)
            .with_metadata(metadata)
            .with_extra("failed", failed)
    }
}

pub async fn execute_write_file(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let raw = match call.require_string("path") {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(WRITE_FILE, ToolError::validation(e)),
    };
    let content = match call.require_string("content") {
        Ok(c) => c,
        Err(e) => return ToolResult::failure(WRITE_FILE, ToolError::validation(e)),
    };
    let create_dirs = call.get_bool("create_dirs").unwrap_or(false);
    let path = match env.resolve(ctx, raw) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(WRITE_FILE, e),
    };

    let previous = match ctx.file_cache.get(&path) {
        Some(cached) => Some(cached.content.clone()),
        None => env.fs.read(&path, ctx.limits.max_read_bytes).await.ok(),
    };

    match cancellable(ctx.cancellation(), env.fs.write(&path, content, create_dirs)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return ToolResult::failure(WRITE_FILE, fs_error(e)),
        Err(e) => return ToolResult::failure(WRITE_FILE, e),
    }
    ctx.file_cache.insert(path.clone(), content);

    let (lines_added, lines_removed) = line_diff_stats(previous.as_deref().unwrap_or(""), content);
    let display = display_path(ctx, &path);
    let verb = if previous.is_some() { "Overwrote" } else { "Created" };
    ToolResult::success(
        WRITE_FILE,
        format!("{} {} ({} bytes)", verb, display, content.len()),
    )
    .with_metadata(ToolResultMetadata {
        path: Some(display),
        bytes: Some(content.len()),
        lines_added: Some(lines_added),
        lines_removed: Some(lines_removed),
        ..Default::default()
    })
}

pub async fn execute_list_directory(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let raw = call.get_string("path").unwrap_or(".");
    let path = match env.resolve(ctx, raw) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(LIST_DIRECTORY, e),
    };

    let entries = match cancellable(ctx.cancellation(), env.fs.read_dir(&path)).await {
        Ok(Ok(entries)) => entries,
        Ok(Err(e)) => return ToolResult::failure(LIST_DIRECTORY, fs_error(e)),
        Err(e) => return ToolResult::failure(LIST_DIRECTORY, e),
    };

    let output = if entries.is_empty() {
        "(empty directory)".to_string()
    } else {
        entries
            .iter()
            .map(|e| {
                if e.is_directory {
                    format!("{}/", e.name)
                } else {
                    e.name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let listed: Vec<serde_json::Value> = entries
        .iter()
        .map(|e| {
            serde_json::json!({
                "name": e.name,
                "path": display_path(ctx, &e.path),
                "is_directory": e.is_directory,
            })
        })
        .collect();

    ToolResult::success(LIST_DIRECTORY, output)
        .with_metadata(ToolResultMetadata {
            path: Some(display_path(ctx, &path)),
            match_count: Some(entries.len()),
            ..Default::default()
        })
        .with_extra("entries", listed)
}

pub async fn execute_create_directory(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let raw = match call.require_string("path") {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(CREATE_DIRECTORY, ToolError::validation(e)),
    };
    let path = match env.resolve(ctx, raw) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(CREATE_DIRECTORY, e),
    };

    match cancellable(ctx.cancellation(), env.fs.mkdir(&path)).await {
        Ok(Ok(())) => {
            let display = display_path(ctx, &path);
            ToolResult::success(CREATE_DIRECTORY, format!("Created directory {}", display))
                .with_path(display)
        }
        Ok(Err(e)) => ToolResult::failure(CREATE_DIRECTORY, fs_error(e)),
        Err(e) => ToolResult::failure(CREATE_DIRECTORY, e),
    }
}

pub async fn execute_delete_file(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let raw = match call.require_string("path") {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(DELETE_FILE, ToolError::validation(e)),
    };
    let path = match env.resolve(ctx, raw) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(DELETE_FILE, e),
    };

    match cancellable(ctx.cancellation(), env.fs.delete(&path)).await {
        Ok(Ok(())) => {
            ctx.file_cache.remove(&path);
            let display = display_path(ctx, &path);
            ToolResult::success(DELETE_FILE, format!("Deleted {}", display)).with_path(display)
        }
        Ok(Err(e)) => ToolResult::failure(DELETE_FILE, fs_error(e)),
        Err(e) => ToolResult::failure(DELETE_FILE, e),
    }
}
