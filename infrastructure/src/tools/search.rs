//! Search tools: glob_search, grep_search

use toolgate_application::ExecutionContext;
use toolgate_application::ports::file_system::{SearchKind, SearchMatch, SearchQuery};
use toolgate_domain::text::truncate_with_notice;
use toolgate_domain::{
    ApprovalType, ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult,
    ToolResultMetadata,
};
use tracing::debug;

use super::{ToolEnv, cancellable, display_path, fs_error};

/// Tool name constants
pub const GLOB_SEARCH: &str = "glob_search";
pub const GREP_SEARCH: &str = "grep_search";

/// Maximum number of results to return
const MAX_RESULTS: usize = 1000;

pub fn glob_search_definition() -> ToolDefinition {
    ToolDefinition::new(
        GLOB_SEARCH,
        "Search for files matching a glob pattern (e.g., '**/*.rs', 'src/*.txt')",
        ApprovalType::None,
    )
    .with_parameter(ToolParameter::new("pattern", "Glob pattern to match files", true))
    .with_parameter(
        ToolParameter::new(
            "path",
            "Directory to search from (default: workspace root)",
            false,
        )
        .with_type("path"),
    )
    .with_parameter(
        ToolParameter::new(
            "max_results",
            "Maximum number of results to return (default: 1000)",
            false,
        )
        .with_type("integer"),
    )
}

pub fn grep_search_definition() -> ToolDefinition {
    ToolDefinition::new(
        GREP_SEARCH,
        "Search for a regex pattern within file contents",
        ApprovalType::None,
    )
    .with_parameter(ToolParameter::new("pattern", "Regex pattern to search for", true))
    .with_parameter(
        ToolParameter::new(
            "path",
            "File or directory to search in (default: workspace root)",
            false,
        )
        .with_type("path"),
    )
    .with_parameter(ToolParameter::new(
        "include",
        "Glob pattern to filter files (e.g., '*.rs')",
        false,
    ))
    .with_parameter(
        ToolParameter::new("case_insensitive", "Perform case-insensitive search", false)
            .with_type("boolean"),
    )
    .with_parameter(
        ToolParameter::new(
            "max_results",
            "Maximum number of matches to return (default: 1000)",
            false,
        )
        .with_type("integer"),
    )
}

fn max_results(call: &ToolCall) -> usize {
    call.get_i64("max_results")
        .filter(|n| *n > 0)
        .map(|n| n as usize)
        .unwrap_or(MAX_RESULTS)
        .min(MAX_RESULTS)
}

async fn run_search(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &ExecutionContext,
    tool: &str,
    kind: SearchKind,
) -> Result<(Vec<SearchMatch>, usize), ToolError> {
    let root = env.resolve(ctx, call.get_string("path").unwrap_or("."))?;
    let limit = max_results(call);
    let query = SearchQuery {
        root,
        kind,
        max_results: limit,
    };
    let matches = cancellable(ctx.cancellation(), env.fs.search(&query))
        .await?
        .map_err(fs_error)
        .inspect_err(|e| debug!("{} failed: {}", tool, e))?;
    Ok((matches, limit))
}

pub async fn execute_glob_search(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let pattern = match call.require_string("pattern") {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(GLOB_SEARCH, ToolError::validation(e)),
    };
    let kind = SearchKind::Glob {
        pattern: pattern.to_string(),
    };
    let (matches, limit) = match run_search(env, call, ctx, GLOB_SEARCH, kind).await {
        Ok(found) => found,
        Err(e) => return ToolResult::failure(GLOB_SEARCH, e),
    };

    let mut output = matches
        .iter()
        .map(|m| display_path(ctx, &m.path))
        .collect::<Vec<_>>()
        .join("\n");
    if matches.is_empty() {
        output = "No files found matching the pattern".to_string();
    } else if matches.len() >= limit {
        output.push_str(&format!("\n... (limited to {} results)", limit));
    }

    ToolResult::success(GLOB_SEARCH, output).with_metadata(ToolResultMetadata {
        match_count: Some(matches.len()),
        ..Default::default()
    })
}

pub async fn execute_grep_search(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let pattern = match call.require_string("pattern") {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(GREP_SEARCH, ToolError::validation(e)),
    };
    let kind = SearchKind::Grep {
        pattern: pattern.to_string(),
        include: call.get_string("include").map(str::to_string),
        case_insensitive: call.get_bool("case_insensitive").unwrap_or(false),
    };
    let (matches, limit) = match run_search(env, call, ctx, GREP_SEARCH, kind).await {
        Ok(found) => found,
        Err(e) => return ToolResult::failure(GREP_SEARCH, e),
    };

    let mut output = matches
        .iter()
        .map(|m| {
            format!(
                "{}:{}: {}",
                display_path(ctx, &m.path),
                m.line.unwrap_or(0),
                m.text.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    if matches.is_empty() {
        output = "No matches found".to_string();
    } else if matches.len() >= limit {
        output.push_str(&format!("\n... (limited to {} matches)", limit));
    }

    let structured: Vec<serde_json::Value> = matches
        .iter()
        .map(|m| {
            serde_json::json!({
                "path": display_path(ctx, &m.path),
                "line": m.line,
                "text": m.text,
            })
        })
        .collect();

    ToolResult::success(
        GREP_SEARCH,
        truncate_with_notice(&output, ctx.limits.max_output_bytes),
    )
    .with_metadata(ToolResultMetadata {
        match_count: Some(matches.len()),
        ..Default::default()
    })
    .with_extra("matches", structured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{root, workspace};
    use toolgate_domain::ErrorKind;

    #[tokio::test]
    async fn glob_search_relative_paths() {
        let (_dir, mut ctx) = workspace();
        std::fs::create_dir(root(&ctx).join("src")).unwrap();
        std::fs::write(root(&ctx).join("src/main.rs"), "").unwrap();
        std::fs::write(root(&ctx).join("README.md"), "").unwrap();

        let call = ToolCall::new(GLOB_SEARCH).with_arg("pattern", "**/*.rs");
        let result = execute_glob_search(&ToolEnv::local(), &call, &mut ctx).await;
        assert!(result.is_success());
        assert_eq!(result.output(), "src/main.rs");
        assert_eq!(result.metadata.match_count, Some(1));
    }

    #[tokio::test]
    async fn glob_search_no_matches() {
        let (_dir, mut ctx) = workspace();
        let call = ToolCall::new(GLOB_SEARCH).with_arg("pattern", "*.xyz");
        let result = execute_glob_search(&ToolEnv::local(), &call, &mut ctx).await;
        assert!(result.output().contains("No files found"));
    }

    #[tokio::test]
    async fn grep_search_reports_path_line_text() {
        let (_dir, mut ctx) = workspace();
        std::fs::write(
            root(&ctx).join("a.txt"),
            "line one\nline two with pattern\nline three\n",
        )
        .unwrap();

        let call = ToolCall::new(GREP_SEARCH)
            .with_arg("pattern", "PATTERN")
            .with_arg("case_insensitive", true);
        let result = execute_grep_search(&ToolEnv::local(), &call, &mut ctx).await;
        assert!(result.is_success());
        assert_eq!(result.output(), "a.txt:2: line two with pattern");
        assert_eq!(result.metadata.extra["matches"][0]["line"], 2);
    }

    #[tokio::test]
    async fn grep_search_invalid_regex() {
        let (_dir, mut ctx) = workspace();
        let call = ToolCall::new(GREP_SEARCH).with_arg("pattern", "[unclosed");
        let result = execute_grep_search(&ToolEnv::local(), &call, &mut ctx).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn search_root_outside_workspace_is_blocked() {
        let (_dir, mut ctx) = workspace();
        let call = ToolCall::new(GREP_SEARCH)
            .with_arg("pattern", "root")
            .with_arg("path", "/etc");
        let result = execute_grep_search(&ToolEnv::local(), &call, &mut ctx).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::SecurityViolation));
    }
}
