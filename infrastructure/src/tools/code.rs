//! Code intelligence tools: find_definition, find_references, hover, document_symbols
//!
//! Thin wrappers over [`CodeIntelligencePort`]. Positions are 1-based, the
//! same numbering `read_file` and `grep_search` show.
//!
//! [`CodeIntelligencePort`]: toolgate_application::ports::code_intelligence::CodeIntelligencePort

use std::path::PathBuf;

use toolgate_application::ExecutionContext;
use toolgate_application::ports::code_intelligence::{CodeIntelError, Location, Position};
use toolgate_domain::{
    ApprovalType, ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult,
    ToolResultMetadata,
};

use super::{ToolEnv, cancellable, display_path};

pub const FIND_DEFINITION: &str = "find_definition";
pub const FIND_REFERENCES: &str = "find_references";
pub const HOVER: &str = "hover";
pub const DOCUMENT_SYMBOLS: &str = "document_symbols";

fn positional(name: &str, description: &str) -> ToolDefinition {
    ToolDefinition::new(name, description, ApprovalType::None)
        .with_parameter(
            ToolParameter::new("path", "File containing the symbol", true).with_type("path"),
        )
        .with_parameter(
            ToolParameter::new("line", "Line number (1-based)", true).with_type("integer"),
        )
        .with_parameter(
            ToolParameter::new("column", "Column number (1-based)", true).with_type("integer"),
        )
}

pub fn code_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        positional(
            FIND_DEFINITION,
            "Find where the symbol at a position is defined",
        ),
        positional(
            FIND_REFERENCES,
            "Find all references to the symbol at a position",
        ),
        positional(HOVER, "Show type and documentation for the symbol at a position"),
        ToolDefinition::new(
            DOCUMENT_SYMBOLS,
            "List the symbols (functions, types, ...) declared in a file",
            ApprovalType::None,
        )
        .with_parameter(ToolParameter::new("path", "File to inspect", true).with_type("path")),
    ]
}

fn intel_error(err: CodeIntelError) -> ToolError {
    match err {
        CodeIntelError::Unavailable => ToolError::external_provider(
            "code intelligence is unavailable: no language server is attached",
        ),
        CodeIntelError::Timeout => ToolError::timeout("language server request"),
        CodeIntelError::Failed(message) => ToolError::external_provider(message),
    }
}

fn target(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &ExecutionContext,
) -> Result<(PathBuf, Position), ToolError> {
    let path = env.resolve(ctx, call.require_string("path").map_err(ToolError::validation)?)?;
    let coordinate = |key: &str| -> Result<u32, ToolError> {
        match call.get_i64(key) {
            Some(n) if n >= 1 => u32::try_from(n)
                .map_err(|_| ToolError::validation(format!("{} is too large: {}", key, n))),
            Some(n) => Err(ToolError::validation(format!(
                "{} must be 1 or greater, got {}",
                key, n
            ))),
            None => Err(ToolError::validation(format!(
                "Missing required argument: {}",
                key
            ))),
        }
    };
    let position = Position {
        line: coordinate("line")?,
        column: coordinate("column")?,
    };
    Ok((path, position))
}

fn render_locations(ctx: &ExecutionContext, locations: &[Location], empty: &str) -> String {
    if locations.is_empty() {
        return empty.to_string();
    }
    locations
        .iter()
        .map(|loc| {
            let head = format!("{}:{}:{}", display_path(ctx, &loc.path), loc.line, loc.column);
            match &loc.preview {
                Some(preview) => format!("{}: {}", head, preview.trim()),
                None => head,
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn locate(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &ExecutionContext,
    tool: &str,
) -> ToolResult {
    let (path, position) = match target(env, call, ctx) {
        Ok(t) => t,
        Err(e) => return ToolResult::failure(tool, e),
    };
    let query = async {
        if tool == FIND_DEFINITION {
            env.code.find_definition(&path, position).await
        } else {
            env.code.find_references(&path, position).await
        }
    };
    let locations = match cancellable(ctx.cancellation(), query).await {
        Ok(Ok(found)) => found,
        Ok(Err(e)) => return ToolResult::failure(tool, intel_error(e)),
        Err(e) => return ToolResult::failure(tool, e),
    };
    let empty = if tool == FIND_DEFINITION {
        "No definition found"
    } else {
        "No references found"
    };
    ToolResult::success(tool, render_locations(ctx, &locations, empty)).with_metadata(
        ToolResultMetadata {
            match_count: Some(locations.len()),
            ..Default::default()
        },
    )
}

pub async fn execute_find_definition(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    locate(env, call, ctx, FIND_DEFINITION).await
}

pub async fn execute_find_references(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    locate(env, call, ctx, FIND_REFERENCES).await
}

pub async fn execute_hover(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let (path, position) = match target(env, call, ctx) {
        Ok(t) => t,
        Err(e) => return ToolResult::failure(HOVER, e),
    };
    match cancellable(ctx.cancellation(), env.code.hover(&path, position)).await {
        Ok(Ok(Some(text))) => ToolResult::success(HOVER, text),
        Ok(Ok(None)) => ToolResult::success(HOVER, "No hover information at this position"),
        Ok(Err(e)) => ToolResult::failure(HOVER, intel_error(e)),
        Err(e) => ToolResult::failure(HOVER, e),
    }
}

pub async fn execute_document_symbols(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let path = match call
        .require_string("path")
        .map_err(ToolError::validation)
        .and_then(|raw| env.resolve(ctx, raw))
    {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(DOCUMENT_SYMBOLS, e),
    };
    let symbols = match cancellable(ctx.cancellation(), env.code.document_symbols(&path)).await {
        Ok(Ok(found)) => found,
        Ok(Err(e)) => return ToolResult::failure(DOCUMENT_SYMBOLS, intel_error(e)),
        Err(e) => return ToolResult::failure(DOCUMENT_SYMBOLS, e),
    };

    let output = if symbols.is_empty() {
        "No symbols found".to_string()
    } else {
        symbols
            .iter()
            .map(|s| match &s.detail {
                Some(detail) => format!("{}: {} {} ({})", s.line, s.kind, s.name, detail),
                None => format!("{}: {} {}", s.line, s.kind, s.name),
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    ToolResult::success(DOCUMENT_SYMBOLS, output).with_metadata(ToolResultMetadata {
        path: Some(display_path(ctx, &path)),
        match_count: Some(symbols.len()),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::workspace;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use toolgate_application::ports::code_intelligence::{
        CodeIntelligencePort, Diagnostic, SymbolInfo,
    };
    use toolgate_domain::ErrorKind;

    /// Answers every query with one fixed location next to the asked file
    struct Fixed;

    #[async_trait]
    impl CodeIntelligencePort for Fixed {
        async fn find_definition(
            &self,
            path: &Path,
            position: Position,
        ) -> Result<Vec<Location>, CodeIntelError> {
            Ok(vec![Location {
                path: path.with_file_name("lib.rs"),
                line: position.line + 10,
                column: 4,
                preview: Some("  pub fn parse() {".into()),
            }])
        }

        async fn find_references(
            &self,
            _path: &Path,
            _position: Position,
        ) -> Result<Vec<Location>, CodeIntelError> {
            Ok(vec![])
        }

        async fn hover(
            &self,
            _path: &Path,
            _position: Position,
        ) -> Result<Option<String>, CodeIntelError> {
            Err(CodeIntelError::Timeout)
        }

        async fn document_symbols(&self, _path: &Path) -> Result<Vec<SymbolInfo>, CodeIntelError> {
            Ok(vec![SymbolInfo {
                name: "parse".into(),
                kind: "function".into(),
                line: 3,
                detail: None,
            }])
        }

        async fn notify_changed(&self, _path: &Path, _content: &str) -> Result<(), CodeIntelError> {
            Ok(())
        }

        async fn wait_for_diagnostics(
            &self,
            _path: &Path,
            _timeout: Duration,
        ) -> Result<Vec<Diagnostic>, CodeIntelError> {
            Ok(vec![])
        }
    }

    fn env() -> ToolEnv {
        let local = ToolEnv::local();
        ToolEnv::new(local.fs, local.process, Arc::new(Fixed))
    }

    fn at(tool: &str, line: i64) -> ToolCall {
        ToolCall::new(tool)
            .with_arg("path", "src/main.rs")
            .with_arg("line", line)
            .with_arg("column", 5)
    }

    #[tokio::test]
    async fn definition_is_rendered_relative() {
        let (_dir, mut ctx) = workspace();
        let result = execute_find_definition(&env(), &at(FIND_DEFINITION, 2), &mut ctx).await;
        assert!(result.is_success());
        assert_eq!(result.output(), "src/lib.rs:12:4: pub fn parse() {");
    }

    #[tokio::test]
    async fn empty_references() {
        let (_dir, mut ctx) = workspace();
        let result = execute_find_references(&env(), &at(FIND_REFERENCES, 2), &mut ctx).await;
        assert_eq!(result.output(), "No references found");
        assert_eq!(result.metadata.match_count, Some(0));
    }

    #[tokio::test]
    async fn zero_line_is_rejected() {
        let (_dir, mut ctx) = workspace();
        let result = execute_hover(&env(), &at(HOVER, 0), &mut ctx).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn server_timeout_maps_to_timeout_kind() {
        let (_dir, mut ctx) = workspace();
        let result = execute_hover(&env(), &at(HOVER, 1), &mut ctx).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn no_server_attached() {
        let (_dir, mut ctx) = workspace();
        let call = ToolCall::new(DOCUMENT_SYMBOLS).with_arg("path", "src/main.rs");
        let result = execute_document_symbols(&ToolEnv::local(), &call, &mut ctx).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::ExternalProvider));

        let result = execute_document_symbols(&env(), &call, &mut ctx).await;
        assert_eq!(result.output(), "3: function parse");
    }
}
