//! Tool domain value objects: immutable result and error types
//!
//! Every tool call, whether it succeeds, fails validation, is rejected by the
//! user or blows up inside an executor, produces a [`ToolResult`]. Nothing
//! crosses the tool-call boundary as a Rust `Err`.

use crate::content::RichContentItem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category of a tool failure.
///
/// | Kind | Typical cause |
/// |------|---------------|
/// | `Validation` | missing/invalid argument, out-of-range line numbers, empty edit |
/// | `SecurityViolation` | path escapes the workspace or hits a sensitive file |
/// | `NotFound` | unknown tool, missing file, unmatched edit, unknown plan item |
/// | `AmbiguousEdit` | edit text matches more than one location |
/// | `Timeout` | command exceeded its time limit |
/// | `ExternalProvider` | MCP server reported an error or is unavailable |
/// | `ExecutionFailed` | I/O error, non-zero exit without output |
/// | `Rejected` | user declined the approval request |
/// | `Cancelled` | abort signal fired |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    SecurityViolation,
    NotFound,
    AmbiguousEdit,
    Timeout,
    ExternalProvider,
    ExecutionFailed,
    Rejected,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::SecurityViolation => "security_violation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AmbiguousEdit => "ambiguous_edit",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ExternalProvider => "external_provider",
            ErrorKind::ExecutionFailed => "execution_failed",
            ErrorKind::Rejected => "rejected",
            ErrorKind::Cancelled => "cancelled",
        }
    }

    /// Whether the model can plausibly fix the call and retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::AmbiguousEdit
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error that occurred during tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Additional details (best-match hints, occurrence lines, stderr)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn security_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SecurityViolation, message)
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::NotFound,
            format!("Resource not found: {}", resource.into()),
        )
    }

    pub fn ambiguous_edit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AmbiguousEdit, message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("Operation timed out: {}", operation.into()),
        )
    }

    pub fn external_provider(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalProvider, message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExecutionFailed, message)
    }

    pub fn rejected(reason: Option<&str>) -> Self {
        let message = match reason {
            Some(r) if !r.is_empty() => format!("Rejected by user: {}", r),
            _ => "Rejected by user".to_string(),
        };
        Self::new(ErrorKind::Rejected, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "Operation cancelled")
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Structured metadata about a tool execution.
///
/// Well-known keys are typed; anything else goes into `extra`. The core
/// never interprets these values, they are passed through to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines_added: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines_removed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
    /// Edit strategy that produced the change (edit_file only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool that was executed
    pub tool_name: String,
    pub success: bool,
    /// Result text shown to the model (empty on most failures)
    #[serde(default)]
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(default)]
    pub metadata: ToolResultMetadata,
    /// Classified content from external providers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rich_content: Option<Vec<RichContentItem>>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: output.into(),
            error: None,
            metadata: ToolResultMetadata::default(),
            rich_content: None,
        }
    }

    /// Create a failed result
    pub fn failure(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            output: String::new(),
            error: Some(error),
            metadata: ToolResultMetadata::default(),
            rich_content: None,
        }
    }

    /// Replace the output text; failures keep their error
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_metadata(mut self, metadata: ToolResultMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.metadata.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.metadata.path = Some(path.into());
        self
    }

    pub fn with_extra(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_rich_content(mut self, items: Vec<RichContentItem>) -> Self {
        self.rich_content = (!items.is_empty()).then_some(items);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Text to hand back to the model: the output on success, otherwise the
    /// error message (with details) followed by any partial output.
    pub fn text_for_model(&self) -> String {
        match &self.error {
            None => self.output.clone(),
            Some(err) => {
                let mut text = format!("Error: {}", err.message);
                if let Some(details) = &err.details {
                    text.push('\n');
                    text.push_str(details);
                }
                if !self.output.is_empty() {
                    text.push_str("\n\n");
                    text.push_str(&self.output);
                }
                text
            }
        }
    }
}
