//! Console output for tool results and catalogs

use colored::Colorize;
use serde_json::Value;
use toolgate_domain::{ToolDefinition, ToolResult, ToolResultMetadata};

/// Formats tool results and definitions for terminal display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Human readable rendering of one result
    pub fn format_result(result: &ToolResult) -> String {
        let mut output = String::new();

        let header = match result.error() {
            None => format!("✓ {}", result.tool_name).green().bold(),
            Some(err) => format!("✗ {} [{}]", result.tool_name, err.kind.as_str())
                .red()
                .bold(),
        };
        output.push_str(&format!("{}\n", header));

        if let Some(err) = result.error() {
            output.push_str(&format!("{} {}\n", "Error:".red().bold(), err.message));
            if let Some(details) = &err.details {
                output.push_str(&Self::indent(details, "  "));
                output.push('\n');
            }
        }

        if !result.output.is_empty() {
            if result.error().is_some() {
                output.push('\n');
            }
            output.push_str(&result.output);
            if !result.output.ends_with('\n') {
                output.push('\n');
            }
        }

        let rich = result.rich_content.as_deref().unwrap_or_default();
        if !rich.is_empty() {
            output.push_str(&format!("\n{}\n", "Content:".cyan().bold()));
            for item in rich {
                let summary = item.summary();
                let first = summary.lines().next().unwrap_or_default();
                output.push_str(&format!("  * {} {}\n", item.kind().as_str().dimmed(), first));
            }
        }

        let meta = Self::metadata_line(&result.metadata);
        if !meta.is_empty() {
            output.push_str(&format!("{}\n", meta.dimmed()));
        }
        output
    }

    /// Format as JSON
    pub fn format_result_json(result: &ToolResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
    }

    /// JSON array of the function-calling schemas, with approval requirement
    pub fn format_tools_json(definitions: &[ToolDefinition]) -> String {
        let schemas: Vec<Value> = definitions
            .iter()
            .map(|d| {
                let mut schema = d.to_json_schema();
                if let Value::Object(map) = &mut schema {
                    map.insert("approval".into(), Value::from(d.approval_type.as_str()));
                }
                schema
            })
            .collect();
        serde_json::to_string_pretty(&schemas).unwrap_or_else(|_| "[]".to_string())
    }

    /// One line per tool
    pub fn format_tools(definitions: &[ToolDefinition]) -> String {
        let width = definitions.iter().map(|d| d.name.len()).max().unwrap_or(0);
        let mut output = format!("{}\n", format!("{} tools", definitions.len()).cyan().bold());
        for definition in definitions {
            let flag = if definition.requires_confirmation() {
                " [approval]".yellow().to_string()
            } else {
                String::new()
            };
            let summary = definition.description.lines().next().unwrap_or_default();
            output.push_str(&format!(
                "  {}  {}{}\n",
                format!("{:<width$}", definition.name, width = width).bold(),
                summary,
                flag
            ));
        }
        output
    }

    fn metadata_line(meta: &ToolResultMetadata) -> String {
        let mut parts = Vec::new();
        if let Some(path) = &meta.path {
            parts.push(path.clone());
        }
        if let Some(code) = meta.exit_code {
            parts.push(format!("exit {}", code));
        }
        match (meta.lines_added, meta.lines_removed) {
            (Some(added), Some(removed)) => parts.push(format!("+{} -{}", added, removed)),
            (Some(added), None) => parts.push(format!("+{}", added)),
            (None, Some(removed)) => parts.push(format!("-{}", removed)),
            (None, None) => {}
        }
        if let Some(count) = meta.match_count {
            parts.push(format!("{} matches", count));
        }
        if let Some(bytes) = meta.bytes {
            parts.push(format!("{} bytes", bytes));
        }
        if let Some(strategy) = &meta.strategy {
            parts.push(format!("strategy {}", strategy));
        }
        if let Some(ms) = meta.duration_ms {
            parts.push(format!("{} ms", ms));
        }
        parts.join(" · ")
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolgate_domain::{ApprovalType, ToolError, ToolParameter};

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn success_with_metadata() {
        plain();
        let result = ToolResult::success("run_command", "hello").with_metadata(ToolResultMetadata {
            exit_code: Some(0),
            bytes: Some(6),
            duration_ms: Some(12),
            ..Default::default()
        });
        let text = ConsoleFormatter::format_result(&result);
        assert!(text.starts_with("✓ run_command\nhello\n"));
        assert!(text.contains("exit 0 · 6 bytes · 12 ms"));
    }

    #[test]
    fn failure_shows_kind_and_details() {
        plain();
        let result = ToolResult::failure(
            "edit_file",
            ToolError::ambiguous_edit("old_text matches 2 locations").with_details("lines 3, 9"),
        );
        let text = ConsoleFormatter::format_result(&result);
        assert!(text.contains("✗ edit_file [ambiguous_edit]"));
        assert!(text.contains("Error: old_text matches 2 locations"));
        assert!(text.contains("  lines 3, 9"));
    }

    #[test]
    fn tools_json_carries_schema_and_approval() {
        let defs = vec![
            ToolDefinition::new("read_file", "Read a file", ApprovalType::None)
                .with_parameter(ToolParameter::new("path", "File path", true).with_type("path")),
            ToolDefinition::new("write_file", "Write a file", ApprovalType::Dangerous),
        ];
        let parsed: Value =
            serde_json::from_str(&ConsoleFormatter::format_tools_json(&defs)).unwrap();
        assert_eq!(parsed[0]["name"], "read_file");
        assert_eq!(parsed[0]["approval"], "none");
        assert_eq!(parsed[0]["input_schema"]["required"][0], "path");
        assert_eq!(parsed[1]["approval"], "dangerous");
    }

    #[test]
    fn tools_listing_flags_dangerous() {
        plain();
        let defs = vec![
            ToolDefinition::new("glob_search", "Find files", ApprovalType::None),
            ToolDefinition::new("run_command", "Run a command", ApprovalType::Dangerous),
        ];
        let text = ConsoleFormatter::format_tools(&defs);
        assert!(text.starts_with("2 tools\n"));
        assert!(text.contains("run_command  Run a command [approval]"));
        assert!(!text.contains("Find files [approval]"));
    }
}
