//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored, human readable
    Text,
    /// Pretty-printed JSON
    Json,
}

/// CLI arguments for toolgate
#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(author, version, about = "Sandboxed tool execution with human approval")]
#[command(long_about = r#"
toolgate executes tool calls (file, search, command, plan, web and MCP tools)
inside a workspace root, asking for approval before anything dangerous runs.

Configuration is merged from (lowest to highest priority):
1. Built-in defaults
2. ~/.config/toolgate/config.toml        Global config
3. ./toolgate.toml or ./.toolgate.toml   Project config
4. --config <path>                       Explicit config file
5. TOOLGATE_* environment variables      (nested keys split on "__")

Example:
  toolgate tools
  toolgate call read_file --args '{"path": "src/main.rs"}'
  toolgate --approval auto_reject session < calls.jsonl
"#)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Workspace root (defaults to the configured root, then the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Approval mode: interactive, auto_approve or auto_reject
    #[arg(long, global = true, value_name = "MODE")]
    pub approval: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print the JSON schema of every available tool
    Tools {
        #[arg(short, long, value_enum, default_value = "json")]
        output: OutputFormat,
    },

    /// Run a single tool call in a fresh turn and print its result
    Call {
        /// Tool name, e.g. read_file or mcp__github__search_issues
        name: String,

        /// Arguments as a JSON object
        #[arg(long, value_name = "JSON")]
        args: Option<String>,

        #[arg(short, long, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Speak the JSONL session protocol over stdin/stdout
    Session,

    /// Show configuration sources and the effective configuration
    Config,
}

/// Parse `--args` into call arguments. Absent means no arguments.
pub fn parse_call_arguments(raw: Option<&str>) -> Result<HashMap<String, Value>, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(HashMap::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map.into_iter().collect()),
        Ok(other) => Err(format!(
            "--args must be a JSON object, got {}",
            json_type(&other)
        )),
        Err(e) => Err(format!("--args is not valid JSON: {}", e)),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "toolgate",
            "call",
            "read_file",
            "--args",
            r#"{"path":"a.txt"}"#,
            "-vv",
            "--approval",
            "auto_reject",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.approval.as_deref(), Some("auto_reject"));
        match cli.command {
            Command::Call { name, args, output } => {
                assert_eq!(name, "read_file");
                assert_eq!(args.as_deref(), Some(r#"{"path":"a.txt"}"#));
                assert_eq!(output, OutputFormat::Text);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn tools_defaults_to_json() {
        let cli = Cli::try_parse_from(["toolgate", "--no-config", "tools"]).unwrap();
        assert!(cli.no_config);
        assert_eq!(
            cli.command,
            Command::Tools {
                output: OutputFormat::Json
            }
        );
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["toolgate"]).is_err());
    }

    #[test]
    fn call_arguments() {
        assert!(parse_call_arguments(None).unwrap().is_empty());
        assert!(parse_call_arguments(Some("  ")).unwrap().is_empty());

        let args = parse_call_arguments(Some(r#"{"path": "x", "limit": 3}"#)).unwrap();
        assert_eq!(args["path"], "x");
        assert_eq!(args["limit"], 3);

        let err = parse_call_arguments(Some("[1, 2]")).unwrap_err();
        assert!(err.contains("an array"));
        assert!(parse_call_arguments(Some("{oops")).is_err());
    }
}
