//! CLI entrypoint for toolgate
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::BufReader;
use toolgate_application::{
    ApprovalPort, AuditLogger, AutoApprove, AutoReject, ExecuteToolCallUseCase, NoAuditLogger,
    SignalApprover, ToolRegistryPort, ToolSession,
};
use toolgate_domain::ToolCall;
use toolgate_infrastructure::{
    ApprovalMode, BuiltinProvider, ConfigLoader, ConfigSource, FileConfig, JsonlAuditLogger,
    McpServerRegistry, McpToolProvider, ToolEnv, ToolRegistry,
};
use toolgate_presentation::{
    Cli, Command, ConsoleFormatter, InteractiveApprover, OutputFormat, SessionRunner,
    parse_call_arguments,
};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;

    info!("Starting toolgate");

    let config = load_config(&cli)?;
    if cli.command == Command::Config {
        print_config_sources(&ConfigLoader::sources(cli.config.as_deref()), cli.no_config);
        println!();
        println!("Effective configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    let root = resolve_workspace(cli.workspace.as_deref(), config.workspace.root.as_deref())?;
    let mode = match cli.approval.as_deref() {
        Some(raw) => ApprovalMode::parse(raw)
            .ok_or_else(|| anyhow!("unknown approval mode '{}'", raw))?,
        None => config.approval.parse_mode()?,
    };
    info!(workspace = %root.display(), approval = mode.as_str(), "Workspace ready");

    // === Dependency Injection ===
    let registry: Arc<dyn ToolRegistryPort> = Arc::new(build_registry(&config)?);
    let audit = open_audit_log(&config, &root);

    match cli.command {
        Command::Tools { output } => {
            let definitions = registry.tool_definitions();
            match output {
                OutputFormat::Json => {
                    println!("{}", ConsoleFormatter::format_tools_json(&definitions))
                }
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_tools(&definitions)),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Call { name, args, output } => {
            let arguments = parse_call_arguments(args.as_deref()).map_err(|e| anyhow!(e))?;
            let approver: Arc<dyn ApprovalPort> = match mode {
                ApprovalMode::Interactive => Arc::new(InteractiveApprover::new()),
                ApprovalMode::AutoApprove => Arc::new(AutoApprove),
                ApprovalMode::AutoReject => Arc::new(AutoReject),
            };
            let executor = Arc::new(ExecuteToolCallUseCase::new(registry, approver, audit));
            let mut session = ToolSession::new(executor, Some(root), config.to_resource_limits());

            let abort = session.abort_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupted; aborting the call");
                    abort.abort();
                }
            });

            let call = ToolCall {
                tool_name: name,
                arguments,
                call_id: None,
            };
            let result = session.call(&call).await;
            session.end_turn();

            match output {
                OutputFormat::Json => println!("{}", ConsoleFormatter::format_result_json(&result)),
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_result(&result)),
            }
            Ok(if result.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Session => {
            let (signal, approvals) = SignalApprover::channel();
            let signal = Arc::new(signal);
            let approver: Arc<dyn ApprovalPort> = match mode {
                ApprovalMode::Interactive => signal.clone(),
                ApprovalMode::AutoApprove => Arc::new(AutoApprove),
                ApprovalMode::AutoReject => Arc::new(AutoReject),
            };
            let executor = Arc::new(ExecuteToolCallUseCase::new(registry, approver, audit));
            let session = ToolSession::new(executor, Some(root), config.to_resource_limits());

            let summary = SessionRunner::new(session, signal, approvals)
                .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                .await
                .context("session I/O failed")?;
            debug!(calls = summary.calls, turns = summary.turns, "Session closed");
            Ok(ExitCode::SUCCESS)
        }
        // Printed before workspace setup
        Command::Config => Ok(ExitCode::SUCCESS),
    }
}

/// stderr always; `--log-file` adds a non-blocking file writer
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(EnvFilter::new(level))
            .with(stderr_layer)
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("--log-file {} does not name a file", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(EnvFilter::new(level))
        .with(stderr_layer)
        .with(file_layer)
        .init();
    info!(path = %path.display(), "File logging initialized");
    Ok(Some(guard))
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("failed to load configuration: {}", e))?
    };
    config.validate()?;
    Ok(config)
}

/// `--workspace`, then `workspace.root`, then the current directory
fn resolve_workspace(flag: Option<&Path>, configured: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("cannot read the current directory")?;
    let root = match flag.or(configured) {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => cwd.join(path),
        None => cwd,
    };
    if !root.is_dir() {
        bail!("workspace root {} is not a directory", root.display());
    }
    root.canonicalize()
        .with_context(|| format!("cannot resolve workspace root {}", root.display()))
}

fn build_registry(config: &FileConfig) -> Result<ToolRegistry> {
    let env = ToolEnv::local().with_plan_file(&config.workspace.plan_file);
    let builtin = BuiltinProvider::new(env)
        .with_auto_approve(config.approval.auto_approve.iter().cloned());

    let servers = Arc::new(McpServerRegistry::new());
    for spec in config.mcp.server_specs() {
        servers.declare(spec)?;
    }
    if !servers.server_ids().is_empty() {
        // Transports attach connections at runtime; until then the servers list no tools
        info!(servers = ?servers.server_ids(), "MCP servers declared");
    }

    let registry = ToolRegistry::new()
        .register(builtin)
        .register(McpToolProvider::new(servers));
    let stats = registry.stats();
    debug!(tools = stats.total_tools, providers = ?stats.providers, "Tool registry built");
    Ok(registry)
}

fn open_audit_log(config: &FileConfig, root: &Path) -> Arc<dyn AuditLogger> {
    if !config.logging.audit {
        return Arc::new(NoAuditLogger);
    }
    let path = root.join(&config.logging.audit_log);
    match JsonlAuditLogger::open(&path) {
        Some(logger) => {
            debug!(path = %logger.path().display(), "Audit log open");
            Arc::new(logger)
        }
        None => Arc::new(NoAuditLogger),
    }
}

/// Print the config file locations being used
fn print_config_sources(sources: &[ConfigSource], no_config: bool) {
    println!("Configuration sources (in priority order):");
    if no_config {
        println!("  (--no-config: files and environment are ignored)");
    }
    for source in sources {
        let mark = if source.found { "FOUND" } else { "     " };
        let location = match (&source.path, source.label) {
            (Some(path), _) => path.display().to_string(),
            (None, "Environment") => {
                format!("{}* variables", toolgate_infrastructure::config::ENV_PREFIX)
            }
            (None, _) => "built-in defaults".to_string(),
        };
        println!("  [{}] {:<11} {}", mark, format!("{}:", source.label), location);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_flag_beats_config() {
        let flag = tempfile::tempdir().unwrap();
        let configured = tempfile::tempdir().unwrap();
        let root = resolve_workspace(Some(flag.path()), Some(configured.path())).unwrap();
        assert_eq!(root, flag.path().canonicalize().unwrap());

        let root = resolve_workspace(None, Some(configured.path())).unwrap();
        assert_eq!(root, configured.path().canonicalize().unwrap());
    }

    #[test]
    fn missing_workspace_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_workspace(Some(&dir.path().join("absent")), None).is_err());
    }

    #[test]
    fn registry_serves_builtin_tools() {
        let registry = build_registry(&FileConfig::default()).unwrap();
        assert!(registry.has_tool("read_file"));
        assert!(registry.has_tool("run_command"));
        assert!(!registry.has_tool("mcp__github__search_issues"));
    }
}
