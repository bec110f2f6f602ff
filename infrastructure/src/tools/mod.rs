//! Tool implementations
//!
//! Each module holds the definitions and executors for one family of
//! built-in tools. Executors share the adapters bundled in [`ToolEnv`] and
//! fold every failure into the returned `ToolResult`.
//!
//! ## Providers
//!
//! - `builtin`: the tools below, always available
//! - `mcp` (crate root): tools from external servers

pub mod builtin;
pub mod code;
pub mod command;
pub mod edit;
pub mod file;
pub mod plan;
pub mod search;
#[cfg(feature = "web-tools")]
pub mod web;

mod registry;

pub use builtin::BuiltinProvider;
pub use registry::{RegistryStats, ToolRegistry};

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use toolgate_application::ExecutionContext;
use toolgate_application::ports::code_intelligence::{CodeIntelligencePort, NoCodeIntelligence};
use toolgate_application::ports::file_system::{FileSystemPort, FsError};
use toolgate_application::ports::process::ProcessPort;
use toolgate_domain::{ToolDefinition, ToolError};

use crate::fs::LocalFileSystem;
use crate::process::LocalProcessRunner;
use crate::security::PathGuard;

/// Default location of the persisted plan, relative to the workspace root
pub const DEFAULT_PLAN_FILE: &str = ".toolgate/plan.json";

/// Adapters shared by the built-in executors
#[derive(Clone)]
pub struct ToolEnv {
    pub fs: Arc<dyn FileSystemPort>,
    pub process: Arc<dyn ProcessPort>,
    pub code: Arc<dyn CodeIntelligencePort>,
    pub guard: PathGuard,
    /// Plan artifact path, relative to the workspace root
    pub plan_file: PathBuf,
    #[cfg(feature = "web-tools")]
    pub http: reqwest::Client,
}

impl ToolEnv {
    pub fn new(
        fs: Arc<dyn FileSystemPort>,
        process: Arc<dyn ProcessPort>,
        code: Arc<dyn CodeIntelligencePort>,
    ) -> Self {
        Self {
            fs,
            process,
            code,
            guard: PathGuard::new(),
            plan_file: PathBuf::from(DEFAULT_PLAN_FILE),
            #[cfg(feature = "web-tools")]
            http: reqwest::Client::new(),
        }
    }

    /// Local disk and processes, no language server
    pub fn local() -> Self {
        Self::new(
            Arc::new(LocalFileSystem::new()),
            Arc::new(LocalProcessRunner::new()),
            Arc::new(NoCodeIntelligence),
        )
    }

    pub fn with_plan_file(mut self, plan_file: impl Into<PathBuf>) -> Self {
        self.plan_file = plan_file.into();
        self
    }

    /// Resolve a model-supplied path through the guard
    pub fn resolve(&self, ctx: &ExecutionContext, raw: &str) -> Result<PathBuf, ToolError> {
        Ok(self.guard.resolve(ctx.workspace_path(), raw)?)
    }
}

/// Definitions of every built-in tool, in presentation order
pub fn builtin_tool_definitions() -> Vec<ToolDefinition> {
    let mut defs = vec![
        file::read_file_definition(),
        file::read_files_definition(),
        file::write_file_definition(),
        edit::edit_file_definition(),
        edit::replace_lines_definition(),
        file::list_directory_definition(),
        file::create_directory_definition(),
        file::delete_file_definition(),
        search::glob_search_definition(),
        search::grep_search_definition(),
        command::run_command_definition(),
    ];
    defs.extend(code::code_tool_definitions());
    #[cfg(feature = "web-tools")]
    defs.push(web::web_fetch_definition());
    defs.extend(plan::plan_tool_definitions());
    defs
}

/// Convert a storage error at the tool boundary
pub(crate) fn fs_error(err: FsError) -> ToolError {
    match err {
        FsError::NotFound(path) => ToolError::not_found(path.display().to_string()),
        FsError::PermissionDenied(_) | FsError::Io { .. } => {
            ToolError::execution_failed(err.to_string())
        }
        FsError::NotADirectory(_)
        | FsError::IsADirectory(_)
        | FsError::TooLarge { .. }
        | FsError::InvalidUtf8(_)
        | FsError::InvalidPattern(_) => ToolError::validation(err.to_string()),
    }
}

/// Race `fut` against the turn's abort signal
pub(crate) async fn cancellable<T>(
    token: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, ToolError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ToolError::cancelled()),
        value = fut => Ok(value),
    }
}

/// Path as shown to the model: relative to the workspace when inside it
pub(crate) fn display_path(ctx: &ExecutionContext, path: &Path) -> String {
    ctx.workspace_path()
        .and_then(|root| path.strip_prefix(root).ok())
        .filter(|rel| !rel.as_os_str().is_empty())
        .unwrap_or(path)
        .display()
        .to_string()
}
