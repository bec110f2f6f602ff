//! Per-turn execution context.
//!
//! One [`ExecutionContext`] belongs to one in-flight model turn. Tool calls
//! take it by `&mut`, which serializes them: the next call cannot start
//! until the previous one has returned.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use toolgate_domain::{FileCache, Plan};

/// Time and size limits applied by executors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    pub command_timeout: Duration,
    pub diagnostics_timeout: Duration,
    pub read_concurrency: usize,
    /// Files larger than this are refused by read_file
    pub max_read_bytes: u64,
    /// Output returned to the model is truncated beyond this
    pub max_output_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(30),
            diagnostics_timeout: Duration::from_millis(3000),
            read_concurrency: 5,
            max_read_bytes: 10 * 1024 * 1024,
            max_output_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug)]
pub struct ExecutionContext {
    workspace_path: Option<PathBuf>,
    pub file_cache: FileCache,
    pub plan: Option<Plan>,
    pub limits: ResourceLimits,
    cancellation: CancellationToken,
}

impl ExecutionContext {
    pub fn new(workspace_path: Option<PathBuf>, limits: ResourceLimits) -> Self {
        Self {
            workspace_path,
            file_cache: FileCache::new(),
            plan: None,
            limits,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn workspace_path(&self) -> Option<&Path> {
        self.workspace_path.as_deref()
    }

    /// Abort signal for this turn
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Forget cached content for one path, or everything when `None`
    pub fn invalidate_cache(&mut self, path: Option<&Path>) {
        match path {
            Some(p) => {
                self.file_cache.remove(p);
            }
            None => self.file_cache.clear(),
        }
    }

    /// Clear cache and plan and install a fresh abort signal
    pub fn reset(&mut self) {
        self.file_cache.clear();
        self.plan = None;
        self.cancellation = CancellationToken::new();
    }
}
