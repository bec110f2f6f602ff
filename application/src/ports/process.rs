//! Process execution port.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Shell command line
    pub command: String,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Problem reported while collecting the output (e.g. a failed pipe read)
    pub error: Option<String>,
}

impl CommandOutput {
    /// stdout followed by stderr, as shown to the model
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim_end();
        let stderr = self.stderr.trim_end();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, true) => String::new(),
            (false, true) => stdout.to_string(),
            (true, false) => format!("[stderr]\n{}", stderr),
            (false, false) => format!("{}\n[stderr]\n{}", stdout, stderr),
        }
    }

    pub fn has_output(&self) -> bool {
        !self.stdout.trim().is_empty() || !self.stderr.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("command timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),

    #[error("command cancelled")]
    Cancelled,

    #[error("failed to spawn command: {0}")]
    Spawn(String),
}

#[async_trait]
pub trait ProcessPort: Send + Sync {
    /// Run to completion, killing the child on timeout or when `abort` fires
    async fn execute_background(
        &self,
        request: &CommandRequest,
        abort: CancellationToken,
    ) -> Result<CommandOutput, ProcessError>;
}
