//! Local process runner on `tokio::process`.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use toolgate_application::ports::process::{
    CommandOutput, CommandRequest, ProcessError, ProcessPort,
};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct LocalProcessRunner;

impl LocalProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn shell(command: &str) -> Command {
        if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        }
    }
}

#[async_trait]
impl ProcessPort for LocalProcessRunner {
    async fn execute_background(
        &self,
        request: &CommandRequest,
        abort: CancellationToken,
    ) -> Result<CommandOutput, ProcessError> {
        let mut cmd = Self::shell(&request.command);
        if let Some(cwd) = &request.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout/abort kills the child
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| ProcessError::Spawn(e.to_string()))?;
        debug!("Spawned `{}` (pid {:?})", request.command, child.id());

        let output = tokio::select! {
            result = child.wait_with_output() => result,
            _ = tokio::time::sleep(request.timeout) => {
                warn!("Command timed out after {:?}: {}", request.timeout, request.command);
                return Err(ProcessError::TimedOut(request.timeout));
            }
            _ = abort.cancelled() => {
                debug!("Command aborted: {}", request.command);
                return Err(ProcessError::Cancelled);
            }
        };

        match output {
            Ok(out) => Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                exit_code: out.status.code(),
                error: None,
            }),
            Err(e) => Ok(CommandOutput {
                error: Some(format!("failed to collect output: {}", e)),
                ..Default::default()
            }),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn request(command: &str, timeout: Duration) -> CommandRequest {
        CommandRequest {
            command: command.to_string(),
            cwd: None,
            timeout,
        }
    }

    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let out = LocalProcessRunner::new()
            .execute_background(
                &request("echo out; echo err >&2; exit 3", Duration::from_secs(5)),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
        assert_eq!(out.exit_code, Some(3));
    }

    #[tokio::test]
    async fn runs_in_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request("pwd", Duration::from_secs(5));
        req.cwd = Some(dir.path().to_path_buf());
        let out = LocalProcessRunner::new()
            .execute_background(&req, CancellationToken::new())
            .await
            .unwrap();
        let reported = std::fs::canonicalize(out.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[tokio::test]
    async fn timeout_is_distinct() {
        let err = LocalProcessRunner::new()
            .execute_background(
                &request("sleep 5", Duration::from_millis(100)),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, ProcessError::TimedOut(Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn abort_kills_the_child() {
        let abort = CancellationToken::new();
        let trigger = abort.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let err = LocalProcessRunner::new()
            .execute_background(&request("sleep 5", Duration::from_secs(10)), abort)
            .await
            .unwrap_err();
        assert_eq!(err, ProcessError::Cancelled);
    }
}
