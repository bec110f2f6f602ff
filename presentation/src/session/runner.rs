//! Session runner: reads protocol lines, executes calls one at a time and
//! streams approval requests and results back.
//!
//! Control messages (`approve`, `reject`, `abort`) are handled as soon as
//! they are read, even while a call is waiting for approval. Calls and
//! `end_turn` are queued in arrival order for a single worker that owns the
//! [`ToolSession`].
//!
//! `abort` cancels the current turn and every call queued before it; those
//! calls still get a `result` line with a `cancelled` error. Once input
//! closes, queued calls still run but any approval they need is refused.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use toolgate_application::{ApprovalRequest, SignalApprover, ToolSession, TurnAbort};
use toolgate_domain::{ToolCall, ToolError, ToolResult};
use tracing::{debug, info, warn};

use super::protocol::{Inbound, Outbound, tool_call};

const INPUT_CLOSED: &str = "session input closed";

enum Job {
    Call {
        id: String,
        call: ToolCall,
        epoch: u64,
    },
    EndTurn,
}

/// Counts reported when a session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub calls: usize,
    pub turns: u64,
}

pub struct SessionRunner {
    session: ToolSession,
    approver: Arc<SignalApprover>,
    approvals: mpsc::UnboundedReceiver<ApprovalRequest>,
}

impl SessionRunner {
    /// `approver` must be the approver the session's executor was built
    /// with; `approvals` is its notification receiver.
    pub fn new(
        session: ToolSession,
        approver: Arc<SignalApprover>,
        approvals: mpsc::UnboundedReceiver<ApprovalRequest>,
    ) -> Self {
        Self {
            session,
            approver,
            approvals,
        }
    }

    /// Run until `reader` reaches end of input and every queued call is answered
    pub async fn run<R, W>(self, reader: R, mut writer: W) -> io::Result<SessionSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let Self {
            mut session,
            approver,
            mut approvals,
        } = self;
        let abort = session.abort_handle();
        let epoch = AtomicU64::new(0);
        let input_closed = CancellationToken::new();
        let worker_done = CancellationToken::new();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();
        let (job_tx, mut job_rx) = mpsc::unbounded_channel::<Job>();

        let read = {
            let control = Control {
                approver: &approver,
                abort: &abort,
                epoch: &epoch,
                jobs: job_tx,
                out: out_tx.clone(),
            };
            let input_closed = &input_closed;
            async move {
                let mut lines = reader.lines();
                let result = loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => control.handle(&line),
                        Ok(None) => break Ok(()),
                        Err(e) => break Err(e),
                    }
                };
                debug!("Session input closed");
                input_closed.cancel();
                for id in control.approver.pending_ids() {
                    control.approver.reject(&id, Some(INPUT_CLOSED.to_string()));
                }
                drop(control);
                result
            }
        };

        let work = {
            let out = out_tx.clone();
            let epoch = &epoch;
            let worker_done = &worker_done;
            async move {
                let mut calls = 0;
                while let Some(job) = job_rx.recv().await {
                    match job {
                        Job::Call {
                            id,
                            call,
                            epoch: issued,
                        } => {
                            calls += 1;
                            let result = if issued < epoch.load(Ordering::SeqCst) {
                                debug!(
                                    "Skipping {} ({}): aborted before it started",
                                    call.tool_name, id
                                );
                                ToolResult::failure(&call.tool_name, ToolError::cancelled())
                            } else {
                                session.call(&call).await
                            };
                            let _ = out.send(Outbound::Result { id, result });
                        }
                        Job::EndTurn => session.end_turn(),
                    }
                }
                worker_done.cancel();
                drop(out);
                SessionSummary {
                    calls,
                    turns: session.turns(),
                }
            }
        };

        let forward = {
            let out = out_tx.clone();
            let approver = &approver;
            let input_closed = &input_closed;
            let worker_done = &worker_done;
            async move {
                loop {
                    let request = tokio::select! {
                        biased;
                        _ = worker_done.cancelled() => break,
                        request = approvals.recv() => match request {
                            Some(request) => request,
                            None => break,
                        },
                    };
                    if input_closed.is_cancelled() {
                        approver.reject(&request.id, Some(INPUT_CLOSED.to_string()));
                        continue;
                    }
                    let _ = out.send(Outbound::from(request));
                }
                drop(out);
            }
        };

        drop(out_tx);
        let write = async move {
            while let Some(message) = out_rx.recv().await {
                let line = message.to_line().map_err(io::Error::from)?;
                writer.write_all(line.as_bytes()).await?;
                writer.flush().await?;
            }
            Ok::<_, io::Error>(())
        };

        let (read, summary, (), write) = tokio::join!(read, work, forward, write);
        if let Err(e) = &write {
            warn!("Session output failed: {}", e);
        }
        read?;
        write?;
        info!(calls = summary.calls, turns = summary.turns, "Session finished");
        Ok(summary)
    }
}

/// Reader-side handling of inbound lines
struct Control<'a> {
    approver: &'a SignalApprover,
    abort: &'a TurnAbort,
    epoch: &'a AtomicU64,
    jobs: mpsc::UnboundedSender<Job>,
    out: mpsc::UnboundedSender<Outbound>,
}

impl Control<'_> {
    fn handle(&self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        let message = match Inbound::parse(line) {
            Ok(message) => message,
            Err(e) => {
                debug!("Invalid session line: {}", e);
                self.reply(Outbound::error(None, format!("invalid message: {}", e)));
                return;
            }
        };

        match message {
            Inbound::Call {
                id,
                name,
                arguments,
            } => {
                debug!("Queued {} ({})", name, id);
                let job = Job::Call {
                    call: tool_call(id.clone(), name, arguments),
                    id,
                    epoch: self.epoch.load(Ordering::SeqCst),
                };
                self.queue(job);
            }
            Inbound::Approve { id } => {
                if !self.approver.approve(&id) {
                    self.reply(Outbound::error(Some(id), "no pending approval with this id"));
                }
            }
            Inbound::Reject { id, reason } => {
                if !self.approver.reject(&id, reason) {
                    self.reply(Outbound::error(Some(id), "no pending approval with this id"));
                }
            }
            Inbound::Abort => {
                info!("Session turn aborted");
                self.epoch.fetch_add(1, Ordering::SeqCst);
                self.abort.abort();
            }
            Inbound::EndTurn => self.queue(Job::EndTurn),
        }
    }

    fn queue(&self, job: Job) {
        if self.jobs.send(job).is_err() {
            warn!("Session worker stopped; dropping message");
        }
    }

    fn reply(&self, message: Outbound) {
        let _ = self.out.send(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use toolgate_application::{
        ExecuteToolCallUseCase, ExecutionContext, NoAuditLogger, ResourceLimits, ToolProvider,
        ToolRegistryPort,
    };
    use toolgate_domain::{ApprovalType, ToolDefinition};
    use tokio::io::{BufReader, duplex};

    struct Tools;

    #[async_trait]
    impl ToolProvider for Tools {
        fn id(&self) -> &str {
            "test"
        }

        fn display_name(&self) -> &str {
            "Test"
        }

        fn has_tool(&self, name: &str) -> bool {
            matches!(name, "echo" | "delete" | "wait")
        }

        fn tool_definitions(&self) -> Vec<ToolDefinition> {
            vec![
                ToolDefinition::new("echo", "Echo the text argument", ApprovalType::None),
                ToolDefinition::new("delete", "Pretend to delete", ApprovalType::Dangerous),
                ToolDefinition::new("wait", "Wait until aborted", ApprovalType::None),
            ]
        }

        fn is_auto_approved(&self, _name: &str) -> bool {
            false
        }

        async fn execute(&self, call: &ToolCall, ctx: &mut ExecutionContext) -> ToolResult {
            match call.tool_name.as_str() {
                "wait" => {
                    ctx.cancellation().cancelled().await;
                    ToolResult::failure("wait", ToolError::cancelled())
                }
                name => ToolResult::success(name, call.get_string("text").unwrap_or("done")),
            }
        }
    }

    struct Registry(Arc<Tools>);

    impl ToolRegistryPort for Registry {
        fn tool_definitions(&self) -> Vec<ToolDefinition> {
            self.0.tool_definitions()
        }

        fn resolve(&self, name: &str) -> Option<Arc<dyn ToolProvider>> {
            self.0.has_tool(name).then(|| self.0.clone() as Arc<dyn ToolProvider>)
        }
    }

    fn runner() -> SessionRunner {
        let (approver, approvals) = SignalApprover::channel();
        let approver = Arc::new(approver);
        let executor = Arc::new(ExecuteToolCallUseCase::new(
            Arc::new(Registry(Arc::new(Tools))),
            approver.clone(),
            Arc::new(NoAuditLogger),
        ));
        let session = ToolSession::new(executor, None, ResourceLimits::default());
        SessionRunner::new(session, approver, approvals)
    }

    fn lines(output: &[u8]) -> Vec<Value> {
        std::str::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn piped_calls_run_in_order() {
        let input = concat!(
            r#"{"type":"call","id":"1","name":"echo","arguments":{"text":"hi"}}"#,
            "\n\n",
            r#"{"type":"end_turn"}"#,
            "\n",
            r#"{"type":"call","id":"2","name":"echo"}"#,
            "\n",
        );
        let mut output = Vec::new();
        let summary = runner().run(input.as_bytes(), &mut output).await.unwrap();

        let lines = lines(&output);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "result");
        assert_eq!(lines[0]["id"], "1");
        assert_eq!(lines[0]["result"]["output"], "hi");
        assert_eq!(lines[1]["id"], "2");
        assert_eq!(summary, SessionSummary { calls: 2, turns: 2 });
    }

    #[tokio::test]
    async fn bad_lines_get_error_replies() {
        let input = concat!(
            "not json\n",
            r#"{"type":"approve","id":"ghost"}"#,
            "\n",
        );
        let mut output = Vec::new();
        runner().run(input.as_bytes(), &mut output).await.unwrap();

        let lines = lines(&output);
        assert_eq!(lines[0]["type"], "error");
        assert!(lines[0].get("id").is_none());
        assert_eq!(lines[1]["id"], "ghost");
    }

    #[tokio::test]
    async fn approval_is_refused_once_input_closes() {
        let input = concat!(r#"{"type":"call","id":"d1","name":"delete"}"#, "\n");
        let mut output = Vec::new();
        runner().run(input.as_bytes(), &mut output).await.unwrap();

        let lines = lines(&output);
        let result = lines.iter().find(|l| l["type"] == "result").unwrap();
        assert_eq!(result["result"]["success"], false);
        assert_eq!(result["result"]["error"]["kind"], "rejected");
    }

    #[tokio::test]
    async fn approve_over_the_wire() {
        let (mut client_in, server_in) = duplex(4096);
        let (server_out, client_out) = duplex(4096);
        let mut replies = BufReader::new(client_out).lines();

        let client = async move {
            client_in
                .write_all(b"{\"type\":\"call\",\"id\":\"d1\",\"name\":\"delete\"}\n")
                .await
                .unwrap();
            let request: Value =
                serde_json::from_str(&replies.next_line().await.unwrap().unwrap()).unwrap();
            assert_eq!(request["type"], "approval_required");
            assert_eq!(request["id"], "d1");
            assert_eq!(request["tool"], "delete");
            assert_eq!(request["provider"], "test");

            client_in
                .write_all(b"{\"type\":\"approve\",\"id\":\"d1\"}\n")
                .await
                .unwrap();
            let result: Value =
                serde_json::from_str(&replies.next_line().await.unwrap().unwrap()).unwrap();
            assert_eq!(result["type"], "result");
            assert_eq!(result["result"]["success"], true);
            drop(client_in);
        };

        let (summary, ()) = tokio::join!(
            runner().run(BufReader::new(server_in), server_out),
            client
        );
        assert_eq!(summary.unwrap().calls, 1);
    }

    #[tokio::test]
    async fn abort_cancels_running_and_queued_calls() {
        let input = concat!(
            r#"{"type":"call","id":"w","name":"wait"}"#,
            "\n",
            r#"{"type":"call","id":"e","name":"echo"}"#,
            "\n",
            r#"{"type":"abort"}"#,
            "\n",
            r#"{"type":"call","id":"after","name":"echo"}"#,
            "\n",
        );
        let mut output = Vec::new();
        runner().run(input.as_bytes(), &mut output).await.unwrap();

        let results = lines(&output);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["id"], "w");
        assert_eq!(results[0]["result"]["error"]["kind"], "cancelled");
        assert_eq!(results[1]["id"], "e");
        assert_eq!(results[1]["result"]["error"]["kind"], "cancelled");
        assert_eq!(results[2]["id"], "after");
        assert_eq!(results[2]["result"]["success"], true);
    }
}
