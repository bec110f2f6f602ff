//! Interactive approval for dangerous tool calls.
//!
//! The prompt goes to stderr so that stdout stays clean for results:
//!
//! ```text
//! ───────────────────────────────────────────────────────────────
//!   Approval required: run_command (builtin)
//! ───────────────────────────────────────────────────────────────
//! Execute a shell command in the workspace
//!
//! Arguments:
//!   {
//!     "command": "cargo fmt"
//!   }
//!
//! approve (a/y) · reject (r/n) [reason] · quit (q)
//! approve>
//! ```
//!
//! # Commands
//!
//! | Command | Aliases | Description |
//! |---------|---------|-------------|
//! | `approve` | `a`, `y`, `yes` | Run the call |
//! | `reject [reason]` | `r`, `n`, `no` | Refuse, optionally saying why |
//! | `quit` | `q`, `abort` | Abort the turn |

use async_trait::async_trait;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use toolgate_application::{ApprovalDecision, ApprovalError, ApprovalPort, ApprovalRequest};
use toolgate_domain::text::truncate_with_notice;

const MAX_ARGUMENT_DISPLAY: usize = 2000;

/// What the user typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Approve,
    Reject(Option<String>),
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_answer(input: &str) -> Answer {
    let input = input.trim();
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };
    match command.to_lowercase().as_str() {
        "" => Answer::Empty,
        "approve" | "a" | "y" | "yes" => Answer::Approve,
        "reject" | "r" | "n" | "no" => {
            Answer::Reject((!rest.is_empty()).then(|| rest.to_string()))
        }
        "quit" | "q" | "abort" => Answer::Quit,
        _ => Answer::Unknown(input.to_string()),
    }
}

/// Terminal implementation of [`ApprovalPort`]
#[derive(Default)]
pub struct InteractiveApprover;

impl InteractiveApprover {
    pub fn new() -> Self {
        Self
    }

    fn display_prompt(request: &ApprovalRequest) {
        let rule = "─".repeat(63);
        eprintln!();
        eprintln!("{}", rule.yellow().bold());
        eprintln!(
            "{}",
            format!(
                "  Approval required: {} ({})",
                request.tool_name, request.provider_id
            )
            .yellow()
            .bold()
        );
        eprintln!("{}", rule.yellow().bold());
        if !request.description.is_empty() {
            eprintln!("{}", request.description.dimmed());
        }
        eprintln!();

        if !request.arguments.is_empty() {
            eprintln!("{}", "Arguments:".cyan().bold());
            let pretty = serde_json::to_string_pretty(&request.arguments)
                .unwrap_or_else(|_| format!("{:?}", request.arguments));
            for line in truncate_with_notice(&pretty, MAX_ARGUMENT_DISPLAY).lines() {
                eprintln!("  {}", line);
            }
            eprintln!();
        }

        eprintln!(
            "{} (a/y) · {} (r/n) [reason] · {} (q)",
            "approve".green(),
            "reject".red(),
            "quit".yellow()
        );
    }

    async fn read_line() -> Result<Option<String>, ApprovalError> {
        tokio::task::spawn_blocking(|| {
            eprint!("{} ", "approve>".magenta().bold());
            io::stderr()
                .flush()
                .map_err(|e| ApprovalError::Io(format!("Failed to flush stderr: {}", e)))?;
            let mut input = String::new();
            let read = io::stdin()
                .lock()
                .read_line(&mut input)
                .map_err(|e| ApprovalError::Io(format!("Failed to read input: {}", e)))?;
            Ok((read > 0).then_some(input))
        })
        .await
        .map_err(|e| ApprovalError::Io(e.to_string()))?
    }
}

#[async_trait]
impl ApprovalPort for InteractiveApprover {
    async fn request_approval(
        &self,
        request: &ApprovalRequest,
    ) -> Result<ApprovalDecision, ApprovalError> {
        Self::display_prompt(request);

        loop {
            let Some(input) = Self::read_line().await? else {
                return Err(ApprovalError::Io("stdin closed".to_string()));
            };
            match parse_answer(&input) {
                Answer::Approve => {
                    eprintln!("{}", "✓ Approved".green());
                    return Ok(ApprovalDecision::Approve);
                }
                Answer::Reject(reason) => {
                    eprintln!("{}", "✗ Rejected".red());
                    return Ok(ApprovalDecision::Reject { reason });
                }
                Answer::Quit => return Err(ApprovalError::Cancelled),
                Answer::Empty => continue,
                Answer::Unknown(text) => {
                    eprintln!("Unknown command: {}", text.red());
                    eprintln!("Available commands: approve, reject [reason], quit");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers() {
        assert_eq!(parse_answer("y\n"), Answer::Approve);
        assert_eq!(parse_answer("  Approve "), Answer::Approve);
        assert_eq!(parse_answer("r"), Answer::Reject(None));
        assert_eq!(
            parse_answer("reject  touches CI config\n"),
            Answer::Reject(Some("touches CI config".to_string()))
        );
        assert_eq!(parse_answer("q"), Answer::Quit);
        assert_eq!(parse_answer("\n"), Answer::Empty);
        assert_eq!(parse_answer("maybe"), Answer::Unknown("maybe".to_string()));
    }
}
