//! Wire messages, one JSON object per line.
//!
//! Inbound:
//!
//! ```text
//! {"type":"call","id":"c1","name":"read_file","arguments":{"path":"README.md"}}
//! {"type":"approve","id":"c2"}
//! {"type":"reject","id":"c2","reason":"not now"}
//! {"type":"abort"}
//! {"type":"end_turn"}
//! ```
//!
//! Outbound messages are `approval_required`, `result` and `error`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use toolgate_application::ApprovalRequest;
use toolgate_domain::{ToolCall, ToolResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    Call {
        id: String,
        name: String,
        #[serde(default)]
        arguments: HashMap<String, Value>,
    },
    Approve {
        id: String,
    },
    Reject {
        id: String,
        #[serde(default)]
        reason: Option<String>,
    },
    Abort,
    EndTurn,
}

impl Inbound {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Build the call for an inbound `call`; the message id becomes the call id
pub(crate) fn tool_call(id: String, name: String, arguments: HashMap<String, Value>) -> ToolCall {
    ToolCall {
        tool_name: name,
        arguments,
        call_id: Some(id),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    ApprovalRequired {
        id: String,
        tool: String,
        provider: String,
        arguments: HashMap<String, Value>,
        description: String,
    },
    Result {
        id: String,
        result: ToolResult,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        message: String,
    },
}

impl Outbound {
    pub fn error(id: Option<String>, message: impl Into<String>) -> Self {
        Outbound::Error {
            id,
            message: message.into(),
        }
    }

    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

impl From<ApprovalRequest> for Outbound {
    fn from(request: ApprovalRequest) -> Self {
        Outbound::ApprovalRequired {
            id: request.id,
            tool: request.tool_name,
            provider: request.provider_id,
            arguments: request.arguments,
            description: request.description,
        }
    }
}
