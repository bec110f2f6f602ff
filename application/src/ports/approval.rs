//! Approval port: where human decisions on dangerous tool calls come from.
//!
//! # Built-in Implementations
//!
//! - [`AutoApprove`]: approves everything (trusted automation)
//! - [`AutoReject`]: rejects everything (safest non-interactive mode)
//! - [`SignalApprover`]: parks each request until an external
//!   [`approve`](SignalApprover::approve) / [`reject`](SignalApprover::reject)
//!   arrives, e.g. from a JSONL session protocol
//!
//! The interactive terminal prompt lives in the presentation layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// A dangerous tool call waiting for a decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: String,
    pub tool_name: String,
    pub provider_id: String,
    pub arguments: HashMap<String, serde_json::Value>,
    /// Tool description shown next to the prompt
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Reject { reason: Option<String> },
}

impl ApprovalDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, ApprovalDecision::Approve)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    #[error("approval cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("approval channel closed")]
    ChannelClosed,
}

#[async_trait]
pub trait ApprovalPort: Send + Sync {
    /// Ask for a decision. May wait indefinitely; callers race it against
    /// their abort signal.
    async fn request_approval(
        &self,
        request: &ApprovalRequest,
    ) -> Result<ApprovalDecision, ApprovalError>;
}

pub struct AutoApprove;

#[async_trait]
impl ApprovalPort for AutoApprove {
    async fn request_approval(
        &self,
        _request: &ApprovalRequest,
    ) -> Result<ApprovalDecision, ApprovalError> {
        Ok(ApprovalDecision::Approve)
    }
}

pub struct AutoReject;

#[async_trait]
impl ApprovalPort for AutoReject {
    async fn request_approval(
        &self,
        _request: &ApprovalRequest,
    ) -> Result<ApprovalDecision, ApprovalError> {
        Ok(ApprovalDecision::Reject {
            reason: Some("automatic rejection is configured".to_string()),
        })
    }
}

/// Approver driven by external signals.
///
/// Each request is announced on the notification channel and parked on a
/// oneshot until [`approve`](Self::approve) or [`reject`](Self::reject) is
/// called with its id. A waiter that is dropped (aborted) removes its own
/// entry.
pub struct SignalApprover {
    pending: Arc<StdMutex<HashMap<String, oneshot::Sender<ApprovalDecision>>>>,
    notify_tx: mpsc::UnboundedSender<ApprovalRequest>,
}

impl SignalApprover {
    /// Create the approver and the receiver on which requests are announced
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ApprovalRequest>) {
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        (
            Self {
                pending: Arc::new(StdMutex::new(HashMap::new())),
                notify_tx,
            },
            notify_rx,
        )
    }

    /// Resolve a pending request. Returns false for unknown ids.
    pub fn approve(&self, id: &str) -> bool {
        self.resolve(id, ApprovalDecision::Approve)
    }

    pub fn reject(&self, id: &str, reason: Option<String>) -> bool {
        self.resolve(id, ApprovalDecision::Reject { reason })
    }

    pub fn pending_ids(&self) -> Vec<String> {
        lock(&self.pending).keys().cloned().collect()
    }

    /// Drop every pending request; waiters observe `Cancelled`
    pub fn cancel_all(&self) {
        lock(&self.pending).clear();
    }

    fn resolve(&self, id: &str, decision: ApprovalDecision) -> bool {
        let sender = lock(&self.pending).remove(id);
        match sender {
            Some(tx) => tx.send(decision).is_ok(),
            None => {
                debug!("No pending approval with id {}", id);
                false
            }
        }
    }
}

type Parked = HashMap<String, oneshot::Sender<ApprovalDecision>>;
type PendingMap = StdMutex<Parked>;

fn lock(pending: &PendingMap) -> MutexGuard<'_, Parked> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Removes a parked request when its waiter goes away
struct PendingEntry {
    pending: Arc<PendingMap>,
    id: String,
}

impl Drop for PendingEntry {
    fn drop(&mut self) {
        lock(&self.pending).remove(&self.id);
    }
}

#[async_trait]
impl ApprovalPort for SignalApprover {
    async fn request_approval(
        &self,
        request: &ApprovalRequest,
    ) -> Result<ApprovalDecision, ApprovalError> {
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(request.id.clone(), tx);
        let _entry = PendingEntry {
            pending: self.pending.clone(),
            id: request.id.clone(),
        };

        if self.notify_tx.send(request.clone()).is_err() {
            return Err(ApprovalError::ChannelClosed);
        }

        // No timeout: the user may take as long as they like
        rx.await.map_err(|_| ApprovalError::Cancelled)
    }
}
