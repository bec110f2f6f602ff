//! Code intelligence port: the query/response contract of a language server.

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 1-based cursor position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolInfo {
    pub name: String,
    pub kind: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub line: u32,
    pub column: u32,
    pub severity: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeIntelError {
    #[error("code intelligence is unavailable")]
    Unavailable,

    #[error("timed out waiting for the language server")]
    Timeout,

    #[error("language server error: {0}")]
    Failed(String),
}

#[async_trait]
pub trait CodeIntelligencePort: Send + Sync {
    async fn find_definition(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<Vec<Location>, CodeIntelError>;

    async fn find_references(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<Vec<Location>, CodeIntelError>;

    async fn hover(&self, path: &Path, position: Position)
    -> Result<Option<String>, CodeIntelError>;

    async fn document_symbols(&self, path: &Path) -> Result<Vec<SymbolInfo>, CodeIntelError>;

    /// Tell the server a file changed on disk
    async fn notify_changed(&self, path: &Path, content: &str) -> Result<(), CodeIntelError>;

    /// Wait up to `timeout` for diagnostics published after the last change
    async fn wait_for_diagnostics(
        &self,
        path: &Path,
        timeout: Duration,
    ) -> Result<Vec<Diagnostic>, CodeIntelError>;
}

/// Used when no language server is attached
pub struct NoCodeIntelligence;

#[async_trait]
impl CodeIntelligencePort for NoCodeIntelligence {
    async fn find_definition(
        &self,
        _path: &Path,
        _position: Position,
    ) -> Result<Vec<Location>, CodeIntelError> {
        Err(CodeIntelError::Unavailable)
    }

    async fn find_references(
        &self,
        _path: &Path,
        _position: Position,
    ) -> Result<Vec<Location>, CodeIntelError> {
        Err(CodeIntelError::Unavailable)
    }

    async fn hover(
        &self,
        _path: &Path,
        _position: Position,
    ) -> Result<Option<String>, CodeIntelError> {
        Err(CodeIntelError::Unavailable)
    }

    async fn document_symbols(&self, _path: &Path) -> Result<Vec<SymbolInfo>, CodeIntelError> {
        Err(CodeIntelError::Unavailable)
    }

    async fn notify_changed(&self, _path: &Path, _content: &str) -> Result<(), CodeIntelError> {
        Ok(())
    }

    async fn wait_for_diagnostics(
        &self,
        _path: &Path,
        _timeout: Duration,
    ) -> Result<Vec<Diagnostic>, CodeIntelError> {
        Err(CodeIntelError::Unavailable)
    }
}
