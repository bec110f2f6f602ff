//! File system port: read/write/search primitives used by the file tools.

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Is a directory: {}", .0.display())]
    IsADirectory(PathBuf),

    #[error("File too large: {} ({size} bytes, limit {limit})", .path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("File is not valid UTF-8: {}", .0.display())]
    InvalidUtf8(PathBuf),

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(String),

    #[error("I/O error on {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

impl FsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKind {
    /// Glob pattern relative to the search root (e.g. `src/**/*.rs`)
    Glob { pattern: String },
    /// Regex over file contents
    Grep {
        pattern: String,
        /// Optional glob restricting which files are scanned
        include: Option<String>,
        case_insensitive: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub root: PathBuf,
    pub kind: SearchKind,
    pub max_results: usize,
}

/// A search hit; `line` and `text` are set for grep matches only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Workspace storage primitives. Paths are absolute and already checked by
/// the path guard.
#[async_trait]
pub trait FileSystemPort: Send + Sync {
    /// Read a UTF-8 file, refusing files larger than `max_bytes`
    async fn read(&self, path: &Path, max_bytes: u64) -> Result<String, FsError>;

    async fn write(&self, path: &Path, content: &str, create_dirs: bool) -> Result<(), FsError>;

    /// Entries sorted directories first, then by name
    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError>;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchMatch>, FsError>;

    /// Delete a file (directories are refused)
    async fn delete(&self, path: &Path) -> Result<(), FsError>;

    /// Create a directory and its parents
    async fn mkdir(&self, path: &Path) -> Result<(), FsError>;

    async fn exists(&self, path: &Path) -> bool;
}
