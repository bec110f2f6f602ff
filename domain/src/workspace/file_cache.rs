//! Read-cache of files opened during a turn.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFile {
    pub content: String,
    pub last_read_at: DateTime<Utc>,
}

/// Path → last known content. Keys are the resolved absolute paths.
#[derive(Debug, Clone, Default)]
pub struct FileCache {
    entries: HashMap<PathBuf, CachedFile>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.entries.insert(
            path.into(),
            CachedFile {
                content: content.into(),
                last_read_at: Utc::now(),
            },
        );
    }

    pub fn get(&self, path: &Path) -> Option<&CachedFile> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn remove(&mut self, path: &Path) -> Option<CachedFile> {
        self.entries.remove(path)
    }

    /// Drop every entry at or below `dir`
    pub fn remove_under(&mut self, dir: &Path) {
        self.entries.retain(|path, _| !path.starts_with(dir));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }
}
