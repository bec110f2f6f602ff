//! Local file system adapter on `tokio::fs`.
//!
//! Searches walk the tree with the `glob` crate on a blocking thread.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use glob::glob;
use regex::RegexBuilder;
use toolgate_application::ports::file_system::{
    DirEntry, FileSystemPort, FsError, SearchKind, SearchMatch, SearchQuery,
};
use tracing::debug;

/// Files larger than this are skipped by grep
const MAX_GREP_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Directories never descended into by searches
const SKIPPED_DIRS: &[&str] = &[".git", "target", "node_modules"];

#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

fn map_io(path: &Path, e: io::Error) -> FsError {
    match e.kind() {
        io::ErrorKind::NotFound => FsError::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => FsError::PermissionDenied(path.to_path_buf()),
        _ => FsError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        },
    }
}

fn is_skipped(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| SKIPPED_DIRS.iter().any(|s| c.as_os_str() == *s))
}

#[async_trait]
impl FileSystemPort for LocalFileSystem {
    async fn read(&self, path: &Path, max_bytes: u64) -> Result<String, FsError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| map_io(path, e))?;
        if meta.is_dir() {
            return Err(FsError::IsADirectory(path.to_path_buf()));
        }
        if meta.len() > max_bytes {
            return Err(FsError::TooLarge {
                path: path.to_path_buf(),
                size: meta.len(),
                limit: max_bytes,
            });
        }
        let bytes = tokio::fs::read(path).await.map_err(|e| map_io(path, e))?;
        String::from_utf8(bytes).map_err(|_| FsError::InvalidUtf8(path.to_path_buf()))
    }

    async fn write(&self, path: &Path, content: &str, create_dirs: bool) -> Result<(), FsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if create_dirs {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| map_io(parent, e))?;
            } else if !tokio::fs::try_exists(parent).await.unwrap_or(false) {
                return Err(FsError::NotFound(parent.to_path_buf()));
            }
        }
        if tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(FsError::IsADirectory(path.to_path_buf()));
        }
        tokio::fs::write(path, content)
            .await
            .map_err(|e| map_io(path, e))
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| map_io(path, e))?;
        if !meta.is_dir() {
            return Err(FsError::NotADirectory(path.to_path_buf()));
        }

        let mut reader = tokio::fs::read_dir(path)
            .await
            .map_err(|e| map_io(path, e))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| map_io(path, e))? {
            let is_directory = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                is_directory,
            });
        }
        entries.sort_by(|a, b| {
            b.is_directory
                .cmp(&a.is_directory)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(entries)
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchMatch>, FsError> {
        let query = query.clone();
        tokio::task::spawn_blocking(move || search_blocking(&query))
            .await
            .map_err(|e| FsError::Io {
                path: PathBuf::new(),
                message: format!("search task failed: {}", e),
            })?
    }

    async fn delete(&self, path: &Path) -> Result<(), FsError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| map_io(path, e))?;
        if meta.is_dir() {
            return Err(FsError::IsADirectory(path.to_path_buf()));
        }
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| map_io(path, e))
    }

    async fn mkdir(&self, path: &Path) -> Result<(), FsError> {
        if let Ok(meta) = tokio::fs::metadata(path).await
            && !meta.is_dir()
        {
            return Err(FsError::NotADirectory(path.to_path_buf()));
        }
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| map_io(path, e))
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}

fn search_blocking(query: &SearchQuery) -> Result<Vec<SearchMatch>, FsError> {
    if !query.root.exists() {
        return Err(FsError::NotFound(query.root.clone()));
    }
    match &query.kind {
        SearchKind::Glob { pattern } => glob_files(&query.root, pattern, query.max_results),
        SearchKind::Grep {
            pattern,
            include,
            case_insensitive,
        } => grep_files(
            &query.root,
            pattern,
            include.as_deref(),
            *case_insensitive,
            query.max_results,
        ),
    }
}

fn glob_files(root: &Path, pattern: &str, max: usize) -> Result<Vec<SearchMatch>, FsError> {
    let full = root.join(pattern);
    let entries =
        glob(&full.to_string_lossy()).map_err(|e| FsError::InvalidPattern(e.to_string()))?;

    let mut matches = Vec::new();
    for path in entries.flatten() {
        if matches.len() >= max {
            break;
        }
        if is_skipped(&path, root) {
            continue;
        }
        matches.push(SearchMatch {
            path,
            line: None,
            text: None,
        });
    }
    Ok(matches)
}

fn grep_files(
    root: &Path,
    pattern: &str,
    include: Option<&str>,
    case_insensitive: bool,
    max: usize,
) -> Result<Vec<SearchMatch>, FsError> {
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| FsError::InvalidPattern(e.to_string()))?;

    let files: Vec<PathBuf> = if root.is_file() {
        vec![root.to_path_buf()]
    } else {
        let file_glob = match include {
            Some(inc) if inc.contains('/') => inc.to_string(),
            Some(inc) => format!("**/{}", inc),
            None => "**/*".to_string(),
        };
        let full = root.join(file_glob);
        glob(&full.to_string_lossy())
            .map_err(|e| FsError::InvalidPattern(e.to_string()))?
            .flatten()
            .filter(|p| p.is_file() && !is_skipped(p, root))
            .collect()
    };

    let mut matches = Vec::new();
    for file in files {
        if std::fs::metadata(&file)
            .map(|m| m.len() > MAX_GREP_FILE_SIZE)
            .unwrap_or(true)
        {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(&file) else {
            debug!("Skipping unreadable file {}", file.display());
            continue;
        };
        for (idx, line) in content.lines().enumerate() {
            if regex.is_match(line) {
                matches.push(SearchMatch {
                    path: file.clone(),
                    line: Some(idx + 1),
                    text: Some(line.to_string()),
                });
                if matches.len() >= max {
                    return Ok(matches);
                }
            }
        }
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn read_write_roundtrip_and_limits() {
        let dir = tempdir().unwrap();
        let fs = LocalFileSystem::new();
        let path = dir.path().join("nested/a.txt");

        let err = fs.write(&path, "hello", false).await.unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));

        fs.write(&path, "hello", true).await.unwrap();
        assert_eq!(fs.read(&path, 1024).await.unwrap(), "hello");

        let err = fs.read(&path, 2).await.unwrap_err();
        assert!(matches!(err, FsError::TooLarge { size: 5, .. }));

        let err = fs.read(&dir.path().join("missing"), 1024).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn read_dir_lists_directories_first() {
        let dir = tempdir().unwrap();
        let fs = LocalFileSystem::new();
        fs.write(&dir.path().join("b.txt"), "", false).await.unwrap();
        fs.mkdir(&dir.path().join("z_dir")).await.unwrap();

        let entries = fs.read_dir(dir.path()).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["z_dir", "b.txt"]);
        assert!(entries[0].is_directory);
    }

    #[tokio::test]
    async fn delete_refuses_directories() {
        let dir = tempdir().unwrap();
        let fs = LocalFileSystem::new();
        let err = fs.delete(dir.path()).await.unwrap_err();
        assert!(matches!(err, FsError::IsADirectory(_)));
    }

    #[tokio::test]
    async fn glob_and_grep() {
        let dir = tempdir().unwrap();
        let fs = LocalFileSystem::new();
        fs.write(&dir.path().join("src/lib.rs"), "fn alpha() {}\nfn beta() {}\n", true)
            .await
            .unwrap();
        fs.write(&dir.path().join("notes.md"), "Alpha notes\n", false)
            .await
            .unwrap();
        fs.write(&dir.path().join(".git/HEAD"), "fn alpha", true)
            .await
            .unwrap();

        let hits = fs
            .search(&SearchQuery {
                root: dir.path().to_path_buf(),
                kind: SearchKind::Glob {
                    pattern: "**/*.rs".into(),
                },
                max_results: 10,
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].path.ends_with("src/lib.rs"));

        let hits = fs
            .search(&SearchQuery {
                root: dir.path().to_path_buf(),
                kind: SearchKind::Grep {
                    pattern: "alpha".into(),
                    include: None,
                    case_insensitive: true,
                },
                max_results: 10,
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| !h.path.starts_with(dir.path().join(".git"))));

        let hits = fs
            .search(&SearchQuery {
                root: dir.path().to_path_buf(),
                kind: SearchKind::Grep {
                    pattern: "fn \\w+".into(),
                    include: Some("*.rs".into()),
                    case_insensitive: false,
                },
                max_results: 1,
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line, Some(1));
    }

    #[tokio::test]
    async fn invalid_pattern() {
        let dir = tempdir().unwrap();
        let err = LocalFileSystem::new()
            .search(&SearchQuery {
                root: dir.path().to_path_buf(),
                kind: SearchKind::Grep {
                    pattern: "(".into(),
                    include: None,
                    case_insensitive: false,
                },
                max_results: 10,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::InvalidPattern(_)));
    }
}
