//! Path guard: every filesystem-touching tool resolves its path here first.
//!
//! A path is accepted when, after resolving `.`/`..` and any symlinks in
//! the part that already exists, it stays under the workspace root and does
//! not touch a sensitive location (credentials, VCS internals).

use std::path::{Component, Path, PathBuf};

use glob::Pattern;
use thiserror::Error;
use toolgate_domain::ToolError;

/// Path components that are never read or written
const SENSITIVE_PATTERNS: &[&str] = &[
    ".git",
    ".ssh",
    ".gnupg",
    ".aws",
    ".env",
    ".env.*",
    "id_rsa*",
    "id_ed25519*",
    "id_ecdsa*",
    "*.pem",
    "*.key",
    ".netrc",
    ".npmrc",
    ".pypirc",
];

/// Absolute system files that stay off limits even without a workspace root
const SENSITIVE_ABSOLUTE: &[&str] = &["/etc/shadow", "/etc/gshadow", "/etc/sudoers"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathViolation {
    #[error("path must not be empty")]
    Empty,

    #[error("path '{}' escapes the workspace root '{}'", .path.display(), .root.display())]
    OutsideWorkspace { path: PathBuf, root: PathBuf },

    #[error("access to sensitive path '{}' is blocked (matches '{rule}')", .path.display())]
    Sensitive { path: PathBuf, rule: String },

    #[error("cannot resolve '{}': {message}", .path.display())]
    Unresolvable { path: PathBuf, message: String },
}

impl From<PathViolation> for ToolError {
    fn from(violation: PathViolation) -> Self {
        match violation {
            PathViolation::Empty => ToolError::validation(violation.to_string()),
            other => ToolError::security_violation(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PathGuard {
    patterns: Vec<(String, Pattern)>,
}

impl Default for PathGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl PathGuard {
    pub fn new() -> Self {
        let patterns = SENSITIVE_PATTERNS
            .iter()
            .filter_map(|p| Pattern::new(p).ok().map(|pat| (p.to_string(), pat)))
            .collect();
        Self { patterns }
    }

    /// Resolve `raw` against `root` and check it.
    ///
    /// Relative paths are joined onto `root` (or the process working
    /// directory when there is no root). Without a root only the sensitive
    /// path rules apply.
    pub fn resolve(&self, root: Option<&Path>, raw: &str) -> Result<PathBuf, PathViolation> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PathViolation::Empty);
        }

        let requested = Path::new(raw);
        let cwd = || {
            std::env::current_dir().map_err(|e| PathViolation::Unresolvable {
                path: requested.to_path_buf(),
                message: e.to_string(),
            })
        };
        let root = match root {
            Some(r) if r.is_absolute() => Some(r.to_path_buf()),
            Some(r) => Some(cwd()?.join(r)),
            None => None,
        };
        let base = match &root {
            Some(r) => r.clone(),
            None => cwd()?,
        };
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            base.join(requested)
        };
        let path = normalize_lexically(&joined);

        let mut checked = path.clone();
        if let Some(root) = root {
            let root = normalize_lexically(&root);
            if !path.starts_with(&root) {
                return Err(PathViolation::OutsideWorkspace { path, root });
            }
            // The root's own ancestors are the user's choice
            if let Ok(rel) = path.strip_prefix(&root) {
                checked = rel.to_path_buf();
            }
            // Symlinks inside the workspace may still point outside it
            let real_root = canonical_or_self(&root);
            let real_path = canonicalize_existing_prefix(&path);
            if !real_path.starts_with(&real_root) {
                return Err(PathViolation::OutsideWorkspace {
                    path,
                    root: real_root,
                });
            }
        }

        self.check_sensitive(&checked, &path)?;
        Ok(path)
    }

    fn check_sensitive(&self, checked: &Path, path: &Path) -> Result<(), PathViolation> {
        if let Some(abs) = SENSITIVE_ABSOLUTE.iter().find(|a| path == Path::new(a)) {
            return Err(PathViolation::Sensitive {
                path: path.to_path_buf(),
                rule: abs.to_string(),
            });
        }
        for component in checked.components() {
            let Component::Normal(name) = component else {
                continue;
            };
            let name = name.to_string_lossy();
            if let Some((rule, _)) = self.patterns.iter().find(|(_, p)| p.matches(&name)) {
                return Err(PathViolation::Sensitive {
                    path: path.to_path_buf(),
                    rule: rule.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Resolve `.` and `..` without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn canonical_or_self(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Canonicalize the deepest existing ancestor and re-append the rest
fn canonicalize_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut rest = Vec::new();
    loop {
        if let Ok(real) = std::fs::canonicalize(&existing) {
            let mut out = real;
            for part in rest.iter().rev() {
                out.push(part);
            }
            return out;
        }
        match (existing.file_name().map(|n| n.to_os_string()), existing.parent()) {
            (Some(name), Some(parent)) => {
                rest.push(name);
                existing = parent.to_path_buf();
            }
            _ => return path.to_path_buf(),
        }
    }
}
