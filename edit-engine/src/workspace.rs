//! Workspace root and path resolution.
//!
//! All file paths handled by the runtime and snapshot manager are resolved
//! against a single workspace root. Inputs may be absolute or
//! workspace-relative; traversal outside the root is rejected before any
//! file I/O happens.

use std::path::{Component, Path, PathBuf};

use crate::error::{EngineError, EngineResult};

/// The root directory within which all paths are resolved.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open a workspace rooted at `root`. The directory must exist.
    pub fn new(root: impl AsRef<Path>) -> EngineResult<Self> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|e| EngineError::InvalidPath {
            path: root.display().to_string(),
            reason: format!("cannot canonicalize workspace root: {e}"),
        })?;
        if !root.is_dir() {
            return Err(EngineError::InvalidPath {
                path: root.display().to_string(),
                reason: "workspace root is not a directory".into(),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an absolute or workspace-relative path to an absolute path
    /// inside the workspace.
    ///
    /// The path is normalized lexically (`.` and `..` components folded)
    /// before the containment check, so the target does not need to exist
    /// yet. Escaping the root fails with `PathOutsideWorkspace`.
    pub fn resolve(&self, path: &str) -> EngineResult<PathBuf> {
        if path.is_empty() {
            return Err(EngineError::InvalidPath {
                path: path.into(),
                reason: "empty path".into(),
            });
        }
        let candidate = Path::new(path);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };

        let normalized = normalize(&joined, path)?;
        if !normalized.starts_with(&self.root) {
            // An absolute input may spell the root differently (e.g. via a
            // symlinked prefix); give canonicalization one chance before
            // rejecting.
            if let Ok(canon) = normalized.canonicalize() {
                if canon.starts_with(&self.root) {
                    return Ok(canon);
                }
            }
            return Err(EngineError::PathOutsideWorkspace { path: path.into() });
        }
        Ok(normalized)
    }

    /// Render an absolute path inside the workspace as a `/`-separated
    /// workspace-relative string.
    pub fn relative(&self, abs: &Path) -> EngineResult<String> {
        let rel = abs
            .strip_prefix(&self.root)
            .map_err(|_| EngineError::PathOutsideWorkspace {
                path: abs.display().to_string(),
            })?;
        Ok(rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"))
    }

    /// Resolve and immediately relativize, returning both forms.
    pub fn resolve_pair(&self, path: &str) -> EngineResult<(PathBuf, String)> {
        let abs = self.resolve(path)?;
        let rel = self.relative(&abs)?;
        Ok((abs, rel))
    }
}

/// Fold `.` and `..` components without touching the filesystem.
fn normalize(path: &Path, original: &str) -> EngineResult<PathBuf> {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return Err(EngineError::PathOutsideWorkspace {
                        path: original.into(),
                    });
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}
