//! Runtime file-editing primitives.
//!
//! Every operation resolves its paths through the [`Workspace`], performs the
//! mutation, and returns an [`EditResult`] whose diff is computed by the diff
//! engine. Failures are typed; no panics are used for control flow.

mod edit_block;
mod fs_ops;
mod ranged;
mod result;
mod unified;

pub use result::{ApplyOptions, EditResult, FileApplyResult, ReadOptions, WriteMode};

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::EngineConfig;
use crate::diff::{self, DiffOptions, DEV_NULL};
use crate::error::{EngineError, EngineResult};
use crate::process::{ProcessRunner, SystemProcessRunner};
use crate::workspace::Workspace;

/// File I/O primitives and high-level edit operations for one workspace.
#[derive(Clone)]
pub struct Runtime {
    workspace: Workspace,
    config: EngineConfig,
    runner: Arc<dyn ProcessRunner>,
}

impl Runtime {
    pub fn new(workspace: Workspace, config: EngineConfig) -> Self {
        Self::with_runner(workspace, config, Arc::new(SystemProcessRunner))
    }

    /// Swap the external-process seam (tests, hosts with their own sandbox).
    pub fn with_runner(
        workspace: Workspace,
        config: EngineConfig,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            workspace,
            config,
            runner,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read a file, whole or as a 1-indexed inclusive line slice.
    pub fn read_file(&self, path: &str, opts: &ReadOptions) -> EngineResult<String> {
        let (abs, _rel) = self.workspace.resolve_pair(path)?;
        let content = read_text(&abs)?;
        if opts.start_line.is_none() && opts.end_line.is_none() {
            return Ok(content);
        }
        let lines: Vec<&str> = content.lines().collect();
        let total = lines.len();
        let start = opts.start_line.unwrap_or(1).saturating_sub(1).min(total);
        let end = opts.end_line.unwrap_or(total).min(total);
        if start >= end {
            return Ok(String::new());
        }
        let mut slice = lines[start..end].join("\n");
        slice.push('\n');
        Ok(slice)
    }

    /// Write a file according to `mode`. See [`WriteMode`].
    pub fn write_file(
        &self,
        path: &str,
        content: &str,
        mode: WriteMode,
    ) -> EngineResult<EditResult> {
        match mode {
            WriteMode::Overwrite => self.whole_file_write(path, content, true),
            WriteMode::CreateOrOverwrite => self.whole_file_write(path, content, false),
            WriteMode::Append => self.append(path, content),
            WriteMode::OverwriteRange { start, end } => {
                self.apply_ranged_edit(path, content, start, end)
            }
        }
    }

    fn whole_file_write(
        &self,
        path: &str,
        content: &str,
        must_exist: bool,
    ) -> EngineResult<EditResult> {
        let (abs, rel) = self.workspace.resolve_pair(path)?;
        debug!(path = %rel, bytes = content.len(), "whole-file write");

        let pre = read_text_if_exists(&abs)?;
        if must_exist && pre.is_none() {
            return Err(EngineError::FileNotFound { path: abs });
        }

        atomic_write(&abs, content)?;

        let old_label = match pre {
            Some(_) => rel.clone(),
            None => DEV_NULL.to_string(),
        };
        let diff = diff::generate_unified_diff(
            pre.as_deref().unwrap_or(""),
            content,
            &DiffOptions::new(old_label, rel.clone())
                .with_context(self.config.context_lines),
        );
        Ok(
            EditResult::ok(format!("Wrote {} bytes to {rel}", content.len()))
                .with_diff(diff)
                .with_files(vec![rel]),
        )
    }

    fn append(&self, path: &str, content: &str) -> EngineResult<EditResult> {
        let (abs, rel) = self.workspace.resolve_pair(path)?;
        debug!(path = %rel, bytes = content.len(), "append");

        let pre = read_text_if_exists(&abs)?;
        let created = pre.is_none();
        let mut combined = pre.clone().unwrap_or_default();
        combined.push_str(content);
        atomic_write(&abs, &combined)?;

        let mut result = EditResult::ok(format!(
            "Appended {} bytes to {rel}",
            content.len()
        ))
        .with_files(vec![rel.clone()]);
        if created {
            // A fresh file is a creation; report it as such.
            let diff = diff::generate_unified_diff(
                "",
                &combined,
                &DiffOptions::new(DEV_NULL, rel).with_context(self.config.context_lines),
            );
            result = result.with_diff(diff);
        } else {
            result.changes_applied = content.lines().count();
        }
        Ok(result)
    }

    /// Generate a unified diff between two strings (diff-engine passthrough).
    pub fn generate_diff(&self, old: &str, new: &str, opts: &DiffOptions) -> String {
        diff::generate_unified_diff(old, new, opts)
    }
}

// ── shared file helpers ─────────────────────────────────────────────

/// Read a UTF-8 file, mapping the common io failures onto typed errors and
/// rejecting symlinks and binary (non-UTF-8) content.
pub(crate) fn read_text(abs: &Path) -> EngineResult<String> {
    ensure_not_symlink(abs)?;
    let bytes = std::fs::read(abs).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EngineError::FileNotFound {
                path: abs.to_path_buf(),
            }
        } else {
            EngineError::Io(e)
        }
    })?;
    String::from_utf8(bytes).map_err(|_| {
        EngineError::Unsupported(format!(
            "{} is not valid UTF-8 (binary files are not supported)",
            abs.display()
        ))
    })
}

pub(crate) fn read_text_if_exists(abs: &Path) -> EngineResult<Option<String>> {
    match read_text(abs) {
        Ok(s) => Ok(Some(s)),
        Err(EngineError::FileNotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

fn ensure_not_symlink(abs: &Path) -> EngineResult<()> {
    match std::fs::symlink_metadata(abs) {
        Ok(meta) if meta.file_type().is_symlink() => Err(EngineError::Unsupported(format!(
            "{} is a symbolic link",
            abs.display()
        ))),
        _ => Ok(()),
    }
}

/// Write through a temp file in the same directory, then rename into place.
pub(crate) fn atomic_write(abs: &Path, content: &str) -> EngineResult<()> {
    ensure_not_symlink(abs)?;
    let parent = abs.parent().ok_or_else(|| EngineError::InvalidPath {
        path: abs.display().to_string(),
        reason: "path has no parent directory".into(),
    })?;
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(abs).map_err(|e| EngineError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn runtime() -> (tempfile::TempDir, Runtime) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        let rt = Runtime::new(ws, EngineConfig::default());
        (dir, rt)
    }

    #[test]
    fn create_or_overwrite_creates_with_creation_diff() {
        let (_dir, rt) = runtime();
        let result = rt
            .write_file("text.txt", "agi is coming\n", WriteMode::CreateOrOverwrite)
            .unwrap();
        assert!(result.success);
        assert_eq!(result.affected_files, vec!["text.txt"]);
        let diff = result.diff.unwrap();
        assert!(diff.contains("--- /dev/null"));
        assert!(diff.contains("@@ -1,0 +1,1 @@"));
        assert_eq!(result.changes_applied, 1);
    }

    #[test]
    fn overwrite_requires_existing_file() {
        let (_dir, rt) = runtime();
        let err = rt
            .write_file("absent.txt", "x\n", WriteMode::Overwrite)
            .unwrap_err();
        assert!(matches!(err, EngineError::FileNotFound { .. }));
    }

    #[test]
    fn overwrite_diffs_old_against_new() {
        let (_dir, rt) = runtime();
        rt.write_file("f.txt", "agi is coming\n", WriteMode::CreateOrOverwrite)
            .unwrap();
        let result = rt
            .write_file("f.txt", "agi is here\n", WriteMode::Overwrite)
            .unwrap();
        let diff = result.diff.unwrap();
        assert!(diff.contains("-agi is coming"));
        assert!(diff.contains("+agi is here"));
        assert_eq!(result.changes_applied, 2);
    }

    #[test]
    fn write_creates_parent_directories() {
        let (dir, rt) = runtime();
        rt.write_file("a/b/c.txt", "deep\n", WriteMode::CreateOrOverwrite)
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a/b/c.txt")).unwrap(),
            "deep\n"
        );
    }

    #[test]
    fn append_to_existing_has_no_diff() {
        let (dir, rt) = runtime();
        rt.write_file("log.txt", "one\n", WriteMode::CreateOrOverwrite)
            .unwrap();
        let result = rt
            .write_file("log.txt", "two\n", WriteMode::Append)
            .unwrap();
        assert!(result.success);
        assert!(result.diff.is_none());
        assert_eq!(result.changes_applied, 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("log.txt")).unwrap(),
            "one\ntwo\n"
        );
    }

    #[test]
    fn append_to_missing_file_reports_creation_diff() {
        let (_dir, rt) = runtime();
        let result = rt
            .write_file("new.txt", "first\n", WriteMode::Append)
            .unwrap();
        assert!(result.diff.unwrap().contains("--- /dev/null"));
    }

    #[test]
    fn read_file_line_slice_is_inclusive() {
        let (_dir, rt) = runtime();
        rt.write_file("f.txt", "1\n2\n3\n4\n", WriteMode::CreateOrOverwrite)
            .unwrap();
        let slice = rt
            .read_file(
                "f.txt",
                &ReadOptions {
                    start_line: Some(2),
                    end_line: Some(3),
                },
            )
            .unwrap();
        assert_eq!(slice, "2\n3\n");
    }

    #[test]
    fn read_missing_file_is_typed() {
        let (_dir, rt) = runtime();
        let err = rt.read_file("nope.txt", &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::FileNotFound { .. }));
    }

    #[test]
    fn path_escape_is_rejected_before_io() {
        let (_dir, rt) = runtime();
        let err = rt
            .write_file("../escape.txt", "x", WriteMode::CreateOrOverwrite)
            .unwrap_err();
        assert!(matches!(err, EngineError::PathOutsideWorkspace { .. }));
    }

    #[test]
    fn binary_content_is_unsupported() {
        let (dir, rt) = runtime();
        std::fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, 0x00, 0x01]).unwrap();
        let err = rt.read_file("blob.bin", &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::Unsupported(_)));
    }
}
