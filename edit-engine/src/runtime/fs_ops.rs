//! Deletion, directory management, and file comparison.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{read_text, read_text_if_exists, EditResult, Runtime};
use crate::diff::{self, DiffOptions, DEV_NULL};
use crate::error::{EngineError, EngineResult};

impl Runtime {
    /// Delete a single file, returning its pre→absent deletion diff.
    pub fn delete_file(&self, path: &str) -> EngineResult<EditResult> {
        let (abs, rel) = self.workspace.resolve_pair(path)?;
        debug!(path = %rel, "delete file");

        let pre = read_text_if_exists(&abs)?
            .ok_or(EngineError::FileNotFound { path: abs.clone() })?;
        std::fs::remove_file(&abs)?;

        let diff = diff::generate_unified_diff(
            &pre,
            "",
            &DiffOptions::new(rel.clone(), DEV_NULL).with_context(self.config.context_lines),
        );
        Ok(EditResult::ok(format!("Deleted {rel}"))
            .with_diff(diff)
            .with_files(vec![rel]))
    }

    /// Delete a directory.
    ///
    /// A non-empty directory requires `recursive`. On success the result
    /// carries one concatenated deletion diff covering every regular file
    /// that was beneath the directory; removing an empty directory produces
    /// no diff.
    pub fn delete_directory(&self, path: &str, recursive: bool) -> EngineResult<EditResult> {
        let (abs, rel) = self.workspace.resolve_pair(path)?;
        debug!(path = %rel, recursive, "delete directory");

        if !abs.is_dir() {
            return Err(EngineError::FileNotFound { path: abs });
        }
        let is_empty = std::fs::read_dir(&abs)?.next().is_none();
        if !is_empty && !recursive {
            return Err(EngineError::InvalidPath {
                path: rel,
                reason: "directory is not empty (pass recursive=true)".into(),
            });
        }

        let mut files = Vec::new();
        collect_files(&abs, &mut files)?;
        files.sort();

        let mut combined = String::new();
        let mut affected = Vec::new();
        for file in &files {
            let file_rel = self.workspace.relative(file)?;
            let pre = read_text(file)?;
            combined.push_str(&diff::generate_unified_diff(
                &pre,
                "",
                &DiffOptions::new(file_rel.clone(), DEV_NULL)
                    .with_context(self.config.context_lines),
            ));
            affected.push(file_rel);
        }

        std::fs::remove_dir_all(&abs)?;

        let mut result = EditResult::ok(format!(
            "Deleted directory {rel} ({} file(s))",
            affected.len()
        ));
        if !combined.is_empty() {
            result = result.with_diff(combined);
        }
        result.is_multi_file = affected.len() > 1;
        Ok(result.with_files(affected))
    }

    /// Create a directory; idempotent when it already exists.
    pub fn create_directory(&self, path: &str, recursive: bool) -> EngineResult<EditResult> {
        let (abs, rel) = self.workspace.resolve_pair(path)?;
        debug!(path = %rel, recursive, "create directory");

        if abs.is_dir() {
            return Ok(EditResult::ok(format!("Directory {rel} already exists")));
        }
        if recursive {
            std::fs::create_dir_all(&abs)?;
        } else {
            std::fs::create_dir(&abs)?;
        }
        Ok(EditResult::ok(format!("Created directory {rel}")).with_files(vec![rel]))
    }

    /// Workspace-relative paths of every regular file beneath `path`, sorted.
    pub fn list_directory_files(&self, path: &str) -> EngineResult<Vec<String>> {
        let (abs, _rel) = self.workspace.resolve_pair(path)?;
        if !abs.is_dir() {
            return Err(EngineError::FileNotFound { path: abs });
        }
        let mut files = Vec::new();
        collect_files(&abs, &mut files)?;
        files.sort();
        files
            .iter()
            .map(|f| self.workspace.relative(f))
            .collect()
    }

    /// Diff two files against each other (left as old side, right as new).
    pub fn compare_files(&self, path_a: &str, path_b: &str) -> EngineResult<String> {
        let (abs_a, rel_a) = self.workspace.resolve_pair(path_a)?;
        let (abs_b, rel_b) = self.workspace.resolve_pair(path_b)?;
        let a = read_text(&abs_a)?;
        let b = read_text(&abs_b)?;
        Ok(diff::generate_unified_diff(
            &a,
            &b,
            &DiffOptions::new(rel_a, rel_b).with_context(self.config.context_lines),
        ))
    }
}

/// Recursively collect regular files beneath `dir`. Symlinks are skipped.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> EngineResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        if ty.is_symlink() {
            continue;
        }
        if ty.is_dir() {
            collect_files(&entry.path(), out)?;
        } else {
            out.push(entry.path());
        }
    }
    Ok(())
}
