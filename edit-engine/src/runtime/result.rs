//! Structured results and option types for runtime operations.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Per-file status of a multi-file diff application.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FileApplyResult {
    pub path: String,
    pub success: bool,
    pub message: String,
}

/// Result of one runtime edit operation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EditResult {
    pub success: bool,
    pub message: String,
    /// Unified diff of the change. Always present on success for
    /// content-changing operations; omitted for plain appends and
    /// empty-directory removal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    /// Changed-line count; for multi-file diffs, the sum across files.
    pub changes_applied: usize,
    /// Workspace-relative paths touched, in operation order.
    pub affected_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub per_file_results: Vec<FileApplyResult>,
    pub is_multi_file: bool,
}

impl EditResult {
    pub(crate) fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            diff: None,
            changes_applied: 0,
            affected_files: Vec::new(),
            per_file_results: Vec::new(),
            is_multi_file: false,
        }
    }

    pub(crate) fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::ok(message)
        }
    }

    pub(crate) fn with_diff(mut self, diff: String) -> Self {
        if !diff.is_empty() {
            self.changes_applied = crate::diff::count_diff_changes(&diff);
            self.diff = Some(diff);
        }
        self
    }

    pub(crate) fn with_files(mut self, files: Vec<String>) -> Self {
        self.affected_files = files;
        self
    }
}

/// How [`Runtime::write_file`](super::Runtime::write_file) treats the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace an existing file; fails with `FileNotFound` if absent.
    Overwrite,
    /// Create the file (and parents) or replace it.
    CreateOrOverwrite,
    /// Concatenate to the end of the file, creating it if absent.
    Append,
    /// Replace the inclusive 1-indexed line range; `end = -1` means EOF.
    OverwriteRange { start: i64, end: i64 },
}

/// Options for [`Runtime::read_file`](super::Runtime::read_file).
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// First line to return (1-indexed, inclusive).
    pub start_line: Option<usize>,
    /// Last line to return (1-indexed, inclusive).
    pub end_line: Option<usize>,
}

/// Options for [`Runtime::apply_unified_diff`](super::Runtime::apply_unified_diff).
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Workspace-relative directory the diff's paths are resolved against.
    pub base_dir: Option<String>,
    /// Report what would happen without touching the filesystem.
    pub dry_run: bool,
    /// Save the incoming diff text to this workspace-relative path first.
    pub save_diff_path: Option<String>,
}
