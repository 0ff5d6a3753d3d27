//! Snapshot record types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which high-level operation produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotTool {
    WholeFileEdit,
    EditBlock,
    RangedEdit,
    UnifiedDiff,
    Delete,
    DirectoryDelete,
    Consolidation,
}

impl std::fmt::Display for SnapshotTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::WholeFileEdit => "whole_file_edit",
            Self::EditBlock => "edit_block",
            Self::RangedEdit => "ranged_edit",
            Self::UnifiedDiff => "unified_diff",
            Self::Delete => "delete",
            Self::DirectoryDelete => "directory_delete",
            Self::Consolidation => "consolidation",
        };
        f.write_str(name)
    }
}

/// Captured content of one file before and after an operation.
///
/// `pre_content = None` means the file did not exist; `post_content = None`
/// means it was deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileState {
    pub pre_content: Option<String>,
    pub post_content: Option<String>,
}

/// How a tracked file diverged from the log before an operation ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalChangeKind {
    /// On-disk content differs from the last recorded post-state.
    Modified,
    /// The file exists on disk but the log has never seen it.
    Created,
    /// The log knows the file but it is missing on disk.
    Deleted,
}

/// Record of one out-of-band divergence observed during snapshot creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalChange {
    pub path: String,
    pub kind: ExternalChangeKind,
    /// Content the log last recorded for this file.
    pub known_content: Option<String>,
    /// Content actually found on disk.
    pub observed_content: Option<String>,
}

/// An immutable record of one edit operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Opaque unique identifier.
    pub id: String,
    /// Monotonic position in the log; the first snapshot is 1.
    pub sequence_number: u64,
    /// Id of the snapshot with `sequence_number - 1`, absent for the first.
    pub previous_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub tool: SnapshotTool,
    pub description: String,
    pub goal: String,
    /// Workspace-relative paths touched, in operation order.
    pub affected_files: Vec<String>,
    pub file_states: BTreeMap<String, FileState>,
    /// Unified diff covering pre→post for all affected files.
    pub diff: String,
    /// Divergences observed before this operation executed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_changes: Vec<ExternalChange>,
}
