//! Structured tool output contracts.

use edit_engine::{EditOutcome, FileApplyResult, Snapshot};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ToolError;

/// Uniform output of the editing tools: the runtime's edit result plus the
/// snapshot id and, on failure, a stable error kind code.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ToolOutput {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    pub changes_applied: usize,
    pub affected_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub per_file_results: Vec<FileApplyResult>,
    pub is_multi_file: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl ToolOutput {
    pub fn from_outcome(outcome: EditOutcome) -> Self {
        let result = outcome.result;
        Self {
            success: result.success,
            message: result.message,
            diff: result.diff,
            changes_applied: result.changes_applied,
            affected_files: result.affected_files,
            per_file_results: result.per_file_results,
            is_multi_file: result.is_multi_file,
            snapshot_id: outcome.snapshot_id,
            error_kind: None,
        }
    }

    /// Fold a tool error into a displayable structured output.
    pub fn from_error(err: &ToolError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            diff: None,
            changes_applied: 0,
            affected_files: Vec::new(),
            per_file_results: Vec::new(),
            is_multi_file: false,
            snapshot_id: None,
            error_kind: Some(err.kind_code().to_string()),
        }
    }
}

/// One snapshot as listed by `ListSnapshots`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotSummary {
    pub id: String,
    pub sequence_number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_id: Option<String>,
    /// RFC 3339 creation time.
    pub timestamp: String,
    pub tool: String,
    pub description: String,
    pub goal: String,
    pub affected_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    pub external_change_count: usize,
}

impl From<&Snapshot> for SnapshotSummary {
    fn from(snap: &Snapshot) -> Self {
        Self {
            id: snap.id.clone(),
            sequence_number: snap.sequence_number,
            previous_id: snap.previous_id.clone(),
            timestamp: snap.timestamp.to_rfc3339(),
            tool: snap.tool.to_string(),
            description: snap.description.clone(),
            goal: snap.goal.clone(),
            affected_files: snap.affected_files.clone(),
            diff: if snap.diff.is_empty() {
                None
            } else {
                Some(snap.diff.clone())
            },
            external_change_count: snap.external_changes.len(),
        }
    }
}

/// Output of `ListSnapshots`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotListOutput {
    pub snapshots: Vec<SnapshotSummary>,
    pub total: usize,
}

/// Output of `ReadFile`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReadFileOutput {
    pub path: String,
    pub content: String,
}
