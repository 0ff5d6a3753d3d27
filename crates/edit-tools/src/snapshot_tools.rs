//! Snapshot inspection and consolidation tools.

use std::sync::Arc;

use async_trait::async_trait;
use edit_engine::{EditEngine, ListOptions};
use serde::Deserialize;
use tracing::debug;

use crate::output::{SnapshotListOutput, SnapshotSummary};
use crate::{parse_args, to_value, EditTool, ToolDefinition, ToolError};

// ---------------------------------------------------------------------------
// ListSnapshots
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ListArgs {
    /// Return at most the last `limit` snapshots.
    limit: Option<usize>,
    #[serde(default)]
    include_diffs: bool,
}

/// List the workspace's snapshots in insertion order.
pub struct ListSnapshots {
    engine: Arc<EditEngine>,
}

impl ListSnapshots {
    pub fn new(engine: Arc<EditEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EditTool for ListSnapshots {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "ListSnapshots".into(),
            description: "List recorded snapshots in insertion order: id, \
                          sequence number, linkage, tool, affected files. \
                          Diffs can be large and are only included with \
                          include_diffs=true."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "description": "Return at most the last N snapshots"
                    },
                    "include_diffs": {
                        "type": "boolean",
                        "description": "Include each snapshot's unified diff (default: false)"
                    }
                },
                "required": [],
                "additionalProperties": false
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ListArgs = parse_args("ListSnapshots", args)?;
        let total = self.engine.snapshots().len().await;
        let snapshots = self
            .engine
            .list_snapshots(&ListOptions {
                limit: args.limit,
                include_diffs: args.include_diffs,
            })
            .await;
        let output = SnapshotListOutput {
            snapshots: snapshots.iter().map(SnapshotSummary::from).collect(),
            total,
        };
        to_value("ListSnapshots", &output)
    }
}

// ---------------------------------------------------------------------------
// MergeSnapshots (alias: ConsolidateSnapshots)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MergeArgs {
    /// First sequence number of the range (1-indexed, inclusive).
    start_sequence: u64,
    /// Last sequence number of the range (inclusive).
    end_sequence: u64,
    title: String,
    #[serde(default)]
    goal: String,
}

/// Consolidate a contiguous snapshot range into one equivalent snapshot.
pub struct MergeSnapshots {
    engine: Arc<EditEngine>,
}

impl MergeSnapshots {
    pub fn new(engine: Arc<EditEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EditTool for MergeSnapshots {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "MergeSnapshots".into(),
            description: "Replace the inclusive snapshot sequence range \
                          [start_sequence, end_sequence] with a single \
                          snapshot preserving the net effect. Later snapshots \
                          are renumbered; the filesystem is not touched."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "start_sequence": {
                        "type": "integer",
                        "description": "First sequence number of the range (1-indexed)"
                    },
                    "end_sequence": {
                        "type": "integer",
                        "description": "Last sequence number of the range (inclusive)"
                    },
                    "title": {
                        "type": "string",
                        "description": "Description for the consolidated snapshot"
                    },
                    "goal": {
                        "type": "string",
                        "description": "Why the range is being consolidated"
                    }
                },
                "required": ["start_sequence", "end_sequence", "title"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: MergeArgs = parse_args("MergeSnapshots", args)?;
        debug!(start = args.start_sequence, end = args.end_sequence, "MergeSnapshots");
        let merged = self
            .engine
            .consolidate_snapshots(args.start_sequence, args.end_sequence, &args.title, &args.goal)
            .await?;
        to_value("MergeSnapshots", &SnapshotSummary::from(&merged))
    }
}
