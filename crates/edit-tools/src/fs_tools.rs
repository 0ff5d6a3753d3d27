//! Deletion and directory tools.

use std::sync::Arc;

use async_trait::async_trait;
use edit_engine::EditEngine;
use serde::Deserialize;
use tracing::debug;

use crate::output::ToolOutput;
use crate::{parse_args, to_value, EditTool, ToolDefinition, ToolError};

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DeleteArgs {
    path: String,
    /// Required to delete a non-empty directory.
    #[serde(default)]
    recursive: bool,
    #[serde(default)]
    description: String,
    #[serde(default)]
    goal: String,
}

/// Delete a file or directory.
pub struct Delete {
    engine: Arc<EditEngine>,
}

impl Delete {
    pub fn new(engine: Arc<EditEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EditTool for Delete {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "Delete".into(),
            description: "Delete a file or directory in the workspace. \
                          Deleting a non-empty directory requires \
                          recursive=true; the snapshot records a deletion diff \
                          for every file that was removed."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Absolute or workspace-relative path to delete"
                    },
                    "recursive": {
                        "type": "boolean",
                        "description": "Allow deleting a non-empty directory (default: false)"
                    },
                    "description": {
                        "type": "string",
                        "description": "Short human-readable summary of the deletion"
                    },
                    "goal": {
                        "type": "string",
                        "description": "Why this deletion is being made"
                    }
                },
                "required": ["path"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: DeleteArgs = parse_args("Delete", args)?;
        let abs = self.engine.workspace().resolve(&args.path)?;
        debug!(path = %args.path, recursive = args.recursive, "Delete");
        let outcome = if abs.is_dir() {
            self.engine
                .delete_directory(&args.path, args.recursive, &args.description, &args.goal)
                .await?
        } else {
            self.engine
                .delete_file(&args.path, &args.description, &args.goal)
                .await?
        };
        to_value("Delete", &ToolOutput::from_outcome(outcome))
    }
}

// ---------------------------------------------------------------------------
// CreateDirectory
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateDirectoryArgs {
    path: String,
    #[serde(default = "default_recursive")]
    recursive: bool,
}

fn default_recursive() -> bool {
    true
}

/// Create a directory (no snapshot; nothing to diff).
pub struct CreateDirectory {
    engine: Arc<EditEngine>,
}

impl CreateDirectory {
    pub fn new(engine: Arc<EditEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EditTool for CreateDirectory {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "CreateDirectory".into(),
            description: "Create a directory in the workspace. With \
                          recursive=true (default) missing parents are created \
                          too. Idempotent when the directory already exists."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Absolute or workspace-relative directory path"
                    },
                    "recursive": {
                        "type": "boolean",
                        "description": "Create missing parent directories (default: true)"
                    }
                },
                "required": ["path"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: CreateDirectoryArgs = parse_args("CreateDirectory", args)?;
        let outcome = self.engine.create_directory(&args.path, args.recursive)?;
        to_value("CreateDirectory", &ToolOutput::from_outcome(outcome))
    }
}
