//! Whole-file, ranged, and read tools.

use std::sync::Arc;

use async_trait::async_trait;
use edit_engine::{EditEngine, ReadOptions, WriteMode};
use serde::Deserialize;
use tracing::debug;

use crate::output::{ReadFileOutput, ToolOutput};
use crate::{parse_args, to_value, EditTool, ToolDefinition, ToolError};

// ---------------------------------------------------------------------------
// ApplyWholeFileEdit
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WholeFileArgs {
    /// Absolute or workspace-relative path.
    path: String,
    content: String,
    #[serde(default = "default_mode")]
    mode: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    goal: String,
}

fn default_mode() -> String {
    "create_or_overwrite".into()
}

/// Create, overwrite, or append to a whole file.
pub struct ApplyWholeFileEdit {
    engine: Arc<EditEngine>,
}

impl ApplyWholeFileEdit {
    pub fn new(engine: Arc<EditEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EditTool for ApplyWholeFileEdit {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "ApplyWholeFileEdit".into(),
            description: "Write a whole file in the workspace. Modes: \
                          create_or_overwrite (default), overwrite (file must \
                          exist), append. Records a snapshot with the \
                          resulting diff."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Absolute or workspace-relative path to the file"
                    },
                    "content": {
                        "type": "string",
                        "description": "The full content to write"
                    },
                    "mode": {
                        "type": "string",
                        "enum": ["create_or_overwrite", "overwrite", "append"],
                        "description": "How to treat an existing file (default: create_or_overwrite)"
                    },
                    "description": {
                        "type": "string",
                        "description": "Short human-readable summary of the edit"
                    },
                    "goal": {
                        "type": "string",
                        "description": "Why this edit is being made"
                    }
                },
                "required": ["path", "content"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: WholeFileArgs = parse_args("ApplyWholeFileEdit", args)?;
        let mode = match args.mode.as_str() {
            "create_or_overwrite" => WriteMode::CreateOrOverwrite,
            "overwrite" => WriteMode::Overwrite,
            "append" => WriteMode::Append,
            other => {
                return Err(ToolError::InvalidInput {
                    tool: "ApplyWholeFileEdit".into(),
                    message: format!("unknown mode `{other}`"),
                })
            }
        };
        debug!(path = %args.path, mode = %args.mode, "ApplyWholeFileEdit");
        let outcome = self
            .engine
            .write_file(&args.path, &args.content, mode, &args.description, &args.goal)
            .await?;
        to_value("ApplyWholeFileEdit", &ToolOutput::from_outcome(outcome))
    }
}

// ---------------------------------------------------------------------------
// ApplyRangedEdit
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RangedArgs {
    path: String,
    content: String,
    start_line: i64,
    end_line: i64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    goal: String,
}

/// Replace an inclusive 1-indexed line range; `-1, -1` appends.
pub struct ApplyRangedEdit {
    engine: Arc<EditEngine>,
}

impl ApplyRangedEdit {
    pub fn new(engine: Arc<EditEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EditTool for ApplyRangedEdit {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "ApplyRangedEdit".into(),
            description: "Replace an inclusive 1-indexed line range of a file \
                          with new content. start_line = end_line = -1 appends; \
                          end_line = -1 means end-of-file. Missing files are \
                          created."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Absolute or workspace-relative path to the file"
                    },
                    "content": {
                        "type": "string",
                        "description": "Replacement lines"
                    },
                    "start_line": {
                        "type": "integer",
                        "description": "First line to replace (1-indexed), or -1 to append"
                    },
                    "end_line": {
                        "type": "integer",
                        "description": "Last line to replace (inclusive), or -1 for end-of-file"
                    },
                    "description": {
                        "type": "string",
                        "description": "Short human-readable summary of the edit"
                    },
                    "goal": {
                        "type": "string",
                        "description": "Why this edit is being made"
                    }
                },
                "required": ["path", "content", "start_line", "end_line"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: RangedArgs = parse_args("ApplyRangedEdit", args)?;
        debug!(path = %args.path, start = args.start_line, end = args.end_line, "ApplyRangedEdit");
        let outcome = self
            .engine
            .apply_ranged_edit(
                &args.path,
                &args.content,
                args.start_line,
                args.end_line,
                &args.description,
                &args.goal,
            )
            .await?;
        to_value("ApplyRangedEdit", &ToolOutput::from_outcome(outcome))
    }
}

// ---------------------------------------------------------------------------
// ReadFile
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ReadFileArgs {
    path: String,
    start_line: Option<u32>,
    end_line: Option<u32>,
}

/// Read a file, whole or as a line slice. Never snapshotted.
pub struct ReadFile {
    engine: Arc<EditEngine>,
}

impl ReadFile {
    pub fn new(engine: Arc<EditEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EditTool for ReadFile {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "ReadFile".into(),
            description: "Read the contents of a workspace file. Use \
                          start_line/end_line to read a specific 1-indexed \
                          inclusive range of a large file."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Absolute or workspace-relative path to the file"
                    },
                    "start_line": {
                        "type": "integer",
                        "description": "First line to read (1-indexed, inclusive)"
                    },
                    "end_line": {
                        "type": "integer",
                        "description": "Last line to read (1-indexed, inclusive)"
                    }
                },
                "required": ["path"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ReadFileArgs = parse_args("ReadFile", args)?;
        let content = self.engine.read_file(
            &args.path,
            &ReadOptions {
                start_line: args.start_line.map(|n| n as usize),
                end_line: args.end_line.map(|n| n as usize),
            },
        )?;
        to_value(
            "ReadFile",
            &ReadFileOutput {
                path: args.path,
                content,
            },
        )
    }
}
