//! Search/replace block tool.

use std::sync::Arc;

use async_trait::async_trait;
use edit_engine::EditEngine;
use serde::Deserialize;
use tracing::debug;

use crate::output::ToolOutput;
use crate::{parse_args, to_value, EditTool, ToolDefinition, ToolError};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EditBlockArgs {
    path: String,
    /// Exact text to find. The first occurrence is replaced. An empty search
    /// block is only valid when the file does not exist yet (creation).
    search: String,
    replace: String,
    #[serde(default)]
    ignore_whitespace: bool,
    #[serde(default)]
    description: String,
    #[serde(default)]
    goal: String,
}

/// Replace the first occurrence of a search block with new content.
pub struct ApplyEditBlock {
    engine: Arc<EditEngine>,
}

impl ApplyEditBlock {
    pub fn new(engine: Arc<EditEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EditTool for ApplyEditBlock {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "ApplyEditBlock".into(),
            description: "Edit a file by replacing the first occurrence of a \
                          search block with new content. An empty search block \
                          creates a missing file with the replacement content \
                          and is an error on an existing file. With \
                          ignore_whitespace the block is located by \
                          whitespace-collapsed comparison (the match must be \
                          unique); the replacement is inserted verbatim."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Absolute or workspace-relative path to the file"
                    },
                    "search": {
                        "type": "string",
                        "description": "Exact text block to find; include enough context to hit the right spot"
                    },
                    "replace": {
                        "type": "string",
                        "description": "Replacement text, inserted verbatim"
                    },
                    "ignore_whitespace": {
                        "type": "boolean",
                        "description": "Locate the block ignoring whitespace differences (default: false)"
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
                "required": ["path", "search", "replace"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: EditBlockArgs = parse_args("ApplyEditBlock", args)?;
        debug!(path = %args.path, ignore_whitespace = args.ignore_whitespace, "ApplyEditBlock");
        let outcome = self
            .engine
            .apply_edit_block(
                &args.path,
                &args.search,
                &args.replace,
                args.ignore_whitespace,
                &args.description,
                &args.goal,
            )
            .await?;
        to_value("ApplyEditBlock", &ToolOutput::from_outcome(outcome))
    }
}
