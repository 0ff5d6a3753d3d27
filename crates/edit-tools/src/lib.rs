//! Typed tool contracts over the editing engine.
//!
//! Each tool declares a name, a description, and a JSON input schema; inputs
//! are deserialized into `deny_unknown_fields` structs so invalid or unknown
//! fields fail before any side effect. Dispatch goes through
//! [`ToolRegistry`], a table keyed by the stable tool name.

mod diff_tools;
mod edit_block_tool;
mod file_tools;
mod fs_tools;
mod output;
mod registry;
mod snapshot_tools;

pub use diff_tools::{ApplyUnifiedDiff, CompareFiles, ReverseDiff};
pub use edit_block_tool::ApplyEditBlock;
pub use file_tools::{ApplyRangedEdit, ApplyWholeFileEdit, ReadFile};
pub use fs_tools::{CreateDirectory, Delete};
pub use output::{ReadFileOutput, SnapshotListOutput, SnapshotSummary, ToolOutput};
pub use registry::ToolRegistry;
pub use snapshot_tools::{ListSnapshots, MergeSnapshots};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Errors surfaced by the tool layer.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),

    #[error("invalid input for `{tool}`: {message}")]
    InvalidInput { tool: String, message: String },

    #[error(transparent)]
    Engine(#[from] edit_engine::EngineError),
}

impl ToolError {
    /// Stable error kind code for structured outputs.
    pub fn kind_code(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::InvalidInput { .. } => "invalid_input",
            Self::Engine(e) => e.kind().as_str(),
        }
    }
}

/// Name, description, and JSON schema of one tool's input.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One callable tool: a definition plus an async entry point taking and
/// returning JSON values.
#[async_trait]
pub trait EditTool: Send + Sync {
    fn definition(&self) -> ToolDefinition;
    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError>;
}

/// Deserialize tool input; schema validation is authoritative and happens
/// before any side effect.
pub(crate) fn parse_args<T: DeserializeOwned>(
    tool: &str,
    args: serde_json::Value,
) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidInput {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

pub(crate) fn to_value<T: serde::Serialize>(
    tool: &str,
    value: &T,
) -> Result<serde_json::Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::InvalidInput {
        tool: tool.to_string(),
        message: format!("output serialization failed: {e}"),
    })
}
