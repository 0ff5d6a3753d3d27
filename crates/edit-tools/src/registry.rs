//! Name-keyed tool dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use edit_engine::EditEngine;
use tracing::debug;

use crate::{
    ApplyEditBlock, ApplyRangedEdit, ApplyUnifiedDiff, ApplyWholeFileEdit, CompareFiles,
    CreateDirectory, Delete, EditTool, ListSnapshots, MergeSnapshots, ReadFile, ReverseDiff,
    ToolDefinition, ToolError,
};

/// Dispatch table from stable tool name to implementation.
///
/// Aliases resolve to their target before lookup, so `ConsolidateSnapshots`
/// and `MergeSnapshots` are the same tool.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn EditTool>>,
    aliases: HashMap<String, String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical toolset over one engine.
    pub fn with_default_tools(engine: Arc<EditEngine>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ApplyWholeFileEdit::new(engine.clone())));
        registry.register(Arc::new(ApplyEditBlock::new(engine.clone())));
        registry.register(Arc::new(ApplyRangedEdit::new(engine.clone())));
        registry.register(Arc::new(ApplyUnifiedDiff::new(engine.clone())));
        registry.register(Arc::new(ReverseDiff::new(engine.clone())));
        registry.register(Arc::new(Delete::new(engine.clone())));
        registry.register(Arc::new(CreateDirectory::new(engine.clone())));
        registry.register(Arc::new(CompareFiles::new(engine.clone())));
        registry.register(Arc::new(ReadFile::new(engine.clone())));
        registry.register(Arc::new(ListSnapshots::new(engine.clone())));
        registry.register(Arc::new(MergeSnapshots::new(engine)));
        registry.alias("ConsolidateSnapshots", "MergeSnapshots");
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn EditTool>) {
        self.tools.insert(tool.definition().name, tool);
    }

    pub fn alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(self.resolve(name))
    }

    /// All tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Validate and dispatch one tool call.
    pub async fn invoke(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let resolved = self.resolve(name);
        let tool = self
            .tools
            .get(resolved)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        debug!(tool = resolved, "invoking tool");
        tool.call(args).await
    }

    fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }
}
