//! Engine configuration.
//!
//! Defaults are sensible for embedded use; every knob can be overridden via
//! `EDIT_ENGINE_*` environment variables or a TOML fragment supplied by the
//! host application.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Context radius for generated unified diffs.
    /// Populated from `EDIT_ENGINE_CONTEXT_LINES` (default: 3).
    pub context_lines: usize,
    /// External patch utility program name.
    /// Populated from `EDIT_ENGINE_PATCH_TOOL` (default: "patch").
    pub patch_tool: String,
    /// Timeout for external patch tool invocations, in seconds.
    /// Populated from `EDIT_ENGINE_PATCH_TIMEOUT_SECS` (default: 30).
    pub patch_timeout_secs: u64,
    /// Prefer the external patch utility over the internal apply routine.
    /// The internal routine remains the fallback when the tool is missing.
    /// Populated from `EDIT_ENGINE_PREFER_EXTERNAL_PATCH` (default: false).
    pub prefer_external_patch: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            context_lines: env_parse("EDIT_ENGINE_CONTEXT_LINES", 3),
            patch_tool: std::env::var("EDIT_ENGINE_PATCH_TOOL")
                .unwrap_or_else(|_| "patch".into()),
            patch_timeout_secs: env_parse("EDIT_ENGINE_PATCH_TIMEOUT_SECS", 30),
            prefer_external_patch: std::env::var("EDIT_ENGINE_PREFER_EXTERNAL_PATCH")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML fragment into a config, filling omitted fields from
    /// the environment-aware defaults.
    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        toml::from_str(s).map_err(|e| EngineError::Unsupported(format!("invalid engine config: {e}")))
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
