//! MCP tool parameter types.
//!
//! File tools reuse the builder's argument types; these cover the rest.

use schemars::JsonSchema;
use serde::Deserialize;

/// Parameters for the check_path tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckPathArgs {
    /// Repository-relative path to classify
    pub path: String,
    /// Optional proposed file content to scan for forbidden constructs
    #[serde(default)]
    pub content: Option<String>,
}
