//! Tool argument types.
//!
//! These are parsed from the model's JSON-encoded arguments and also generate
//! the JSON Schemas advertised to the model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::FileChange;

/// Parameters for the read_file tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReadFileArgs {
    /// Repository-relative path of the file to read, e.g. `components/Header.tsx`
    pub path: String,
}

/// Parameters for the write_file tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WriteFileArgs {
    /// Repository-relative path of the file to write
    pub path: String,
    /// Complete new content of the file
    pub content: String,
}

/// Parameters for the list_files tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ListFilesArgs {
    /// Directory to list, relative to the repository root (empty for the root)
    #[serde(default)]
    pub directory: String,
}

/// Parameters for the search_code tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchCodeArgs {
    /// Text to search for (case-insensitive)
    pub query: String,
    /// Optional filter: `*.tsx` matches by extension, anything else by path substring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_pattern: Option<String>,
}

/// Parameters for the preview_deployment tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PreviewDeploymentArgs {
    /// Files to deploy, each with its complete new content
    pub files: Vec<FileChange>,
    /// Commit message describing the change
    pub message: String,
}
