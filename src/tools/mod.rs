//! Builder tools: typed parsing of model tool calls and their schemas.

mod args;
mod executor;

pub use args::{ListFilesArgs, PreviewDeploymentArgs, ReadFileArgs, SearchCodeArgs, WriteFileArgs};
pub use executor::ToolExecutor;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::files::FileError;
use crate::llm::{FunctionDefinition, ToolDefinition};

pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";
pub const LIST_FILES: &str = "list_files";
pub const SEARCH_CODE: &str = "search_code";
pub const PREVIEW_DEPLOYMENT: &str = "preview_deployment";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: &'static str, message: String },

    #[error(transparent)]
    File(#[from] FileError),
}

/// A tool call with its arguments parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    ReadFile(ReadFileArgs),
    WriteFile(WriteFileArgs),
    ListFiles(ListFilesArgs),
    SearchCode(SearchCodeArgs),
    PreviewDeployment(PreviewDeploymentArgs),
}

fn parse_args<T: DeserializeOwned>(tool: &'static str, arguments: &str) -> Result<T, ToolError> {
    let raw = if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    };
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments {
        tool,
        message: e.to_string(),
    })
}

impl ToolCall {
    /// Parse a `(name, JSON arguments)` pair from the model.
    pub fn parse(name: &str, arguments: &str) -> Result<Self, ToolError> {
        match name {
            READ_FILE => parse_args(READ_FILE, arguments).map(ToolCall::ReadFile),
            WRITE_FILE => parse_args(WRITE_FILE, arguments).map(ToolCall::WriteFile),
            LIST_FILES => parse_args(LIST_FILES, arguments).map(ToolCall::ListFiles),
            SEARCH_CODE => parse_args(SEARCH_CODE, arguments).map(ToolCall::SearchCode),
            PREVIEW_DEPLOYMENT => {
                parse_args(PREVIEW_DEPLOYMENT, arguments).map(ToolCall::PreviewDeployment)
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::ReadFile(_) => READ_FILE,
            ToolCall::WriteFile(_) => WRITE_FILE,
            ToolCall::ListFiles(_) => LIST_FILES,
            ToolCall::SearchCode(_) => SEARCH_CODE,
            ToolCall::PreviewDeployment(_) => PREVIEW_DEPLOYMENT,
        }
    }
}

/// JSON Schema for `T` in the form expected by the completions API.
fn parameters_schema<T: JsonSchema>() -> serde_json::Value {
    let mut value = serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({ "type": "object" }));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    value
}

fn definition<T: JsonSchema>(name: &'static str, description: &'static str) -> ToolDefinition {
    ToolDefinition {
        kind: "function",
        function: FunctionDefinition {
            name,
            description,
            parameters: parameters_schema::<T>(),
        },
    }
}

/// The fixed tool set offered to the model on every turn.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        definition::<ReadFileArgs>(
            READ_FILE,
            "Read the full content of a file in the site repository.",
        ),
        definition::<WriteFileArgs>(
            WRITE_FILE,
            "Replace a file's full content in the local working copy. Only pages, components and styles may be written.",
        ),
        definition::<ListFilesArgs>(
            LIST_FILES,
            "List the files and directories directly inside a directory.",
        ),
        definition::<SearchCodeArgs>(
            SEARCH_CODE,
            "Search the site's source files for a case-insensitive text match.",
        ),
        definition::<PreviewDeploymentArgs>(
            PREVIEW_DEPLOYMENT,
            "Propose a set of complete file contents and a commit message for the owner to review. Nothing is deployed until the owner approves.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tools() {
        let call = ToolCall::parse(READ_FILE, r#"{"path":"app/page.tsx"}"#).unwrap();
        assert_eq!(
            call,
            ToolCall::ReadFile(ReadFileArgs {
                path: "app/page.tsx".to_string()
            })
        );
        assert_eq!(call.name(), READ_FILE);

        let call = ToolCall::parse(SEARCH_CODE, r#"{"query":"Hero","filePattern":"*.tsx"}"#).unwrap();
        match call {
            ToolCall::SearchCode(args) => {
                assert_eq!(args.query, "Hero");
                assert_eq!(args.file_pattern.as_deref(), Some("*.tsx"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let call = ToolCall::parse(
            PREVIEW_DEPLOYMENT,
            r#"{"files":[{"path":"components/Header.tsx","content":"x"}],"message":"Update"}"#,
        )
        .unwrap();
        assert!(matches!(call, ToolCall::PreviewDeployment(ref a) if a.files.len() == 1));
    }

    #[test]
    fn test_list_files_defaults_to_root() {
        let call = ToolCall::parse(LIST_FILES, "").unwrap();
        assert_eq!(
            call,
            ToolCall::ListFiles(ListFilesArgs {
                directory: String::new()
            })
        );
    }

    #[test]
    fn test_unknown_tool() {
        let err = ToolCall::parse("delete_everything", "{}").unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(ref n) if n == "delete_everything"));
        assert_eq!(err.to_string(), "Unknown tool: delete_everything");
    }

    #[test]
    fn test_invalid_arguments() {
        let err = ToolCall::parse(WRITE_FILE, r#"{"path":"app/page.tsx"}"#).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { tool: WRITE_FILE, .. }));

        let err = ToolCall::parse(READ_FILE, "not json").unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn test_tool_definitions() {
        let defs = tool_definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.function.name).collect();
        assert_eq!(
            names,
            vec![READ_FILE, WRITE_FILE, LIST_FILES, SEARCH_CODE, PREVIEW_DEPLOYMENT]
        );

        let search = serde_json::to_value(&defs[3]).unwrap();
        assert_eq!(search["type"], "function");
        let params = &search["function"]["parameters"];
        assert_eq!(params["type"], "object");
        assert!(params["properties"].get("filePattern").is_some());
        assert!(params.get("$schema").is_none());
        let required = params["required"].as_array().unwrap();
        assert!(required.iter().any(|r| r == "query"));
        assert!(!required.iter().any(|r| r == "filePattern"));
    }
}
