//! Common utilities for MCP tools.

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

use crate::files::FileError;

/// Error result for tool failures
pub fn tool_error(message: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message.into())])
}

/// Success result carrying a pretty-printed JSON payload
pub fn json_result<T: Serialize>(value: &T) -> CallToolResult {
    match serde_json::to_string_pretty(value) {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => tool_error(format!("Error: failed to encode result: {}", e)),
    }
}

pub fn file_error(err: FileError) -> CallToolResult {
    tool_error(format!("Error: {}", err))
}
