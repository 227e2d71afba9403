//! Read-only file tools over any [`FileStore`]: the local working copy or the GitHub branch.

use rmcp::model::{CallToolResult, Content};
use rmcp::ErrorData as McpError;
use serde_json::json;
use tracing::debug;

use super::common::{file_error, json_result};
use crate::files::{FileStore, MAX_SEARCH_RESULTS};
use crate::tools::{ListFilesArgs, ReadFileArgs, SearchCodeArgs};

pub async fn read_file<S: FileStore>(
    files: &S,
    args: ReadFileArgs,
) -> Result<CallToolResult, McpError> {
    debug!("MCP read_file {}", args.path);
    match files.read_file(&args.path).await {
        Ok(content) => Ok(CallToolResult::success(vec![Content::text(content)])),
        Err(e) => Ok(file_error(e)),
    }
}

pub async fn list_files<S: FileStore>(
    files: &S,
    args: ListFilesArgs,
) -> Result<CallToolResult, McpError> {
    debug!("MCP list_files {:?}", args.directory);
    match files.list_files(&args.directory).await {
        Ok(entries) => Ok(json_result(&entries)),
        Err(e) => Ok(file_error(e)),
    }
}

pub async fn search_code<S: FileStore>(
    files: &S,
    args: SearchCodeArgs,
) -> Result<CallToolResult, McpError> {
    debug!("MCP search_code {:?}", args.query);
    match files
        .search_code(&args.query, args.file_pattern.as_deref())
        .await
    {
        Ok(matches) => Ok(json_result(&json!({
            "truncated": matches.len() >= MAX_SEARCH_RESULTS,
            "matches": matches,
        }))),
        Err(e) => Ok(file_error(e)),
    }
}
