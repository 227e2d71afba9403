use serde_json::{json, Value};
use std::time::Instant;
use tracing::{info, warn};

use super::{ToolCall, ToolError};
use crate::files::{FileError, FileStore, MAX_SEARCH_RESULTS};
use crate::preview::PreviewStore;
use crate::safety;

/// Runs parsed tool calls against a file store.
///
/// `preview_deployment` never touches the store; it only registers a preview.
#[derive(Clone)]
pub struct ToolExecutor<S> {
    files: S,
    previews: PreviewStore,
}

impl<S: FileStore> ToolExecutor<S> {
    pub fn new(files: S, previews: PreviewStore) -> Self {
        Self { files, previews }
    }

    /// Execute one call, logging its duration and outcome.
    pub async fn execute(&self, call_id: &str, call: ToolCall) -> Result<Value, ToolError> {
        let name = call.name();
        let start = Instant::now();
        let result = self.dispatch(call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => info!("Tool {} ({}) succeeded in {}ms", name, call_id, duration_ms),
            Err(e) => warn!("Tool {} ({}) failed in {}ms: {}", name, call_id, duration_ms, e),
        }
        result
    }

    async fn dispatch(&self, call: ToolCall) -> Result<Value, ToolError> {
        match call {
            ToolCall::ReadFile(args) => {
                let content = self.files.read_file(&args.path).await?;
                Ok(json!({ "path": args.path, "content": content }))
            }
            ToolCall::WriteFile(args) => {
                let outcome = self.files.write_file(&args.path, &args.content).await?;
                Ok(json!({
                    "success": true,
                    "path": outcome.path,
                    "bytes": outcome.bytes,
                    "commitSha": outcome.commit_sha,
                }))
            }
            ToolCall::ListFiles(args) => {
                let entries = self.files.list_files(&args.directory).await?;
                Ok(json!({ "directory": args.directory, "entries": entries }))
            }
            ToolCall::SearchCode(args) => {
                let matches = self
                    .files
                    .search_code(&args.query, args.file_pattern.as_deref())
                    .await?;
                Ok(json!({
                    "query": args.query,
                    "truncated": matches.len() >= MAX_SEARCH_RESULTS,
                    "matches": matches,
                }))
            }
            ToolCall::PreviewDeployment(args) => {
                if args.files.is_empty() {
                    return Err(ToolError::InvalidArguments {
                        tool: super::PREVIEW_DEPLOYMENT,
                        message: "at least one file is required".to_string(),
                    });
                }
                if args.message.trim().is_empty() {
                    return Err(ToolError::InvalidArguments {
                        tool: super::PREVIEW_DEPLOYMENT,
                        message: "a commit message is required".to_string(),
                    });
                }
                for file in &args.files {
                    safety::check_write(&file.path, &file.content)
                        .into_result()
                        .map_err(FileError::Denied)?;
                }

                let preview = self.previews.create(args.files, args.message).await;
                Ok(json!({
                    "requiresApproval": true,
                    "previewId": preview.id,
                    "files": preview.files,
                    "message": preview.message,
                    "summary": preview.summary,
                }))
            }
        }
    }
}
