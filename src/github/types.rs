//! GitHub REST API request and response types.
//!
//! Only the fields the builder reads are modelled.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Git data API (refs, commits, trees, blobs)
// ============================================================================

#[derive(Debug, Deserialize)]
pub(super) struct RefResponse {
    pub object: RefObject,
}

#[derive(Debug, Deserialize)]
pub(super) struct RefObject {
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub(super) struct UpdateRefRequest<'a> {
    pub sha: &'a str,
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct CommitResponse {
    pub sha: String,
    pub tree: ShaRef,
}

#[derive(Debug, Deserialize)]
pub(super) struct ShaRef {
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub(super) struct CreateBlobRequest<'a> {
    pub content: &'a str,
    pub encoding: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct CreateTreeRequest<'a> {
    pub base_tree: &'a str,
    pub tree: &'a [TreeEntry],
}

#[derive(Debug, Serialize)]
pub(super) struct CreateCommitRequest<'a> {
    pub message: &'a str,
    pub tree: &'a str,
    pub parents: Vec<&'a str>,
}

/// Regular (non-executable) file mode.
pub const FILE_MODE: &str = "100644";

/// One blob placed into a new tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sha: String,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: FILE_MODE,
            kind: "blob",
            sha: sha.into(),
        }
    }
}

// ============================================================================
// Contents API
// ============================================================================

/// An entry returned by `GET /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// A directory listing or a single file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentsResponse {
    Dir(Vec<ContentEntry>),
    File(ContentEntry),
}

#[derive(Debug, Serialize)]
pub(super) struct PutContentsRequest<'a> {
    pub message: &'a str,
    pub content: String,
    pub branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct PutContentsResponse {
    pub commit: PutContentsCommit,
}

#[derive(Debug, Deserialize)]
pub struct PutContentsCommit {
    pub sha: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

// ============================================================================
// Search API
// ============================================================================

#[derive(Debug, Deserialize)]
pub(super) struct CodeSearchResponse {
    #[serde(default)]
    pub items: Vec<CodeSearchItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CodeSearchItem {
    pub path: String,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Structured error for a non-success GitHub response.
#[derive(Debug, Clone, Error)]
#[error("GitHub API error (HTTP {status}): {message}")]
pub struct GitHubApiError {
    pub status: u16,
    pub message: String,
}

impl GitHubApiError {
    /// Build from status and raw body, preferring GitHub's `message` field.
    pub fn from_http_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.message)
            .unwrap_or_else(|_| {
                if body.trim().is_empty() {
                    "no response body".to_string()
                } else {
                    body.trim().to_string()
                }
            });
        Self { status, message }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// The branch moved underneath a non-forced ref update.
    pub fn is_conflict(&self) -> bool {
        self.status == 409
            || (self.status == 422 && self.message.to_lowercase().contains("fast forward"))
    }

    pub fn user_hint(&self) -> &'static str {
        match self.status {
            401 => "Check that GITHUB_TOKEN is set and has not expired.",
            403 => "The token lacks permission for this repository, or the rate limit was hit.",
            404 => "Check GITHUB_OWNER, GITHUB_REPO and GITHUB_BRANCH.",
            _ if self.is_conflict() => "The branch changed since the deploy started; retry the deploy.",
            _ => "See the GitHub API message above.",
        }
    }
}

/// Whether an error chain carries a GitHub 404.
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<GitHubApiError>()
        .map(GitHubApiError::is_not_found)
        .unwrap_or(false)
}
