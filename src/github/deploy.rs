//! Single-commit deployment and rollback.
//!
//! A deploy reads the branch head, creates one blob per file, layers them on
//! the head tree, commits once and fast-forwards the branch. Every step
//! before the ref update only creates unreferenced objects, so any failure
//! leaves the branch untouched.

use futures_util::future::try_join_all;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, warn};

use super::{GitDatabase, GitHubApiError, TreeEntry};
use crate::domain::{summarize_changes, FileChange};
use crate::effects::{EffectReport, EffectRunner};
use crate::safety;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Invalid deployment: {0}")]
    Invalid(String),

    #[error("{0}")]
    Denied(String),

    #[error("The branch changed during the deploy; nothing was committed. Retry the deploy.")]
    Conflict,

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

/// A commit that is now the branch head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedCommit {
    pub sha: String,
    pub parent: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Post-commit effect outcomes, empty when nothing was committed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<EffectReport>,
}

impl DeployResult {
    fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            commit_sha: None,
            commit_url: None,
            error: Some(error.to_string()),
            effects: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Deployment pipeline over a git object database.
#[derive(Clone)]
pub struct Deployer<G> {
    git: G,
}

impl<G: GitDatabase> Deployer<G> {
    pub fn new(git: G) -> Self {
        Self { git }
    }

    /// Validate the bundle before any object is created.
    fn validate(files: &[FileChange], message: &str) -> Result<(), DeployError> {
        if files.is_empty() {
            return Err(DeployError::Invalid("no files to deploy".to_string()));
        }
        if message.trim().is_empty() {
            return Err(DeployError::Invalid("commit message is required".to_string()));
        }

        let mut seen = HashSet::new();
        for file in files {
            let path = safety::normalize_path(&file.path);
            if !seen.insert(path.clone()) {
                return Err(DeployError::Invalid(format!("duplicate path: {}", path)));
            }
            safety::check_write(&path, &file.content)
                .into_result()
                .map_err(DeployError::Denied)?;
        }
        Ok(())
    }

    /// Land `files` as exactly one new commit on the branch.
    pub async fn deploy(
        &self,
        files: &[FileChange],
        message: &str,
    ) -> Result<DeployedCommit, DeployError> {
        Self::validate(files, message)?;
        info!("Deploying {}", summarize_changes(files));

        let head = self.git.branch_head().await?;
        let base = self.git.commit_info(&head).await?;

        let blob_shas = try_join_all(files.iter().map(|f| self.git.create_blob(&f.content))).await?;
        let entries: Vec<TreeEntry> = files
            .iter()
            .zip(blob_shas)
            .map(|(file, sha)| TreeEntry::blob(safety::normalize_path(&file.path), sha))
            .collect();

        let tree = self.git.create_tree(&base.tree_sha, &entries).await?;
        let commit = self.git.create_commit(message.trim(), &tree, &head).await?;

        if let Err(e) = self.git.update_branch(&commit, false).await {
            let conflict = e
                .downcast_ref::<GitHubApiError>()
                .map(GitHubApiError::is_conflict)
                .unwrap_or(false);
            if conflict {
                warn!("Branch moved during deploy; commit {} left unreferenced", commit);
                return Err(DeployError::Conflict);
            }
            return Err(e.into());
        }

        let url = self.git.commit_url(&commit);
        info!("Deployed commit {} ({})", commit, url);
        Ok(DeployedCommit {
            sha: commit,
            parent: head,
            url,
        })
    }

    /// [`Self::deploy`] followed by the post-commit effects, flattened into a
    /// serializable result. Effect failures never fail the deploy.
    pub async fn deploy_to_github(
        &self,
        files: &[FileChange],
        message: &str,
        effects: &EffectRunner,
    ) -> DeployResult {
        match self.deploy(files, message).await {
            Ok(commit) => {
                let effects = effects.run(&commit, files, message.trim()).await;
                DeployResult {
                    success: true,
                    commit_sha: Some(commit.sha),
                    commit_url: Some(commit.url),
                    error: None,
                    effects,
                }
            }
            Err(e) => {
                warn!("Deployment failed: {:#}", e);
                DeployResult::failed(format!("{:#}", e))
            }
        }
    }

    /// Force the branch back to `sha`. No new commit is created.
    pub async fn rollback_to_commit(&self, sha: &str) -> RollbackResult {
        let sha = sha.trim();
        if !is_commit_sha(sha) {
            return RollbackResult {
                success: false,
                commit_sha: None,
                commit_url: None,
                error: Some(format!("Invalid commit SHA: {}", sha)),
            };
        }

        match self.git.update_branch(sha, true).await {
            Ok(()) => {
                info!("Rolled branch back to {}", sha);
                RollbackResult {
                    success: true,
                    commit_sha: Some(sha.to_string()),
                    commit_url: Some(self.git.commit_url(sha)),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Rollback to {} failed: {:#}", sha, e);
                RollbackResult {
                    success: false,
                    commit_sha: None,
                    commit_url: None,
                    error: Some(format!("{:#}", e)),
                }
            }
        }
    }
}

/// Abbreviated or full hex commit id.
pub fn is_commit_sha(sha: &str) -> bool {
    (7..=40).contains(&sha.len()) && sha.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod deploy_unit_tests {
    use super::*;

    #[test]
    fn test_is_commit_sha() {
        assert!(is_commit_sha("abc1234"));
        assert!(is_commit_sha(&"a".repeat(40)));
        assert!(!is_commit_sha("abc12"));
        assert!(!is_commit_sha(&"a".repeat(41)));
        assert!(!is_commit_sha("main"));
        assert!(!is_commit_sha("HEAD~1x"));
    }

    #[test]
    fn test_deploy_result_serialization() {
        let failed = DeployResult::failed("boom");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert!(json.get("commitSha").is_none());
    }
}
