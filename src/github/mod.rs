//! GitHub integration: REST client, git-database seam and deploy pipeline.

mod client;
mod deploy;
mod http;
mod types;

#[cfg(test)]
pub(crate) mod memory;

pub use client::GitHubClient;
pub use deploy::{is_commit_sha, DeployError, DeployResult, DeployedCommit, Deployer};
pub use types::{
    is_not_found, ContentEntry, ContentsResponse, GitHubApiError, PutContentsCommit, TreeEntry,
};

use anyhow::Result;
use std::future::Future;

/// Head commit of a branch together with its root tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub tree_sha: String,
}

/// Low-level git object operations against one repository branch.
///
/// The deploy pipeline is generic over this so it can run against an
/// in-memory repository in tests.
pub trait GitDatabase: Send + Sync {
    /// Current head commit sha of the configured branch.
    fn branch_head(&self) -> impl Future<Output = Result<String>> + Send;

    fn commit_info(&self, sha: &str) -> impl Future<Output = Result<CommitInfo>> + Send;

    /// Store `content` as a UTF-8 blob, returning the blob sha.
    fn create_blob(&self, content: &str) -> impl Future<Output = Result<String>> + Send;

    /// Create a tree layering `entries` over `base_tree`.
    fn create_tree(
        &self,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> impl Future<Output = Result<String>> + Send;

    fn create_commit(
        &self,
        message: &str,
        tree: &str,
        parent: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Point the branch at `sha`. A non-forced update must fail if the
    /// branch no longer descends to `sha` by fast-forward.
    fn update_branch(&self, sha: &str, force: bool) -> impl Future<Output = Result<()>> + Send;

    /// Browser URL for a commit.
    fn commit_url(&self, sha: &str) -> String;
}

/// Contents and code-search operations against one repository branch.
///
/// The remote file backend is generic over this so it can run against an
/// in-memory repository in tests.
pub trait RepoContents: Send + Sync {
    /// `owner/repo@branch`
    fn describe(&self) -> String;

    /// A file (base64 body) or the immediate entries of a directory.
    fn get_contents(&self, path: &str) -> impl Future<Output = Result<ContentsResponse>> + Send;

    /// Create or replace one file as a single commit on the branch. `sha` is
    /// the current blob sha and must be given when the file exists.
    fn put_contents(
        &self,
        path: &str,
        content: &str,
        message: &str,
        sha: Option<&str>,
    ) -> impl Future<Output = Result<PutContentsCommit>> + Send;

    /// Paths of files matching `query`.
    fn search_code_paths(&self, query: &str) -> impl Future<Output = Result<Vec<String>>> + Send;
}

impl<T: RepoContents> RepoContents for std::sync::Arc<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn get_contents(&self, path: &str) -> impl Future<Output = Result<ContentsResponse>> + Send {
        (**self).get_contents(path)
    }

    fn put_contents(
        &self,
        path: &str,
        content: &str,
        message: &str,
        sha: Option<&str>,
    ) -> impl Future<Output = Result<PutContentsCommit>> + Send {
        (**self).put_contents(path, content, message, sha)
    }

    fn search_code_paths(&self, query: &str) -> impl Future<Output = Result<Vec<String>>> + Send {
        (**self).search_code_paths(query)
    }
}

impl<T: GitDatabase> GitDatabase for std::sync::Arc<T> {
    fn branch_head(&self) -> impl Future<Output = Result<String>> + Send {
        (**self).branch_head()
    }

    fn commit_info(&self, sha: &str) -> impl Future<Output = Result<CommitInfo>> + Send {
        (**self).commit_info(sha)
    }

    fn create_blob(&self, content: &str) -> impl Future<Output = Result<String>> + Send {
        (**self).create_blob(content)
    }

    fn create_tree(
        &self,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> impl Future<Output = Result<String>> + Send {
        (**self).create_tree(base_tree, entries)
    }

    fn create_commit(
        &self,
        message: &str,
        tree: &str,
        parent: &str,
    ) -> impl Future<Output = Result<String>> + Send {
        (**self).create_commit(message, tree, parent)
    }

    fn update_branch(&self, sha: &str, force: bool) -> impl Future<Output = Result<()>> + Send {
        (**self).update_branch(sha, force)
    }

    fn commit_url(&self, sha: &str) -> String {
        (**self).commit_url(sha)
    }
}
