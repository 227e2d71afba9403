use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use super::http::send_idempotent;
use super::types::{
    CodeSearchResponse, CommitResponse, ContentsResponse, CreateBlobRequest, CreateCommitRequest,
    CreateTreeRequest, GitHubApiError, PutContentsCommit, PutContentsRequest, PutContentsResponse,
    RefResponse, ShaRef, UpdateRefRequest,
};
use super::{CommitInfo, GitDatabase, RepoContents, TreeEntry};
use crate::config::RepoTarget;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const API_VERSION: &str = "2022-11-28";
const ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("ai-builder/", env!("CARGO_PKG_VERSION"));

/// REST client bound to one repository and branch.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    target: RepoTarget,
    base_url: Url,
}

impl GitHubClient {
    pub fn new(target: RepoTarget) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = Self::parse_base_url(&target.api_url)?;
        Ok(Self {
            client,
            target,
            base_url,
        })
    }

    fn parse_base_url(api_url: &str) -> Result<Url> {
        let with_slash = if api_url.ends_with('/') {
            api_url.to_string()
        } else {
            format!("{}/", api_url)
        };
        Url::parse(&with_slash).with_context(|| format!("Invalid GitHub API URL: {}", api_url))
    }

    fn repo_url(&self, endpoint: &str) -> Result<Url> {
        let path = format!("repos/{}/{}/{}", self.target.owner, self.target.repo, endpoint);
        self.base_url
            .join(&path)
            .with_context(|| format!("Failed to build URL for endpoint: {}", endpoint))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.target.token))
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn parse_response<R: DeserializeOwned>(response: reqwest::Response) -> Result<R> {
        let status = response.status();
        debug!("GitHub response status: {}", status);

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let api_error = GitHubApiError::from_http_response(status.as_u16(), &body);
            if !api_error.is_not_found() {
                error!("{}", api_error);
                error!("   {}", api_error.user_hint());
            }
            anyhow::bail!(api_error);
        }

        let text = response
            .text()
            .await
            .context("Failed to read GitHub response body")?;
        serde_json::from_str(&text).context("Failed to parse GitHub response")
    }

    /// GET with retry on transient failures.
    async fn get<R: DeserializeOwned>(&self, url: Url) -> Result<R> {
        debug!("GET {}", url);
        let response = send_idempotent(|| self.request(Method::GET, url.clone()))
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;
        Self::parse_response(response).await
    }

    /// Non-idempotent write, sent exactly once.
    async fn send_once<T: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: &T,
    ) -> Result<R> {
        debug!("{} {}", method, url);
        let response = self
            .request(method, url.clone())
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;
        Self::parse_response(response).await
    }
}

impl RepoContents for GitHubClient {
    fn describe(&self) -> String {
        format!(
            "{}/{}@{}",
            self.target.owner, self.target.repo, self.target.branch
        )
    }

    async fn get_contents(&self, path: &str) -> Result<ContentsResponse> {
        let mut url = self.repo_url(&format!("contents/{}", path.trim_matches('/')))?;
        url.query_pairs_mut().append_pair("ref", &self.target.branch);
        self.get(url).await
    }

    async fn put_contents(
        &self,
        path: &str,
        content: &str,
        message: &str,
        sha: Option<&str>,
    ) -> Result<PutContentsCommit> {
        let url = self.repo_url(&format!("contents/{}", path.trim_matches('/')))?;
        let body = PutContentsRequest {
            message,
            content: BASE64.encode(content.as_bytes()),
            branch: &self.target.branch,
            sha,
        };
        let response: PutContentsResponse = self.send_once(Method::PUT, url, &body).await?;
        Ok(response.commit)
    }

    async fn search_code_paths(&self, query: &str) -> Result<Vec<String>> {
        let mut url = self
            .base_url
            .join("search/code")
            .context("Failed to build search URL")?;
        url.query_pairs_mut().append_pair(
            "q",
            &format!("{} repo:{}/{}", query, self.target.owner, self.target.repo),
        );
        let response: CodeSearchResponse = self.get(url).await?;
        Ok(response.items.into_iter().map(|item| item.path).collect())
    }
}

impl GitDatabase for GitHubClient {
    async fn branch_head(&self) -> Result<String> {
        let url = self.repo_url(&format!("git/ref/heads/{}", self.target.branch))?;
        let response: RefResponse = self
            .get(url)
            .await
            .with_context(|| format!("Failed to read branch {}", self.target.branch))?;
        Ok(response.object.sha)
    }

    async fn commit_info(&self, sha: &str) -> Result<CommitInfo> {
        let url = self.repo_url(&format!("git/commits/{}", sha))?;
        let response: CommitResponse = self
            .get(url)
            .await
            .with_context(|| format!("Failed to read commit {}", sha))?;
        Ok(CommitInfo {
            sha: response.sha,
            tree_sha: response.tree.sha,
        })
    }

    async fn create_blob(&self, content: &str) -> Result<String> {
        let url = self.repo_url("git/blobs")?;
        let body = CreateBlobRequest {
            content,
            encoding: "utf-8",
        };
        let response: ShaRef = self
            .send_once(Method::POST, url, &body)
            .await
            .context("Failed to create blob")?;
        Ok(response.sha)
    }

    async fn create_tree(&self, base_tree: &str, entries: &[TreeEntry]) -> Result<String> {
        let url = self.repo_url("git/trees")?;
        let body = CreateTreeRequest {
            base_tree,
            tree: entries,
        };
        let response: ShaRef = self
            .send_once(Method::POST, url, &body)
            .await
            .context("Failed to create tree")?;
        Ok(response.sha)
    }

    async fn create_commit(&self, message: &str, tree: &str, parent: &str) -> Result<String> {
        let url = self.repo_url("git/commits")?;
        let body = CreateCommitRequest {
            message,
            tree,
            parents: vec![parent],
        };
        let response: CommitResponse = self
            .send_once(Method::POST, url, &body)
            .await
            .context("Failed to create commit")?;
        Ok(response.sha)
    }

    async fn update_branch(&self, sha: &str, force: bool) -> Result<()> {
        let url = self.repo_url(&format!("git/refs/heads/{}", self.target.branch))?;
        let body = UpdateRefRequest { sha, force };
        let _: RefResponse = self
            .send_once(Method::PATCH, url, &body)
            .await
            .with_context(|| format!("Failed to update branch {}", self.target.branch))?;
        Ok(())
    }

    fn commit_url(&self, sha: &str) -> String {
        format!(
            "https://github.com/{}/{}/commit/{}",
            self.target.owner, self.target.repo, sha
        )
    }
}
