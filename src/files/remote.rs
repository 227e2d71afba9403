//! Hosted repository operations through the GitHub contents and search APIs.
//!
//! Every write here is its own commit on the branch. Multi-file changes go
//! through the deploy pipeline instead.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::{debug, info, warn};

use super::{
    matches_file_pattern, matching_lines, DirEntry, EntryKind, FileError, FileStore, SearchMatch,
    WriteOutcome, MAX_SEARCH_RESULTS,
};
use crate::github::{is_not_found, ContentEntry, ContentsResponse, RepoContents};
use crate::safety;

/// File operations against the configured repository branch.
#[derive(Clone)]
pub struct GitHubFiles<C> {
    client: C,
}

/// Repository-relative path, rejecting traversal segments.
fn repo_path(path: &str) -> Result<String, FileError> {
    let normalized = safety::normalize_path(path);
    if normalized.split('/').any(|segment| segment == "..") {
        return Err(FileError::OutsideProject(path.to_string()));
    }
    Ok(normalized.trim_end_matches('/').to_string())
}

fn map_remote(path: &str, err: anyhow::Error) -> FileError {
    if is_not_found(&err) {
        FileError::NotFound(path.to_string())
    } else {
        FileError::Remote(err)
    }
}

/// Decode a contents-API file body (base64 with embedded newlines).
fn decode_content(entry: &ContentEntry) -> Result<String, FileError> {
    let raw = entry.content.as_deref().unwrap_or_default();
    if entry.encoding.as_deref().unwrap_or("base64") != "base64" {
        return Err(FileError::InvalidArgument(format!(
            "{} has unsupported encoding {:?}",
            entry.path, entry.encoding
        )));
    }
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact)
        .map_err(|e| FileError::Remote(anyhow::anyhow!("invalid base64 for {}: {}", entry.path, e)))?;
    String::from_utf8(bytes)
        .map_err(|_| FileError::InvalidArgument(format!("{} is not a UTF-8 text file", entry.path)))
}

impl<C: RepoContents> GitHubFiles<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// `owner/repo@branch`
    pub fn describe(&self) -> String {
        self.client.describe()
    }

    /// Blob sha of an existing file, `None` when the path is free.
    async fn existing_sha(&self, path: &str) -> Result<Option<String>, FileError> {
        match self.client.get_contents(path).await {
            Ok(ContentsResponse::File(entry)) => Ok(Some(entry.sha)),
            Ok(ContentsResponse::Dir(_)) => Err(FileError::InvalidArgument(format!(
                "{} is a directory",
                path
            ))),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(FileError::Remote(e)),
        }
    }

    pub async fn read_file_from_github(&self, path: &str) -> Result<String, FileError> {
        let path = repo_path(path)?;
        match self.client.get_contents(&path).await {
            Ok(ContentsResponse::File(entry)) => decode_content(&entry),
            Ok(ContentsResponse::Dir(_)) => Err(FileError::InvalidArgument(format!(
                "{} is a directory",
                path
            ))),
            Err(e) => Err(map_remote(&path, e)),
        }
    }

    /// Create or update one file as a single commit.
    pub async fn write_file_to_github(
        &self,
        path: &str,
        content: &str,
    ) -> Result<WriteOutcome, FileError> {
        let path = repo_path(path)?;
        safety::check_write(&path, content)
            .into_result()
            .map_err(FileError::Denied)?;

        let existing_sha = self.existing_sha(&path).await?;
        let message = format!("AI Builder: update {}", path);
        let commit = self
            .client
            .put_contents(&path, content, &message, existing_sha.as_deref())
            .await?;

        info!(
            "Committed {} to {} ({})",
            path,
            self.client.describe(),
            commit.html_url.as_deref().unwrap_or(&commit.sha)
        );

        Ok(WriteOutcome {
            path,
            bytes: content.len(),
            commit_sha: Some(commit.sha),
        })
    }

    pub async fn list_files_in_github(&self, directory: &str) -> Result<Vec<DirEntry>, FileError> {
        let directory = repo_path(directory)?;
        let entries = match self.client.get_contents(&directory).await {
            Ok(ContentsResponse::Dir(entries)) => entries,
            Ok(ContentsResponse::File(_)) => {
                return Err(FileError::DirectoryNotFound(directory));
            }
            Err(e) if is_not_found(&e) => return Err(FileError::DirectoryNotFound(directory)),
            Err(e) => return Err(FileError::Remote(e)),
        };

        let mut listed: Vec<DirEntry> = entries
            .into_iter()
            .map(|e| DirEntry {
                kind: if e.kind == "dir" {
                    EntryKind::Dir
                } else {
                    EntryKind::File
                },
                name: e.name,
                path: e.path,
            })
            .collect();
        listed.sort_by(|a, b| {
            (a.kind != EntryKind::Dir, &a.name).cmp(&(b.kind != EntryKind::Dir, &b.name))
        });
        Ok(listed)
    }

    /// Code search, then re-fetch each hit to extract matching lines.
    pub async fn search_code_in_github(
        &self,
        query: &str,
        file_pattern: Option<&str>,
    ) -> Result<Vec<SearchMatch>, FileError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FileError::InvalidArgument(
                "search query must not be empty".to_string(),
            ));
        }

        let paths = self.client.search_code_paths(query).await?;
        debug!("Code search returned {} files", paths.len());

        let query_lower = query.to_lowercase();
        let mut results = Vec::new();
        for path in paths.iter().filter(|p| matches_file_pattern(p, file_pattern)) {
            if results.len() >= MAX_SEARCH_RESULTS {
                break;
            }
            match self.read_file_from_github(path).await {
                Ok(content) => matching_lines(path, &content, &query_lower, &mut results),
                Err(e) => warn!("Skipping search hit {}: {}", path, e),
            }
        }
        Ok(results)
    }
}

impl<C: RepoContents> FileStore for GitHubFiles<C> {
    async fn read_file(&self, path: &str) -> Result<String, FileError> {
        self.read_file_from_github(path).await
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<WriteOutcome, FileError> {
        self.write_file_to_github(path, content).await
    }

    async fn list_files(&self, directory: &str) -> Result<Vec<DirEntry>, FileError> {
        self.list_files_in_github(directory).await
    }

    async fn search_code(
        &self,
        query: &str,
        file_pattern: Option<&str>,
    ) -> Result<Vec<SearchMatch>, FileError> {
        self.search_code_in_github(query, file_pattern).await
    }
}
