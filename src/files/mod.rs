//! File operations exposed to the builder tools.
//!
//! Two backends implement [`FileStore`]:
//! - [`LocalFiles`]: the working copy on disk, confined to a project root.
//! - [`GitHubFiles`]: the hosted repository via the contents/search API,
//!   where every write is its own commit.

mod local;
mod remote;

pub use local::LocalFiles;
pub use remote::GitHubFiles;

use serde::Serialize;
use std::future::Future;
use thiserror::Error;

use crate::github::GitHubClient;

/// Maximum number of matches returned by a code search.
pub const MAX_SEARCH_RESULTS: usize = 50;

/// Errors raised by file operations.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("Path escapes the project root: {0}")]
    OutsideProject(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("{0}")]
    Denied(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Remote repository error: {0}")]
    Remote(#[from] anyhow::Error),
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// One immediate entry of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// A single line matching a search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub file: String,
    pub line: usize,
    pub content: String,
}

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub path: String,
    pub bytes: usize,
    /// Commit created by the write, for backends that commit per write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
}

/// Read/write/list/search operations over a site source tree.
pub trait FileStore: Send + Sync {
    fn read_file(&self, path: &str) -> impl Future<Output = Result<String, FileError>> + Send;

    fn write_file(
        &self,
        path: &str,
        content: &str,
    ) -> impl Future<Output = Result<WriteOutcome, FileError>> + Send;

    fn list_files(
        &self,
        directory: &str,
    ) -> impl Future<Output = Result<Vec<DirEntry>, FileError>> + Send;

    fn search_code(
        &self,
        query: &str,
        file_pattern: Option<&str>,
    ) -> impl Future<Output = Result<Vec<SearchMatch>, FileError>> + Send;
}

/// Either backend, chosen at startup.
#[derive(Clone)]
pub enum SiteFiles {
    Local(LocalFiles),
    GitHub(GitHubFiles<GitHubClient>),
}

impl SiteFiles {
    /// Human-readable location of the tree being served.
    pub fn describe(&self) -> String {
        match self {
            SiteFiles::Local(files) => files.root().display().to_string(),
            SiteFiles::GitHub(files) => files.describe(),
        }
    }
}

impl FileStore for SiteFiles {
    async fn read_file(&self, path: &str) -> Result<String, FileError> {
        match self {
            SiteFiles::Local(files) => files.read_file(path).await,
            SiteFiles::GitHub(files) => files.read_file(path).await,
        }
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<WriteOutcome, FileError> {
        match self {
            SiteFiles::Local(files) => files.write_file(path, content).await,
            SiteFiles::GitHub(files) => files.write_file(path, content).await,
        }
    }

    async fn list_files(&self, directory: &str) -> Result<Vec<DirEntry>, FileError> {
        match self {
            SiteFiles::Local(files) => files.list_files(directory).await,
            SiteFiles::GitHub(files) => files.list_files(directory).await,
        }
    }

    async fn search_code(
        &self,
        query: &str,
        file_pattern: Option<&str>,
    ) -> Result<Vec<SearchMatch>, FileError> {
        match self {
            SiteFiles::Local(files) => files.search_code(query, file_pattern).await,
            SiteFiles::GitHub(files) => files.search_code(query, file_pattern).await,
        }
    }
}

/// Match a repository-relative path against an optional search filter.
///
/// `*.ext` style patterns match by suffix; anything else is a
/// case-insensitive substring of the path.
pub fn matches_file_pattern(path: &str, pattern: Option<&str>) -> bool {
    let Some(pattern) = pattern.map(str::trim).filter(|p| !p.is_empty()) else {
        return true;
    };
    let path_lower = path.to_lowercase();
    let pattern_lower = pattern.to_lowercase();
    match pattern_lower.strip_prefix('*') {
        Some(suffix) => path_lower.ends_with(suffix),
        None => path_lower.contains(&pattern_lower),
    }
}

/// Collect lines of `content` containing `query` (case-insensitive).
pub fn matching_lines(file: &str, content: &str, query_lower: &str, out: &mut Vec<SearchMatch>) {
    for (idx, line) in content.lines().enumerate() {
        if out.len() >= MAX_SEARCH_RESULTS {
            return;
        }
        if line.to_lowercase().contains(query_lower) {
            out.push(SearchMatch {
                file: file.to_string(),
                line: idx + 1,
                content: line.trim().to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_file_pattern() {
        assert!(matches_file_pattern("components/Header.tsx", None));
        assert!(matches_file_pattern("components/Header.tsx", Some("")));
        assert!(matches_file_pattern("components/Header.tsx", Some("*.tsx")));
        assert!(!matches_file_pattern("app/globals.css", Some("*.tsx")));
        assert!(matches_file_pattern("components/Header.tsx", Some("header")));
        assert!(!matches_file_pattern("components/Footer.tsx", Some("header")));
    }

    #[test]
    fn test_matching_lines_case_insensitive() {
        let mut out = Vec::new();
        matching_lines(
            "app/page.tsx",
            "const a = 1;\n  <Hero title=\"Studio\" />\nstudio rates",
            "studio",
            &mut out,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].line, 2);
        assert_eq!(out[0].content, "<Hero title=\"Studio\" />");
        assert_eq!(out[1].line, 3);
    }

    #[test]
    fn test_matching_lines_respects_cap() {
        let content = "hit\n".repeat(MAX_SEARCH_RESULTS + 10);
        let mut out = Vec::new();
        matching_lines("a.tsx", &content, "hit", &mut out);
        assert_eq!(out.len(), MAX_SEARCH_RESULTS);
    }

    #[tokio::test]
    async fn test_site_files_delegates_to_local() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("components")).unwrap();
        std::fs::write(dir.path().join("components/Hero.tsx"), "export const Hero = 1").unwrap();
        let files = SiteFiles::Local(LocalFiles::new(dir.path()).unwrap());

        assert_eq!(
            files.read_file("components/Hero.tsx").await.unwrap(),
            "export const Hero = 1"
        );
        let entries = files.list_files("components").await.unwrap();
        assert_eq!(entries[0].name, "Hero.tsx");
        assert!(matches!(
            files.write_file(".env", "SECRET=1").await,
            Err(FileError::Denied(_))
        ));
    }
}
