//! Local working-copy operations confined to a project root.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{
    matches_file_pattern, matching_lines, DirEntry, EntryKind, FileError, FileStore, SearchMatch,
    WriteOutcome, MAX_SEARCH_RESULTS,
};
use crate::safety;

/// Source directories scanned by `search_code`.
pub const SEARCH_DIRS: &[&str] = &["app", "components", "lib", "styles"];

/// File extensions scanned by `search_code`.
pub const SEARCH_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "css"];

/// Directories never listed or searched.
pub const IGNORED_DIRS: &[&str] = &["node_modules", ".git", ".next"];

/// File operations rooted at a project directory.
#[derive(Debug, Clone)]
pub struct LocalFiles {
    root: PathBuf,
}

impl LocalFiles {
    /// Create a store rooted at `root`, which must exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, FileError> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|e| FileError::Io {
            path: root.display().to_string(),
            source: e,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` against the root.
    ///
    /// `..` components are folded lexically; anything landing outside the
    /// root is rejected. The deepest existing ancestor is then canonicalized
    /// so a symlink under the root cannot lead outside it.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, FileError> {
        let requested = Path::new(path.trim());
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.root.join(requested)
        };

        let mut resolved = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::ParentDir => {
                    if !resolved.pop() {
                        return Err(FileError::OutsideProject(path.to_string()));
                    }
                }
                Component::CurDir => {}
                other => resolved.push(other.as_os_str()),
            }
        }

        if !resolved.starts_with(&self.root) {
            return Err(FileError::OutsideProject(path.to_string()));
        }
        self.confine(&resolved, path)?;
        Ok(resolved)
    }

    /// Reject paths whose existing part escapes the root through a symlink.
    fn confine(&self, resolved: &Path, path: &str) -> Result<(), FileError> {
        for ancestor in resolved.ancestors() {
            match ancestor.canonicalize() {
                Ok(real) if real.starts_with(&self.root) => return Ok(()),
                Ok(_) => return Err(FileError::OutsideProject(path.to_string())),
                // Dangling link: writing through it would land wherever it points
                Err(_) if ancestor.symlink_metadata().is_ok() => {
                    return Err(FileError::OutsideProject(path.to_string()));
                }
                Err(_) => continue,
            }
        }
        Err(FileError::OutsideProject(path.to_string()))
    }

    /// Repository-relative, forward-slash form of an absolute path under the root.
    fn relative(&self, absolute: &Path) -> String {
        absolute
            .strip_prefix(&self.root)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default()
    }

    pub async fn read_file_safe(&self, path: &str) -> Result<String, FileError> {
        let absolute = self.resolve(path)?;
        match tokio::fs::read_to_string(&absolute).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(FileError::NotFound(path.to_string())),
            Err(e) => Err(FileError::Io {
                path: path.to_string(),
                source: e,
            }),
        }
    }

    /// Write after both safety checks pass, creating parent directories.
    pub async fn write_file_safe(&self, path: &str, content: &str) -> Result<WriteOutcome, FileError> {
        let absolute = self.resolve(path)?;
        let relative = self.relative(&absolute);

        safety::check_write(&relative, content)
            .into_result()
            .map_err(FileError::Denied)?;

        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FileError::Io {
                    path: relative.clone(),
                    source: e,
                })?;
        }

        tokio::fs::write(&absolute, content)
            .await
            .map_err(|e| FileError::Io {
                path: relative.clone(),
                source: e,
            })?;

        debug!("Wrote {} bytes to {}", content.len(), relative);

        Ok(WriteOutcome {
            path: relative,
            bytes: content.len(),
            commit_sha: None,
        })
    }

    /// List the immediate entries of `directory`, directories first.
    pub async fn list_files_safe(&self, directory: &str) -> Result<Vec<DirEntry>, FileError> {
        let absolute = self.resolve(directory)?;
        if !absolute.is_dir() {
            return Err(FileError::DirectoryNotFound(directory.to_string()));
        }
        let mut reader = match tokio::fs::read_dir(&absolute).await {
            Ok(r) => r,
            Err(e) => {
                return Err(FileError::Io {
                    path: directory.to_string(),
                    source: e,
                })
            }
        };

        let mut entries = Vec::new();
        loop {
            let entry = match reader.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(FileError::Io {
                        path: directory.to_string(),
                        source: e,
                    })
                }
            };

            let name = entry.file_name().to_string_lossy().to_string();
            if IGNORED_DIRS.contains(&name.as_str()) {
                continue;
            }

            let kind = match entry.file_type().await {
                Ok(ft) if ft.is_dir() => EntryKind::Dir,
                Ok(_) => EntryKind::File,
                Err(e) => {
                    warn!("Failed to stat {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            entries.push(DirEntry {
                path: self.relative(&entry.path()),
                name,
                kind,
            });
        }

        entries.sort_by(|a, b| {
            (a.kind != EntryKind::Dir, &a.name).cmp(&(b.kind != EntryKind::Dir, &b.name))
        });
        Ok(entries)
    }

    /// Case-insensitive line search over the site's source directories.
    pub async fn search_code(
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

        let root = self.root.clone();
        let query_lower = query.to_lowercase();
        let file_pattern = file_pattern.map(str::to_string);

        tokio::task::spawn_blocking(move || {
            scan_sources(&root, &query_lower, file_pattern.as_deref())
        })
        .await
        .map_err(|e| FileError::Io {
            path: query.to_string(),
            source: std::io::Error::new(ErrorKind::Other, e),
        })
    }
}

fn is_ignored(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| IGNORED_DIRS.contains(&name))
            .unwrap_or(false)
}

fn has_search_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SEARCH_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn scan_sources(root: &Path, query_lower: &str, file_pattern: Option<&str>) -> Vec<SearchMatch> {
    let mut results = Vec::new();

    for dir in SEARCH_DIRS {
        let base = root.join(dir);
        if !base.is_dir() {
            continue;
        }

        let walker = WalkDir::new(&base)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_ignored(e));

        for entry in walker {
            if results.len() >= MAX_SEARCH_RESULTS {
                return results;
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Error walking directory: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !has_search_extension(path) {
                continue;
            }

            let relative = match path.strip_prefix(root) {
                Ok(p) => p.to_string_lossy().replace('\\', "/"),
                Err(_) => continue,
            };
            if !matches_file_pattern(&relative, file_pattern) {
                continue;
            }

            let content = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => {
                    debug!("Skipping unreadable file {}: {}", relative, e);
                    continue;
                }
            };

            matching_lines(&relative, &content, query_lower, &mut results);
        }
    }

    debug!("Search matched {} lines", results.len());
    results
}

impl FileStore for LocalFiles {
    async fn read_file(&self, path: &str) -> Result<String, FileError> {
        self.read_file_safe(path).await
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<WriteOutcome, FileError> {
        self.write_file_safe(path, content).await
    }

    async fn list_files(&self, directory: &str) -> Result<Vec<DirEntry>, FileError> {
        self.list_files_safe(directory).await
    }

    async fn search_code(
        &self,
        query: &str,
        file_pattern: Option<&str>,
    ) -> Result<Vec<SearchMatch>, FileError> {
        LocalFiles::search_code(self, query, file_pattern).await
    }
}
