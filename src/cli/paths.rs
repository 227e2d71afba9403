use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Find the git root directory by searching upward from `start`.
pub fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut path = start;
    loop {
        if path.join(".git").exists() {
            return Some(path.to_path_buf());
        }
        path = path.parent()?;
    }
}

/// Resolve the site project root: explicit path, else git root, else cwd.
pub fn resolve_project_root(project_root: Option<String>) -> Result<PathBuf> {
    if let Some(path) = project_root {
        return PathBuf::from(&path)
            .canonicalize()
            .with_context(|| format!("Failed to canonicalize provided project root: {}", path));
    }
    let current = std::env::current_dir().context("Failed to get current directory")?;
    Ok(find_git_root(&current).unwrap_or(current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_git_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let nested = dir.path().join("app/about");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_git_root(&nested), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_resolve_explicit_root() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_project_root(Some(dir.path().display().to_string())).unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap());

        assert!(resolve_project_root(Some("/definitely/not/here".to_string())).is_err());
    }
}
